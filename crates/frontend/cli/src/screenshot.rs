use anyhow::{ensure, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// ARGB8888 panel contents to packed RGB8 rows.
pub fn argb_to_rgb(pixels: &[u32]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(pixels.len() * 3);
    for &p in pixels {
        rgb.extend_from_slice(&[(p >> 16) as u8, (p >> 8) as u8, p as u8]);
    }
    rgb
}

/// Write the panel as an 8-bit RGB PNG.
pub fn save_png(path: &Path, width: u32, height: u32, pixels: &[u32]) -> Result<()> {
    ensure!(
        pixels.len() == width as usize * height as usize,
        "panel has {} pixels, expected {}x{}",
        pixels.len(),
        width,
        height
    );
    let file = File::create(path)?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&argb_to_rgb(pixels))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argb_drops_alpha() {
        assert_eq!(
            argb_to_rgb(&[0xFF12_3456, 0x00AB_CDEF]),
            vec![0x12, 0x34, 0x56, 0xAB, 0xCD, 0xEF]
        );
    }

    #[test]
    fn test_save_png_writes_decodable_file() {
        let path = std::env::temp_dir().join("fbhost_test_screenshot.png");
        save_png(&path, 2, 1, &[0xFFFF_0000, 0xFF00_00FF]).unwrap();

        let decoder = png::Decoder::new(File::open(&path).unwrap());
        let mut reader = decoder.read_info().unwrap();
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf).unwrap();
        assert_eq!((info.width, info.height), (2, 1));
        assert_eq!(&buf[..6], &[0xFF, 0, 0, 0, 0, 0xFF]);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_size_mismatch_is_rejected() {
        let path = std::env::temp_dir().join("fbhost_test_never_written.png");
        assert!(save_png(&path, 4, 4, &[0; 3]).is_err());
    }
}
