//! iNES-style program image header.

/// Built-in program image: a bare iNES header (1 PRG bank, 1 CHR bank,
/// mapper 0) followed by sixteen bytes that seed the test pattern.
pub const BUILTIN_IMAGE: &[u8] = &[
    b'N', b'E', b'S', 0x1A, 0x01, 0x01, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x3C, 0x5A, 0x7E, 0x99, 0xA5, 0xC3, 0xDB, 0xE7, //
    0x18, 0x24, 0x42, 0x81, 0x66, 0x0F, 0xF0, 0x55,
];

const MAGIC: [u8; 4] = [b'N', b'E', b'S', 0x1A];
const HEADER_LEN: usize = 16;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("image is {0} bytes, shorter than the 16-byte header")]
    TooShort(usize),
    #[error("missing NES<EOF> magic")]
    BadMagic,
    #[error("image declares no PRG banks")]
    NoPrg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ImageHeader {
    /// 16 KiB PRG ROM banks
    pub prg_banks: u8,
    /// 8 KiB CHR ROM banks
    pub chr_banks: u8,
    pub mapper: u8,
    pub vertical_mirroring: bool,
}

impl ImageHeader {
    pub fn parse(image: &[u8]) -> Result<Self, ImageError> {
        if image.len() < HEADER_LEN {
            return Err(ImageError::TooShort(image.len()));
        }
        if image[..4] != MAGIC {
            return Err(ImageError::BadMagic);
        }
        let prg_banks = image[4];
        if prg_banks == 0 {
            return Err(ImageError::NoPrg);
        }
        Ok(Self {
            prg_banks,
            chr_banks: image[5],
            mapper: (image[6] >> 4) | (image[7] & 0xF0),
            vertical_mirroring: image[6] & 0x01 != 0,
        })
    }
}

/// Two pattern seed bytes folded from everything after the header.
pub(crate) fn seed(image: &[u8]) -> [u8; 2] {
    image
        .get(HEADER_LEN..)
        .unwrap_or_default()
        .iter()
        .enumerate()
        .fold([0u8; 2], |mut acc, (i, b)| {
            acc[i % 2] = acc[i % 2].rotate_left(1) ^ b;
            acc
        })
}
