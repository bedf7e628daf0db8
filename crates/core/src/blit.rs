//! Nearest-neighbour upscaling blit from the framebuffer to the display.
//!
//! Every logical pixel becomes a solid `scale x scale` block of physical
//! pixels. The geometry is validated once, up front; the per-pixel loop does
//! no clipping and no bounds checks of its own.
//!
//! This is the dominant per-frame cost (`240 * 256 * scale^2` pixel writes).
// TODO: hand the scaled copy to the display controller's DMA2D engine once a
// second framebuffer exists to render into while a transfer is in flight.

use crate::framebuffer::{pack_argb, Framebuffer, VISIBLE_SCREEN_HEIGHT, VISIBLE_SCREEN_WIDTH};
use crate::peripherals::Display;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BlitError {
    #[error("blit scale must be at least 1")]
    ZeroScale,
    #[error(
        "scaled frame {width}x{height} at ({offset_x}, {offset_y}) does not fit a {display_width}x{display_height} display"
    )]
    OutOfBounds {
        offset_x: u32,
        offset_y: u32,
        width: u32,
        height: u32,
        display_width: u32,
        display_height: u32,
    },
}

/// Placement of the scaled frame on the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlitGeometry {
    pub offset_x: u32,
    pub offset_y: u32,
    pub scale: u32,
}

impl Default for BlitGeometry {
    /// 2x, horizontally centered on an 800x480 panel.
    fn default() -> Self {
        Self {
            offset_x: 144,
            offset_y: 0,
            scale: 2,
        }
    }
}

/// Physical size of the framebuffer at `scale`.
pub const fn scaled_size(scale: u32) -> (u32, u32) {
    (
        VISIBLE_SCREEN_WIDTH as u32 * scale,
        VISIBLE_SCREEN_HEIGHT as u32 * scale,
    )
}

impl BlitGeometry {
    pub fn new(offset_x: u32, offset_y: u32, scale: u32) -> Result<Self, BlitError> {
        if scale == 0 {
            return Err(BlitError::ZeroScale);
        }
        Ok(Self {
            offset_x,
            offset_y,
            scale,
        })
    }

    /// Geometry that centers the frame at `scale` on a display, if it fits.
    pub fn centered(display_width: u32, display_height: u32, scale: u32) -> Result<Self, BlitError> {
        let (w, h) = scaled_size(scale);
        let geometry = Self::new(
            display_width.saturating_sub(w) / 2,
            display_height.saturating_sub(h) / 2,
            scale,
        )?;
        geometry.check_fits(display_width, display_height)?;
        Ok(geometry)
    }

    /// Size of the painted region in physical pixels.
    pub fn scaled_size(&self) -> (u32, u32) {
        scaled_size(self.scale)
    }

    /// Ensure the painted region lies inside a `display_width x display_height` panel.
    pub fn check_fits(&self, display_width: u32, display_height: u32) -> Result<(), BlitError> {
        if self.scale == 0 {
            return Err(BlitError::ZeroScale);
        }
        let (width, height) = self.scaled_size();
        let right = u64::from(self.offset_x) + u64::from(width);
        let bottom = u64::from(self.offset_y) + u64::from(height);
        if right > u64::from(display_width) || bottom > u64::from(display_height) {
            return Err(BlitError::OutOfBounds {
                offset_x: self.offset_x,
                offset_y: self.offset_y,
                width,
                height,
                display_width,
                display_height,
            });
        }
        Ok(())
    }
}

/// Paint the whole framebuffer onto `display`.
///
/// Issues exactly one `draw_pixel` per physical pixel, in row-major order of
/// logical pixels. `geometry` must already have passed
/// [`BlitGeometry::check_fits`] for this display.
pub fn blit<D: Display + ?Sized>(display: &mut D, framebuffer: &Framebuffer, geometry: &BlitGeometry) {
    debug_assert!(
        geometry.check_fits(display.width(), display.height()).is_ok(),
        "blit geometry {:?} does not fit the display",
        geometry
    );
    let scale = geometry.scale;
    for (j, row) in framebuffer.as_array().iter().enumerate() {
        let y0 = geometry.offset_y + j as u32 * scale;
        for (i, rgb) in row.iter().enumerate() {
            let argb = pack_argb(*rgb);
            let x0 = geometry.offset_x + i as u32 * scale;
            for dy in 0..scale {
                for dx in 0..scale {
                    display.draw_pixel(x0 + dx, y0 + dy, argb);
                }
            }
        }
    }
}
