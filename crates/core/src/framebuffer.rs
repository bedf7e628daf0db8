//! The framebuffer shared between the engine and the host.
//!
//! The three dimension constants below are the single source of truth for the
//! layout on both sides of the engine boundary. The array type is
//! layout-identical to the C declaration `uint8_t fb[240][256][3]`: row-major,
//! channels in R, G, B order, no padding.
//!
//! A mismatch between these constants and the engine's is a contract
//! violation, not something the host can detect at runtime.

/// Number of colour channels per pixel (R, G, B).
pub const NUM_OF_COLOR: usize = 3;

/// Visible width of the engine's output in pixels.
pub const VISIBLE_SCREEN_WIDTH: usize = 256;

/// Visible height of the engine's output in pixels.
pub const VISIBLE_SCREEN_HEIGHT: usize = 240;

/// Raw framebuffer storage as seen by the engine.
pub type FramebufferArray = [[[u8; NUM_OF_COLOR]; VISIBLE_SCREEN_WIDTH]; VISIBLE_SCREEN_HEIGHT];

/// Alpha byte used for every pixel the host paints.
pub const OPAQUE: u32 = 0xFF00_0000;

/// Pack an RGB triple into ARGB8888 (0xAARRGGBB) with full opacity.
#[inline]
pub fn pack_argb(rgb: [u8; NUM_OF_COLOR]) -> u32 {
    OPAQUE | ((rgb[0] as u32) << 16) | ((rgb[1] as u32) << 8) | (rgb[2] as u32)
}

/// Host-owned framebuffer.
///
/// Allocated once for the lifetime of the host context. The engine only ever
/// sees it through a `&mut FramebufferArray` borrow for the duration of one
/// render call, so it cannot keep the pointer past that call.
pub struct Framebuffer {
    pixels: Box<FramebufferArray>,
}

impl Framebuffer {
    /// Create an all-black framebuffer.
    pub fn new() -> Self {
        Self {
            pixels: Box::new([[[0; NUM_OF_COLOR]; VISIBLE_SCREEN_WIDTH]; VISIBLE_SCREEN_HEIGHT]),
        }
    }

    pub const fn width(&self) -> usize {
        VISIBLE_SCREEN_WIDTH
    }

    pub const fn height(&self) -> usize {
        VISIBLE_SCREEN_HEIGHT
    }

    /// RGB triple at logical pixel `(x, y)`.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; NUM_OF_COLOR] {
        self.pixels[y][x]
    }

    #[inline]
    pub fn set_pixel(&mut self, x: usize, y: usize, rgb: [u8; NUM_OF_COLOR]) {
        self.pixels[y][x] = rgb;
    }

    /// Packed ARGB colour at logical pixel `(x, y)`.
    #[inline]
    pub fn argb(&self, x: usize, y: usize) -> u32 {
        pack_argb(self.pixels[y][x])
    }

    pub fn clear(&mut self) {
        for row in self.pixels.iter_mut() {
            row.fill([0; NUM_OF_COLOR]);
        }
    }

    /// True if every sample is zero.
    pub fn is_blank(&self) -> bool {
        self.pixels
            .iter()
            .all(|row| row.iter().all(|px| *px == [0; NUM_OF_COLOR]))
    }

    pub fn as_array(&self) -> &FramebufferArray {
        &self.pixels
    }

    /// Lend the storage to an engine for one render call.
    pub fn as_array_mut(&mut self) -> &mut FramebufferArray {
        &mut self.pixels
    }

    /// Raw pointer for the C boundary. Valid for as long as `self` is
    /// mutably borrowed by the caller.
    pub fn as_mut_ptr(&mut self) -> *mut FramebufferArray {
        &mut *self.pixels
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Framebuffer")
            .field("width", &VISIBLE_SCREEN_WIDTH)
            .field("height", &VISIBLE_SCREEN_HEIGHT)
            .field("blank", &self.is_blank())
            .finish()
    }
}
