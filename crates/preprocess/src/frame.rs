/// Channel order of interleaved 3-channel pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorFormat {
    #[default]
    Rgb,
    Bgr,
}

/// A decoded image as interleaved HWC `u8` pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFrame {
    pub width: u32,
    pub height: u32,
    pub format: ColorFormat,
    pub pixels: Vec<u8>,
}

impl ImageFrame {
    pub const CHANNELS: usize = 3;

    pub fn new(width: u32, height: u32, format: ColorFormat, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            format,
            pixels,
        }
    }

    pub fn rgb(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self::new(width, height, ColorFormat::Rgb, pixels)
    }

    pub fn bgr(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self::new(width, height, ColorFormat::Bgr, pixels)
    }

    /// `(height, width)`, the order image arrays report their shape in.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.height, self.width)
    }

    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * Self::CHANNELS
    }

    /// Checks that the frame has non-zero dimensions and a pixel buffer that
    /// matches them.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.width == 0 || self.height == 0 {
            anyhow::bail!(
                "Image has zero dimension: {}x{}",
                self.width,
                self.height
            );
        }

        let expected_size = self.expected_len();
        if self.pixels.len() != expected_size {
            anyhow::bail!(
                "Buffer size mismatch: expected {}, got {} bytes",
                expected_size,
                self.pixels.len()
            );
        }

        Ok(())
    }
}
