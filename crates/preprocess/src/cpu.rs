use crate::{ColorFormat, ImageFrame};
use common::{span, span_debug};
use fast_image_resize::{
    FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer,
    images::{Image, ImageRef},
};
use ndarray::Array4;

const PIXEL_SCALE: f32 = 1.0 / 255.0;

/// Builds network input blobs the way Darknet models expect them: the whole
/// image stretched to the input size (no crop, no letterbox), RGB channel order,
/// values scaled to `[0, 1]`, no mean subtraction.
pub struct BlobPreProcessor {
    /// `(width, height)`
    pub input_size: (u32, u32),
    resizer: Resizer,
}

impl BlobPreProcessor {
    pub fn new(input_size: (u32, u32)) -> Self {
        Self {
            input_size,
            resizer: Resizer::new(),
        }
    }

    pub fn preprocess_frame(&mut self, frame: &ImageFrame) -> anyhow::Result<Array4<f32>> {
        let _s = span!("preprocess_frame");

        tracing::trace!(
            width = frame.width,
            height = frame.height,
            format = ?frame.format,
            pixel_bytes = frame.pixels.len(),
            "Preprocessing frame dimensions"
        );

        frame.validate()?;

        let (input_width, input_height) = self.input_size;
        if input_width == 0 || input_height == 0 {
            anyhow::bail!(
                "Network input size must be positive, got {}x{}",
                input_width,
                input_height
            );
        }

        if (frame.width, frame.height) == self.input_size {
            return Self::normalize(&frame.pixels, input_width, input_height, frame.format);
        }

        let resized = self.resize(frame)?;
        Self::normalize(resized.buffer(), input_width, input_height, frame.format)
    }

    fn resize(&mut self, frame: &ImageFrame) -> anyhow::Result<Image<'static>> {
        let _s = span_debug!("resize");

        let src = ImageRef::new(frame.width, frame.height, &frame.pixels, PixelType::U8x3)?;
        let mut resized = Image::new(self.input_size.0, self.input_size.1, PixelType::U8x3);

        self.resizer.resize(
            &src,
            &mut resized,
            &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
        )?;

        Ok(resized)
    }

    /// HWC u8 to NCHW f32, emitting channels in RGB order.
    fn normalize(
        buf: &[u8],
        width: u32,
        height: u32,
        format: ColorFormat,
    ) -> anyhow::Result<Array4<f32>> {
        let _s = span_debug!("normalize");

        let width = width as usize;
        let height = height as usize;
        let spatial = width * height;

        let (r_idx, b_idx) = match format {
            ColorFormat::Rgb => (0, 2),
            ColorFormat::Bgr => (2, 0),
        };

        let mut output = vec![0.0f32; 3 * spatial];

        for (i, px) in buf.chunks_exact(3).enumerate() {
            output[i] = px[r_idx] as f32 * PIXEL_SCALE;
            output[i + spatial] = px[1] as f32 * PIXEL_SCALE;
            output[i + 2 * spatial] = px[b_idx] as f32 * PIXEL_SCALE;
        }

        Ok(Array4::from_shape_vec((1, 3, height, width), output)?)
    }
}
