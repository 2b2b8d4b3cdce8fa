//! Single-channel height fields

use image::{GrayImage, RgbImage};

use crate::error::MapError;

/// How neighbours outside the field are fetched by the gradient kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundaryMode {
    /// Replicate the edge sample. For a 3x3 kernel this is the same as
    /// mirroring about the outer pixel edge.
    #[default]
    Clamp,
    /// Wrap around toroidally, for tileable textures
    Wrap,
}

impl BoundaryMode {
    /// Resolve `index + offset` into `0..len`
    #[inline]
    fn resolve(self, index: usize, offset: isize, len: usize) -> usize {
        let target = index as isize + offset;
        match self {
            BoundaryMode::Clamp => target.clamp(0, len as isize - 1) as usize,
            BoundaryMode::Wrap => target.rem_euclid(len as isize) as usize,
        }
    }
}

/// A grid of height samples in [0, 1], row-major, immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightField {
    width: u32,
    height: u32,
    samples: Vec<f32>,
}

impl HeightField {
    /// Validate and wrap raw samples.
    ///
    /// Every sample must be finite and inside [0, 1]; anything else would
    /// produce silently wrong normals, so it is rejected here.
    pub fn new(width: u32, height: u32, samples: Vec<f32>) -> Result<Self, MapError> {
        if width == 0 || height == 0 {
            return Err(MapError::InvalidDimensions { width, height });
        }
        let expected = (width as usize) * (height as usize);
        if samples.len() != expected {
            return Err(MapError::SampleCount {
                expected,
                actual: samples.len(),
            });
        }
        for (index, &value) in samples.iter().enumerate() {
            if !value.is_finite() {
                return Err(MapError::NonFinite { index, value });
            }
            if !(0.0..=1.0).contains(&value) {
                return Err(MapError::OutOfRange { index, value });
            }
        }
        Ok(Self {
            width,
            height,
            samples,
        })
    }

    /// A constant field
    pub fn flat(width: u32, height: u32, value: f32) -> Result<Self, MapError> {
        let count = (width as usize) * (height as usize);
        Self::new(width, height, vec![value; count])
    }

    /// Normalize an 8-bit grayscale image into [0, 1]
    pub fn from_luma(image: &GrayImage) -> Result<Self, MapError> {
        let samples = image.pixels().map(|p| p.0[0] as f32 / 255.0).collect();
        Self::new(image.width(), image.height(), samples)
    }

    /// Use the luminance of an RGB image as height
    pub fn from_rgb_luminance(image: &RgbImage) -> Result<Self, MapError> {
        Self::from_luma(&image::imageops::grayscale(image))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Raw samples in row-major order
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample at (x, y). Returns None if out of bounds.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.samples[(y as usize) * (self.width as usize) + (x as usize)])
    }

    /// Sample at `(x + dx, y + dy)`, resolving the border with `mode`
    #[inline]
    pub(crate) fn sample_offset(
        &self,
        x: usize,
        y: usize,
        dx: isize,
        dy: isize,
        mode: BoundaryMode,
    ) -> f32 {
        let w = self.width as usize;
        let h = self.height as usize;
        let sx = mode.resolve(x, dx, w);
        let sy = mode.resolve(y, dy, h);
        self.samples[sy * w + sx]
    }
}
