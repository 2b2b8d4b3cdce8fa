//! Tangent-space normal maps and height-to-normal conversion
//!
//! Normals are stored as unit `Vec3`s and encoded for storage as three bytes
//! per pixel with `byte = round((c + 1) / 2 * 255)`, channel order
//! x -> R, y -> G, z -> B. A flat surface encodes as (128, 128, 255).

use glam::Vec3;
use image::{Rgb, RgbImage};
use tracing::debug;

use crate::error::MapError;
use crate::height::{BoundaryMode, HeightField};

/// Gradient scale used by the inference backend
pub const DEFAULT_STRENGTH: f32 = 3.0;

/// Lower bound on the candidate vector's length before normalizing
pub const MIN_NORM: f32 = 1e-4;

/// Sobel weights across the derivative axis
const SMOOTH: [f32; 3] = [1.0, 2.0, 1.0];

/// Encode one normal component from [-1, 1] to a byte
#[inline]
pub fn encode_component(c: f32) -> u8 {
    ((c + 1.0) * 0.5 * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Decode a byte back to [-1, 1]
#[inline]
pub fn decode_component(b: u8) -> f32 {
    b as f32 / 255.0 * 2.0 - 1.0
}

/// A grid of unit normals, same dimensions as its source.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalMap {
    width: u32,
    height: u32,
    normals: Vec<Vec3>,
}

impl NormalMap {
    /// A map where every normal points straight out of the surface
    pub fn flat(width: u32, height: u32) -> Self {
        let count = (width as usize) * (height as usize);
        Self {
            width,
            height,
            normals: vec![Vec3::Z; count],
        }
    }

    /// Decode an RGB normal map image.
    ///
    /// Decoded vectors are renormalized since quantization leaves them
    /// slightly off unit length. A degenerate pixel decodes to +Z.
    pub fn from_rgb_image(image: &RgbImage) -> Self {
        let normals = image
            .pixels()
            .map(|Rgb([r, g, b])| {
                Vec3::new(
                    decode_component(*r),
                    decode_component(*g),
                    decode_component(*b),
                )
                .try_normalize()
                .unwrap_or(Vec3::Z)
            })
            .collect();
        Self {
            width: image.width(),
            height: image.height(),
            normals,
        }
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

    /// Normals in row-major order, before encoding
    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    /// Normal at (x, y). Returns None if out of bounds.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Option<Vec3> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.normals[(y as usize) * (self.width as usize) + (x as usize)])
    }

    /// Byte-encode every normal
    pub fn encode(&self) -> Vec<[u8; 3]> {
        self.normals
            .iter()
            .map(|n| [encode_component(n.x), encode_component(n.y), encode_component(n.z)])
            .collect()
    }

    /// Encoded RGB8 bytes, tightly packed
    pub fn to_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.encode()).to_vec()
    }

    /// Encode into an RGB image
    pub fn to_rgb_image(&self) -> RgbImage {
        let encoded = self.encode();
        RgbImage::from_fn(self.width, self.height, |x, y| {
            Rgb(encoded[(y as usize) * (self.width as usize) + (x as usize)])
        })
    }
}

/// Converts height fields into tangent-space normal maps.
///
/// Gradients come from unnormalized 3x3 Sobel kernels scaled by `strength`.
/// The candidate `(-gx, -gy, 1)` is divided by its length, clamped to at
/// least [`MIN_NORM`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalConverter {
    strength: f32,
    boundary: BoundaryMode,
}

impl Default for NormalConverter {
    fn default() -> Self {
        Self {
            strength: DEFAULT_STRENGTH,
            boundary: BoundaryMode::Clamp,
        }
    }
}

impl NormalConverter {
    /// Create a converter; `strength` must be finite and > 0.
    pub fn new(strength: f32) -> Result<Self, MapError> {
        if !strength.is_finite() || strength <= 0.0 {
            return Err(MapError::InvalidStrength(strength));
        }
        Ok(Self {
            strength,
            boundary: BoundaryMode::Clamp,
        })
    }

    /// Set the border policy
    pub fn with_boundary(mut self, boundary: BoundaryMode) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }

    pub fn boundary(&self) -> BoundaryMode {
        self.boundary
    }

    /// Convert a height field. Pure function of (field, strength, boundary).
    pub fn convert(&self, field: &HeightField) -> NormalMap {
        let w = field.width() as usize;
        let h = field.height() as usize;
        let mut normals = Vec::with_capacity(w * h);

        for y in 0..h {
            for x in 0..w {
                let (gx, gy) = self.sobel(field, x, y);
                let candidate = Vec3::new(-gx * self.strength, -gy * self.strength, 1.0);
                let length = candidate.length().max(MIN_NORM);
                normals.push(candidate / length);
            }
        }

        debug!(
            "NormalConverter::convert: {}x{} strength={:.2} boundary={:?}",
            w, h, self.strength, self.boundary
        );

        NormalMap {
            width: field.width(),
            height: field.height(),
            normals,
        }
    }

    /// Horizontal and vertical Sobel responses at (x, y)
    #[inline]
    fn sobel(&self, field: &HeightField, x: usize, y: usize) -> (f32, f32) {
        let mode = self.boundary;
        let mut gx = 0.0;
        let mut gy = 0.0;
        for (i, weight) in SMOOTH.iter().enumerate() {
            let offset = i as isize - 1;
            gx += weight
                * (field.sample_offset(x, y, 1, offset, mode)
                    - field.sample_offset(x, y, -1, offset, mode));
            gy += weight
                * (field.sample_offset(x, y, offset, 1, mode)
                    - field.sample_offset(x, y, offset, -1, mode));
        }
        (gx, gy)
    }
}

/// Whiteout blend: `normalize(a.xy + b.xy, a.z * b.z)`.
///
/// Layers the detail of `b` over `a`; both maps must share dimensions.
pub fn blend_normals(base: &NormalMap, detail: &NormalMap) -> Result<NormalMap, MapError> {
    if base.dimensions() != detail.dimensions() {
        return Err(MapError::DimensionMismatch {
            left: base.dimensions(),
            right: detail.dimensions(),
        });
    }

    let normals = base
        .normals
        .iter()
        .zip(&detail.normals)
        .map(|(a, b)| {
            Vec3::new(a.x + b.x, a.y + b.y, a.z * b.z)
                .try_normalize()
                .unwrap_or(Vec3::Z)
        })
        .collect();

    Ok(NormalMap {
        width: base.width,
        height: base.height,
        normals,
    })
}
