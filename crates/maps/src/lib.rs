//! PBR Forge map kernels
//!
//! Pure, deterministic image math used by the texture pipeline:
//! - [`HeightField`] - validated single-channel height samples in [0, 1]
//! - [`NormalConverter`] - Sobel height-to-normal conversion
//! - [`NormalMap`] - unit normals with their RGB byte encoding
//! - [`blend_normals`] - whiteout blend of two normal maps

mod error;
mod height;
mod normal;

pub use error::MapError;
pub use height::{BoundaryMode, HeightField};
pub use normal::{
    DEFAULT_STRENGTH, MIN_NORM, NormalConverter, NormalMap, blend_normals, decode_component,
    encode_component,
};
