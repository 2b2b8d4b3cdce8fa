//! Decoded PBR texture sets

use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::RgbImage;
use image::imageops::FilterType;
use pbrforge_ipc::{MapKind, TextureRequest, TextureResponse};
use pbrforge_maps::{BoundaryMode, HeightField, NormalConverter, NormalMap, blend_normals};
use tracing::{debug, warn};

use crate::GenerationError;

/// Four labelled maps of identical dimensions plus the request they answer.
#[derive(Clone, PartialEq)]
pub struct TextureSet {
    pub diffuse: RgbImage,
    pub roughness: RgbImage,
    pub normal: RgbImage,
    pub metallic: RgbImage,
    /// Prompt as the user submitted it
    pub prompt: String,
    pub resolution: u32,
    pub tileable: bool,
}

impl fmt::Debug for TextureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureSet")
            .field("dimensions", &self.dimensions())
            .field("prompt", &self.prompt)
            .field("resolution", &self.resolution)
            .field("tileable", &self.tileable)
            .finish()
    }
}

impl TextureSet {
    /// Build a set from four images, checking they are square and share
    /// dimensions
    pub fn new(
        diffuse: RgbImage,
        roughness: RgbImage,
        normal: RgbImage,
        metallic: RgbImage,
        prompt: impl Into<String>,
        tileable: bool,
    ) -> Result<Self, GenerationError> {
        let dims = diffuse.dimensions();
        if dims.0 != dims.1 {
            return Err(GenerationError::DecodeFailure(format!(
                "diffuse map is {}x{}, expected a square image",
                dims.0, dims.1
            )));
        }
        for (kind, image) in [
            (MapKind::Roughness, &roughness),
            (MapKind::Normal, &normal),
            (MapKind::Metallic, &metallic),
        ] {
            if image.dimensions() != dims {
                return Err(GenerationError::DecodeFailure(format!(
                    "{} map is {}x{}, diffuse is {}x{}",
                    kind,
                    image.width(),
                    image.height(),
                    dims.0,
                    dims.1
                )));
            }
        }
        Ok(Self {
            diffuse,
            roughness,
            normal,
            metallic,
            prompt: prompt.into(),
            resolution: dims.0,
            tileable,
        })
    }

    /// Decode the `/generate` response to `request`.
    ///
    /// The set keeps the request's prompt and tiling flag; the backend may
    /// echo back a prompt extended with its own tiling keywords.
    ///
    /// When the backend sends a height map instead of a normal map, the
    /// normal map is derived here with `converter` (wrapping at the borders
    /// for tileable requests).
    pub fn from_response(
        request: &TextureRequest,
        response: &TextureResponse,
        converter: &NormalConverter,
    ) -> Result<Self, GenerationError> {
        let diffuse = decode_rgb(MapKind::Diffuse, &response.diffuse)?;
        let roughness = decode_rgb(MapKind::Roughness, &response.roughness)?;
        let metallic = decode_rgb(MapKind::Metallic, &response.metallic)?;

        let normal = match (&response.normal, &response.height) {
            (Some(normal), _) => decode_rgb(MapKind::Normal, normal)?,
            (None, Some(height)) => {
                let boundary = if request.tileable {
                    BoundaryMode::Wrap
                } else {
                    BoundaryMode::Clamp
                };
                let luma = decode_image("height", height)?.to_luma8();
                let field = HeightField::from_luma(&luma)
                    .map_err(|e| GenerationError::DecodeFailure(format!("height map: {e}")))?;
                debug!("Deriving normal map from {}x{} height map", luma.width(), luma.height());
                converter.with_boundary(boundary).convert(&field).to_rgb_image()
            }
            (None, None) => {
                return Err(GenerationError::DecodeFailure(
                    "response has neither a normal nor a height map".into(),
                ));
            }
        };

        let set = Self::new(
            diffuse,
            roughness,
            normal,
            metallic,
            request.prompt.clone(),
            request.tileable,
        )?;
        if response.prompt != request.prompt {
            debug!("Backend expanded prompt to {:?}", response.prompt);
        }
        if set.resolution != response.resolution {
            warn!(
                "Backend reported resolution {} but sent {}x{} images",
                response.resolution, set.resolution, set.resolution
            );
        }
        Ok(set)
    }

    /// Width and height shared by all four maps
    pub fn dimensions(&self) -> (u32, u32) {
        self.diffuse.dimensions()
    }

    pub fn get(&self, kind: MapKind) -> &RgbImage {
        match kind {
            MapKind::Diffuse => &self.diffuse,
            MapKind::Roughness => &self.roughness,
            MapKind::Normal => &self.normal,
            MapKind::Metallic => &self.metallic,
        }
    }

    /// Maps in diffuse, roughness, normal, metallic order
    pub fn iter(&self) -> impl Iterator<Item = (MapKind, &RgbImage)> {
        MapKind::ALL.into_iter().map(move |kind| (kind, self.get(kind)))
    }

    /// Resample every map to `size`x`size`. A set already at that size is
    /// returned unchanged.
    pub fn resized(&self, size: u32, filter: ResizeFilter) -> TextureSet {
        if self.dimensions() == (size, size) {
            return self.clone();
        }
        let filter = filter.filter_type();
        let resize = |image: &RgbImage| image::imageops::resize(image, size, size, filter);
        TextureSet {
            diffuse: resize(&self.diffuse),
            roughness: resize(&self.roughness),
            normal: resize(&self.normal),
            metallic: resize(&self.metallic),
            prompt: self.prompt.clone(),
            resolution: size,
            tileable: self.tileable,
        }
    }

    /// Layer extra bump detail taken from the diffuse map's luminance over
    /// the normal map.
    pub fn with_height_boost(&self, strength: f32) -> Result<TextureSet, GenerationError> {
        let boundary = if self.tileable {
            BoundaryMode::Wrap
        } else {
            BoundaryMode::Clamp
        };
        let converter = NormalConverter::new(strength)
            .map_err(|e| GenerationError::DecodeFailure(format!("height boost: {e}")))?
            .with_boundary(boundary);

        let field = HeightField::from_rgb_luminance(&self.diffuse)
            .map_err(|e| GenerationError::DecodeFailure(format!("height boost: {e}")))?;
        let detail = converter.convert(&field);
        let base = NormalMap::from_rgb_image(&self.normal);
        let blended = blend_normals(&base, &detail)
            .map_err(|e| GenerationError::DecodeFailure(format!("height boost: {e}")))?;

        Ok(TextureSet {
            normal: blended.to_rgb_image(),
            ..self.clone()
        })
    }
}

fn decode_image(label: &str, data: &str) -> Result<image::DynamicImage, GenerationError> {
    let bytes = BASE64
        .decode(data.trim())
        .map_err(|e| GenerationError::DecodeFailure(format!("{label} map: invalid base64: {e}")))?;
    image::load_from_memory(&bytes)
        .map_err(|e| GenerationError::DecodeFailure(format!("{label} map: {e}")))
}

fn decode_rgb(kind: MapKind, data: &str) -> Result<RgbImage, GenerationError> {
    Ok(decode_image(kind.as_str(), data)?.to_rgb8())
}

/// Resampling filter for [`TextureSet::resized`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeFilter {
    /// High quality, best for upscaling
    #[default]
    Lanczos,
    Bicubic,
    Bilinear,
    /// Fastest, pixelated
    Nearest,
}

impl ResizeFilter {
    fn filter_type(self) -> FilterType {
        match self {
            ResizeFilter::Lanczos => FilterType::Lanczos3,
            ResizeFilter::Bicubic => FilterType::CatmullRom,
            ResizeFilter::Bilinear => FilterType::Triangle,
            ResizeFilter::Nearest => FilterType::Nearest,
        }
    }
}

impl FromStr for ResizeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lanczos" => Ok(ResizeFilter::Lanczos),
            "bicubic" => Ok(ResizeFilter::Bicubic),
            "bilinear" => Ok(ResizeFilter::Bilinear),
            "nearest" => Ok(ResizeFilter::Nearest),
            other => Err(format!(
                "unknown filter {other:?}; expected lanczos, bicubic, bilinear or nearest"
            )),
        }
    }
}
