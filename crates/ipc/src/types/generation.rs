//! Texture generation request/response types for the inference backend.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::IpcError;

/// Output resolutions the backend model accepts.
///
/// Serialized as a bare integer (`512`, `768`, ...) so the payload matches the
/// backend's `/generate` contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Resolution {
    R512,
    R768,
    #[default]
    R1024,
    R2048,
}

impl Resolution {
    pub const ALL: [Resolution; 4] = [
        Resolution::R512,
        Resolution::R768,
        Resolution::R1024,
        Resolution::R2048,
    ];

    /// Edge length in pixels
    pub fn pixels(self) -> u32 {
        match self {
            Resolution::R512 => 512,
            Resolution::R768 => 768,
            Resolution::R1024 => 1024,
            Resolution::R2048 => 2048,
        }
    }
}

impl TryFrom<u32> for Resolution {
    type Error = IpcError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            512 => Ok(Resolution::R512),
            768 => Ok(Resolution::R768),
            1024 => Ok(Resolution::R1024),
            2048 => Ok(Resolution::R2048),
            other => Err(IpcError::UnsupportedResolution(other)),
        }
    }
}

impl From<Resolution> for u32 {
    fn from(value: Resolution) -> Self {
        value.pixels()
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.pixels(), self.pixels())
    }
}

/// Body of `POST /generate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureRequest {
    pub prompt: String,
    pub resolution: Resolution,
    pub tileable: bool,
}

impl TextureRequest {
    pub fn new(prompt: impl Into<String>, resolution: Resolution, tileable: bool) -> Self {
        Self {
            prompt: prompt.into(),
            resolution,
            tileable,
        }
    }
}

/// Successful `/generate` response. Image fields are base64-encoded JPEG or PNG.
///
/// Backends may return a grayscale `height` map instead of `normal`; the
/// client then derives the normal map itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextureResponse {
    pub diffuse: String,
    pub roughness: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
    pub metallic: String,
    pub prompt: String,
    pub resolution: u32,
    pub tileable: bool,
}

/// Error body returned with any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// `GET /health` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub device: String,
}

/// The four labelled maps of a PBR texture set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapKind {
    Diffuse,
    Roughness,
    Normal,
    Metallic,
}

impl MapKind {
    pub const ALL: [MapKind; 4] = [
        MapKind::Diffuse,
        MapKind::Roughness,
        MapKind::Normal,
        MapKind::Metallic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MapKind::Diffuse => "diffuse",
            MapKind::Roughness => "roughness",
            MapKind::Normal => "normal",
            MapKind::Metallic => "metallic",
        }
    }

    /// Color space the host should sample this map in.
    /// Only the diffuse map carries color; the rest are data.
    pub fn color_space(self) -> ColorSpace {
        match self {
            MapKind::Diffuse => ColorSpace::Srgb,
            _ => ColorSpace::NonColor,
        }
    }
}

impl fmt::Display for MapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sampling color space for an image texture node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorSpace {
    #[serde(rename = "sRGB")]
    Srgb,
    #[serde(rename = "Non-Color")]
    NonColor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_serializes_as_integer() {
        let request = TextureRequest::new("rusty metal", Resolution::R1024, false);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["resolution"], 1024);
        assert_eq!(json["prompt"], "rusty metal");
        assert_eq!(json["tileable"], false);
    }

    #[test]
    fn test_unsupported_resolution_rejected() {
        let result: Result<TextureRequest, _> =
            serde_json::from_str(r#"{"prompt":"x","resolution":4096,"tileable":true}"#);
        assert!(result.is_err());
        assert!(Resolution::try_from(640).is_err());
        assert_eq!(Resolution::try_from(768).unwrap(), Resolution::R768);
    }

    #[test]
    fn test_response_without_normal_parses() {
        let json = r#"{
            "diffuse": "AA==", "roughness": "AA==", "height": "AA==", "metallic": "AA==",
            "prompt": "moss", "resolution": 512, "tileable": true
        }"#;
        let response: TextureResponse = serde_json::from_str(json).unwrap();
        assert!(response.normal.is_none());
        assert_eq!(response.height.as_deref(), Some("AA=="));
    }

    #[test]
    fn test_map_kind_color_spaces() {
        assert_eq!(MapKind::Diffuse.color_space(), ColorSpace::Srgb);
        for kind in [MapKind::Roughness, MapKind::Normal, MapKind::Metallic] {
            assert_eq!(kind.color_space(), ColorSpace::NonColor);
        }
        assert_eq!(
            serde_json::to_string(&ColorSpace::NonColor).unwrap(),
            "\"Non-Color\""
        );
    }
}
