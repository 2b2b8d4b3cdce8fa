//! Material-related types handed to the host's material collaborator.

use serde::{Deserialize, Serialize};

use super::generation::{ColorSpace, MapKind};

/// Lowest accepted normal-map node strength
pub const MIN_NORMAL_STRENGTH: f32 = 0.1;
/// Highest accepted normal-map node strength
pub const MAX_NORMAL_STRENGTH: f32 = 20.0;
/// Smallest mapping scale on any axis
pub const MIN_MAPPING_SCALE: f32 = 0.01;

/// Host-side material wiring parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialSettings {
    /// Strength of the normal-map node (0.1 - 20.0)
    pub normal_strength: f32,
    /// Texture mapping scale on X, Y, Z
    pub mapping_scale: [f32; 3],
    /// Extra bump derived from the diffuse map's luminance, if enabled
    pub height_boost: Option<f32>,
}

impl Default for MaterialSettings {
    fn default() -> Self {
        Self {
            normal_strength: 1.5,
            mapping_scale: [1.0, 1.0, 1.0],
            height_boost: None,
        }
    }
}

impl MaterialSettings {
    /// Clamp every field into the range the host accepts.
    pub fn sanitized(mut self) -> Self {
        self.normal_strength = self
            .normal_strength
            .clamp(MIN_NORMAL_STRENGTH, MAX_NORMAL_STRENGTH);
        for axis in &mut self.mapping_scale {
            *axis = axis.max(MIN_MAPPING_SCALE);
        }
        self.height_boost = self.height_boost.filter(|s| *s > 0.0).map(|s| s.min(5.0));
        self
    }

    /// Reset the mapping scale to 1,1,1
    pub fn reset_mapping_scale(&mut self) {
        self.mapping_scale = [1.0, 1.0, 1.0];
    }
}

/// Description of a generated material as written next to its textures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialManifest {
    pub name: String,
    pub prompt: String,
    pub resolution: u32,
    pub tileable: bool,
    pub settings: MaterialSettings,
    pub texture_slots: Vec<TextureSlot>,
}

/// A texture slot in a material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureSlot {
    pub kind: MapKind,
    pub file: String,
    pub color_space: ColorSpace,
}
