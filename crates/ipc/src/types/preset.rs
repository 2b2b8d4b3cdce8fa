//! Built-in material prompt presets.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::IpcError;

/// Material type presets with tuned prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialPreset {
    /// Use the caller's prompt as-is
    #[default]
    Custom,
    // Metals
    MetalRusted,
    MetalCopper,
    MetalBrass,
    MetalAluminum,
    MetalGold,
    MetalChrome,
    MetalSteel,
    MetalIron,
    // Woods
    WoodOak,
    WoodPine,
    WoodMahogany,
    WoodBamboo,
    WoodReclaimed,
    // Stones
    StoneGranite,
    StoneMarble,
    StoneSandstone,
    StoneCobble,
    StoneRough,
    // Modern
    CarbonFiber,
    Concrete,
    Leather,
    Fabric,
    Plastic,
    Rubber,
}

impl MaterialPreset {
    /// Canonical prompt for this preset, `None` for [`MaterialPreset::Custom`].
    pub fn prompt(self) -> Option<&'static str> {
        let prompt = match self {
            MaterialPreset::Custom => return None,
            MaterialPreset::MetalRusted => {
                "rusty worn metal surface with scratches, orange rust, blue oxidation, weathering"
            }
            MaterialPreset::MetalCopper => {
                "hammered copper surface with verdigris patina, dents and texture"
            }
            MaterialPreset::MetalBrass => {
                "polished brass metal surface with slight tarnish and reflections"
            }
            MaterialPreset::MetalAluminum => {
                "brushed aluminum metal with linear grain pattern and scratches"
            }
            MaterialPreset::MetalGold => {
                "pure gold metal surface with subtle scratches and high reflectivity"
            }
            MaterialPreset::MetalChrome => "polished chrome metal with mirror-like reflections",
            MaterialPreset::MetalSteel => {
                "brushed stainless steel with directional grain and fingerprints"
            }
            MaterialPreset::MetalIron => "rough cast iron surface with pitted texture and dark finish",
            MaterialPreset::WoodOak => {
                "oak wood planks with prominent grain, knots, and natural variations"
            }
            MaterialPreset::WoodPine => "pine wood surface with visible grain lines and knots",
            MaterialPreset::WoodMahogany => {
                "rich dark mahogany wood with fine grain and polished finish"
            }
            MaterialPreset::WoodBamboo => {
                "bamboo texture with distinctive nodes and natural segmentation"
            }
            MaterialPreset::WoodReclaimed => {
                "old weathered reclaimed wood with cracks, nail holes, and aged patina"
            }
            MaterialPreset::StoneGranite => {
                "polished granite stone with speckled pattern and crystalline structure"
            }
            MaterialPreset::StoneMarble => "white marble with elegant gray veins and polished surface",
            MaterialPreset::StoneSandstone => {
                "rough sandstone blocks with layered sediment and weathering"
            }
            MaterialPreset::StoneCobble => {
                "dry cobblestone pavement with rectangular gray stones, individual brick pattern, matte finish, mortar gaps between stones, realistic outdoor paving"
            }
            MaterialPreset::StoneRough => {
                "rough stone wall surface with cracks, texture, and natural irregularities"
            }
            MaterialPreset::CarbonFiber => {
                "carbon fiber weave pattern with distinctive twill texture and glossy epoxy"
            }
            MaterialPreset::Concrete => {
                "rough concrete surface with aggregate, pitting, and subtle cracks"
            }
            MaterialPreset::Leather => "worn leather texture with creases, wrinkles, and natural grain",
            MaterialPreset::Fabric => {
                "woven fabric texture with detailed fiber pattern and slight roughness"
            }
            MaterialPreset::Plastic => "smooth molded plastic surface with subtle imperfections",
            MaterialPreset::Rubber => "textured rubber surface with grip pattern and matte finish",
        };
        Some(prompt)
    }

    /// Resolve the prompt to send: the preset's prompt, or `custom` for
    /// [`MaterialPreset::Custom`].
    pub fn resolve<'a>(self, custom: &'a str) -> &'a str {
        self.prompt().unwrap_or(custom)
    }
}

impl FromStr for MaterialPreset {
    type Err = IpcError;

    /// Parse the snake_case wire name, e.g. `metal_rusted`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.trim().to_ascii_lowercase()))
            .map_err(|_| IpcError::InvalidFormat(format!("unknown material preset {s:?}")))
    }
}
