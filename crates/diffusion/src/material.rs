//! Host-side material output

use std::fs;
use std::path::{Path, PathBuf};

use pbrforge_ipc::{MaterialManifest, MaterialSettings, TextureSlot};
use thiserror::Error;
use tracing::{debug, info};

use crate::GenerationError;
use crate::textures::TextureSet;

/// File name of the wiring manifest inside each material directory
pub const MANIFEST_FILE: &str = "material.json";

const NAME_PREFIX: &str = "AI_";
const NAME_PROMPT_CHARS: usize = 20;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode texture: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid material manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("Height boost failed: {0}")]
    HeightBoost(GenerationError),
}

/// Receives finished texture sets and turns them into materials.
pub trait MaterialSink {
    type Error;

    fn apply(
        &mut self,
        textures: &TextureSet,
        settings: &MaterialSettings,
    ) -> Result<MaterialManifest, Self::Error>;
}

/// Material name for a prompt: `AI_` plus its first 20 characters
pub fn material_name(prompt: &str) -> String {
    let head: String = prompt.chars().take(NAME_PROMPT_CHARS).collect();
    format!("{NAME_PREFIX}{head}")
}

/// Replace characters that are unsafe in file names
fn file_stem(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "material".to_string()
    } else {
        stem
    }
}

/// Writes each material into its own directory under `root`:
/// one PNG per map plus a [`MANIFEST_FILE`] describing the wiring.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory a material with `name` is written to
    pub fn material_dir(&self, name: &str) -> PathBuf {
        self.root.join(file_stem(name))
    }
}

impl MaterialSink for DirectorySink {
    type Error = SinkError;

    fn apply(
        &mut self,
        textures: &TextureSet,
        settings: &MaterialSettings,
    ) -> Result<MaterialManifest, SinkError> {
        let settings = settings.clone().sanitized();
        let name = material_name(&textures.prompt);
        let dir = self.material_dir(&name);
        fs::create_dir_all(&dir)?;

        let boosted;
        let textures = match settings.height_boost {
            Some(strength) => {
                debug!("Applying height boost {} to {}", strength, name);
                boosted = textures
                    .with_height_boost(strength)
                    .map_err(SinkError::HeightBoost)?;
                &boosted
            }
            None => textures,
        };

        let stem = file_stem(&name);
        let mut texture_slots = Vec::with_capacity(4);
        for (kind, image) in textures.iter() {
            let file = format!("{stem}_{kind}.png");
            image.save(dir.join(&file))?;
            texture_slots.push(TextureSlot {
                kind,
                file,
                color_space: kind.color_space(),
            });
        }

        let manifest = MaterialManifest {
            name,
            prompt: textures.prompt.clone(),
            resolution: textures.resolution,
            tileable: textures.tileable,
            settings,
            texture_slots,
        };
        fs::write(
            dir.join(MANIFEST_FILE),
            serde_json::to_string_pretty(&manifest)?,
        )?;

        info!("Wrote material {} to {}", manifest.name, dir.display());
        Ok(manifest)
    }
}

/// Update the normal strength recorded in an existing manifest.
///
/// The strength is clamped like any other [`MaterialSettings`] value.
pub fn apply_normal_strength(
    manifest_path: &Path,
    strength: f32,
) -> Result<MaterialManifest, SinkError> {
    let text = fs::read_to_string(manifest_path)?;
    let mut manifest: MaterialManifest = serde_json::from_str(&text)?;

    manifest.settings.normal_strength = strength;
    manifest.settings = manifest.settings.sanitized();
    fs::write(manifest_path, serde_json::to_string_pretty(&manifest)?)?;

    debug!(
        "Normal strength of {} set to {}",
        manifest.name, manifest.settings.normal_strength
    );
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use pbrforge_ipc::{ColorSpace, MAX_NORMAL_STRENGTH, MapKind};

    fn scratch_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "pbrforge-material-{}-{}",
            label,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn texture_set(prompt: &str) -> TextureSet {
        let solid = |c: [u8; 3]| RgbImage::from_pixel(4, 4, Rgb(c));
        TextureSet::new(
            solid([200, 100, 50]),
            solid([128, 128, 128]),
            solid([128, 128, 255]),
            solid([0, 0, 0]),
            prompt,
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_material_name_truncates_prompt() {
        assert_eq!(material_name("brick"), "AI_brick");
        assert_eq!(
            material_name("weathered red brick wall with moss"),
            "AI_weathered red brick "
        );
        // Counts characters, not bytes
        assert_eq!(material_name(&"é".repeat(30)), format!("AI_{}", "é".repeat(20)));
    }

    #[test]
    fn test_file_stem_replaces_unsafe_characters() {
        assert_eq!(file_stem("AI_rusty metal/plate"), "AI_rusty_metal_plate");
        assert_eq!(file_stem("   "), "material");
    }

    #[test]
    fn test_directory_sink_writes_maps_and_manifest() {
        let root = scratch_dir("sink");
        let mut sink = DirectorySink::new(&root);
        let manifest = sink
            .apply(&texture_set("rusty metal"), &MaterialSettings::default())
            .unwrap();

        assert_eq!(manifest.name, "AI_rusty metal");
        assert_eq!(manifest.texture_slots.len(), 4);
        let dir = sink.material_dir(&manifest.name);
        for slot in &manifest.texture_slots {
            assert!(dir.join(&slot.file).is_file(), "missing {}", slot.file);
            let expected = if slot.kind == MapKind::Diffuse {
                ColorSpace::Srgb
            } else {
                ColorSpace::NonColor
            };
            assert_eq!(slot.color_space, expected);
        }
        assert_eq!(manifest.texture_slots[0].file, "AI_rusty_metal_diffuse.png");

        let written: MaterialManifest =
            serde_json::from_str(&fs::read_to_string(dir.join(MANIFEST_FILE)).unwrap()).unwrap();
        assert_eq!(written, manifest);

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_sink_sanitizes_settings() {
        let root = scratch_dir("sanitize");
        let settings = MaterialSettings {
            normal_strength: 100.0,
            mapping_scale: [0.0, 1.0, 1.0],
            height_boost: Some(0.3),
        };
        let manifest = DirectorySink::new(&root)
            .apply(&texture_set("sand"), &settings)
            .unwrap();
        assert_eq!(manifest.settings.normal_strength, MAX_NORMAL_STRENGTH);
        assert_eq!(manifest.settings.mapping_scale[0], 0.01);
        assert_eq!(manifest.settings.height_boost, Some(0.3));
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_apply_normal_strength_updates_manifest() {
        let root = scratch_dir("strength");
        let mut sink = DirectorySink::new(&root);
        let manifest = sink
            .apply(&texture_set("oak"), &MaterialSettings::default())
            .unwrap();
        let path = sink.material_dir(&manifest.name).join(MANIFEST_FILE);

        let updated = apply_normal_strength(&path, 4.0).unwrap();
        assert_eq!(updated.settings.normal_strength, 4.0);

        let clamped = apply_normal_strength(&path, 0.0).unwrap();
        assert_eq!(clamped.settings.normal_strength, 0.1);

        let reread: MaterialManifest =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(reread.settings.normal_strength, 0.1);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_apply_normal_strength_missing_file() {
        let err = apply_normal_strength(Path::new("/nonexistent/material.json"), 1.0).unwrap_err();
        assert!(matches!(err, SinkError::Io(_)));
    }
}
