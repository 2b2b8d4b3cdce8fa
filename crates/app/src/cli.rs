//! Command-line arguments

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use pbrforge_diffusion::ResizeFilter;
use pbrforge_ipc::{MaterialPreset, Resolution};

/// Generate PBR materials (diffuse, roughness, normal, metallic) from a text
/// prompt using a remote diffusion backend.
#[derive(Parser, Debug)]
#[command(name = "pbrforge", version, about)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Backend base URL [env: PBRFORGE_BACKEND_URL]
    #[arg(long, global = true, value_name = "URL")]
    pub backend_url: Option<String>,

    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a material and write it to the output directory
    Generate(GenerateArgs),

    /// Query the backend's health endpoint
    Health,

    /// Change the normal strength recorded in a written material
    SetStrength {
        /// Path to a material's manifest (material.json)
        manifest: PathBuf,

        /// New strength (0.1 - 20.0)
        strength: f32,
    },
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Texture description. Required unless a preset is given.
    pub prompt: Option<String>,

    /// Material preset, e.g. metal_rusted, wood_oak, stone_marble
    #[arg(short, long, default_value = "custom")]
    pub preset: MaterialPreset,

    /// Output resolution: 512, 768, 1024 or 2048
    #[arg(short, long, default_value = "1024", value_parser = parse_resolution)]
    pub resolution: Resolution,

    /// Request a seamlessly tileable texture
    #[arg(short, long)]
    pub tileable: bool,

    /// Normal-map node strength written to the material [env: PBRFORGE_NORMAL_STRENGTH]
    #[arg(long, value_name = "0.1-20")]
    pub normal_strength: Option<f32>,

    /// Blend extra bump detail from the diffuse map at this strength
    #[arg(long, value_name = "STRENGTH")]
    pub height_boost: Option<f32>,

    /// Texture mapping scale on X, Y and Z
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"])]
    pub mapping_scale: Option<Vec<f32>>,

    /// Resample the generated maps to this size before writing
    #[arg(long, value_name = "PIXELS")]
    pub resize: Option<u32>,

    /// Resampling filter: lanczos, bicubic, bilinear or nearest
    #[arg(long, default_value = "lanczos")]
    pub filter: ResizeFilter,

    /// Output directory [env: PBRFORGE_OUTPUT_DIR]
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Cancel the job if it has not finished after this many seconds
    #[arg(long, value_name = "SECS")]
    pub max_wait: Option<u64>,

    /// Print host events to stdout as JSON lines
    #[arg(long)]
    pub events: bool,
}

fn parse_resolution(s: &str) -> Result<Resolution, String> {
    let pixels: u32 = s
        .trim()
        .parse()
        .map_err(|_| format!("{s:?} is not a number"))?;
    Resolution::try_from(pixels).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_args() {
        let args = CliArgs::try_parse_from([
            "pbrforge",
            "generate",
            "mossy bricks",
            "--resolution",
            "512",
            "--tileable",
            "--mapping-scale",
            "2",
            "2",
            "1",
            "--filter",
            "nearest",
        ])
        .unwrap();

        let Command::Generate(generate) = args.command else {
            panic!("expected generate");
        };
        assert_eq!(generate.prompt.as_deref(), Some("mossy bricks"));
        assert_eq!(generate.resolution, Resolution::R512);
        assert!(generate.tileable);
        assert_eq!(generate.mapping_scale, Some(vec![2.0, 2.0, 1.0]));
        assert_eq!(generate.filter, ResizeFilter::Nearest);
        assert_eq!(generate.preset, MaterialPreset::Custom);
    }

    #[test]
    fn test_rejects_unsupported_resolution() {
        let result = CliArgs::try_parse_from(["pbrforge", "generate", "x", "-r", "640"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_preset_and_global_url() {
        let args = CliArgs::try_parse_from([
            "pbrforge",
            "generate",
            "--preset",
            "wood_oak",
            "--backend-url",
            "http://gpu:5000",
        ])
        .unwrap();
        assert_eq!(args.backend_url.as_deref(), Some("http://gpu:5000"));
        let Command::Generate(generate) = args.command else {
            panic!("expected generate");
        };
        assert_eq!(generate.preset, MaterialPreset::WoodOak);
        assert!(generate.prompt.is_none());
    }
}
