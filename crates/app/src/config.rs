//! Run configuration: environment defaults with command-line overrides

use anyhow::{Result, bail};
use pbrforge_config::ForgeConfig;
use pbrforge_diffusion::ResizeFilter;
use pbrforge_ipc::{MaterialSettings, TextureRequest};

use crate::cli::GenerateArgs;

/// Everything one `generate` run needs
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub forge: ForgeConfig,
    pub request: TextureRequest,
    pub settings: MaterialSettings,
    pub resize: Option<(u32, ResizeFilter)>,
    pub max_wait_secs: Option<u64>,
    pub emit_events: bool,
}

impl RunConfig {
    /// Layer `args` over `forge`, which already carries the environment
    pub fn resolve(args: GenerateArgs, mut forge: ForgeConfig) -> Result<Self> {
        let custom = args.prompt.as_deref().map(str::trim).unwrap_or_default();
        let prompt = args.preset.resolve(custom);
        if prompt.is_empty() {
            bail!("a prompt or a --preset is required");
        }

        if let Some(dir) = args.output_dir {
            forge.output_dir = dir;
        }
        if let Some(strength) = args.normal_strength {
            forge.normal_strength = strength;
        }

        let mut settings = MaterialSettings {
            normal_strength: forge.normal_strength,
            height_boost: args.height_boost,
            ..Default::default()
        };
        if let Some(scale) = args.mapping_scale {
            let &[x, y, z] = scale.as_slice() else {
                bail!("--mapping-scale takes exactly three values");
            };
            settings.mapping_scale = [x, y, z];
        }

        let resize = match args.resize {
            Some(0) => bail!("--resize must be at least 1 pixel"),
            Some(size) => Some((size, args.filter)),
            None => None,
        };

        Ok(Self {
            request: TextureRequest::new(prompt, args.resolution, args.tileable),
            forge,
            settings: settings.sanitized(),
            resize,
            max_wait_secs: args.max_wait,
            emit_events: args.events,
        })
    }
}
