pub mod check;
pub mod generate;
pub mod graph;
pub mod preview;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use datagen_core::config::{read_config, Config};
use datagen_core::manifest::{load_schema, profile_manifest_path, Schema};

use crate::args::ManifestArgs;

/// The manifest a command works on, plus the optional datagen.toml it was
/// resolved with.
pub struct Loaded {
    pub path: PathBuf,
    pub schema: Schema,
    pub config: Option<Config>,
}

pub fn load_manifest(args: &ManifestArgs) -> Result<Loaded> {
    let config = read_config(Path::new("."))?;
    let path = resolve_manifest_path(args, config.as_ref())?;
    let schema = load_schema(&path)
        .with_context(|| format!("Failed to load manifest {}", path.display()))?;

    if let Some(config) = &config {
        for warning in config.validate_against_schema(&schema) {
            tracing::warn!("{}", warning);
        }
    }

    Ok(Loaded {
        path,
        schema,
        config,
    })
}

/// `--manifest`, then `--profile`/`PROFILE`, then `[generate] manifest`.
fn resolve_manifest_path(args: &ManifestArgs, config: Option<&Config>) -> Result<PathBuf> {
    if let Some(path) = &args.manifest {
        return Ok(path.clone());
    }
    if let Some(profile) = args.profile.as_deref().filter(|p| !p.is_empty()) {
        return Ok(profile_manifest_path(profile));
    }
    if let Some(config) = config {
        if let Some(path) = &config.generate.manifest {
            return Ok(config.resolve_path(path));
        }
    }
    bail!("No manifest given. Pass --manifest <file>, --profile <name> (or PROFILE), or set [generate] manifest in datagen.toml")
}
