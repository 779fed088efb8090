//! Utility functions for CLI commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use serde::Deserialize;
use vigil_engine::EngineConfig;
use vigil_featstore::KvFeatureStore;

use crate::Cli;
use crate::paths::Paths;

/// Loads the engine configuration.
///
/// An explicit `--config` must exist. The default file is optional.
pub fn get_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    if let Some(path) = cli.config.as_deref() {
        return EngineConfig::load(path).with_context(|| format!("loading config {path}"));
    }
    let path = Paths::new()?.config_file();
    if path.exists() {
        return EngineConfig::load(&path)
            .with_context(|| format!("loading config {}", path.display()));
    }
    Ok(EngineConfig::default())
}

/// Resolves the store file: `--store`, then `store_path` from config, then the default.
pub fn store_path(cli: &Cli, cfg: &EngineConfig) -> anyhow::Result<PathBuf> {
    if let Some(p) = cli.store.as_deref() {
        return Ok(PathBuf::from(p));
    }
    if let Some(p) = &cfg.store_path {
        return Ok(p.clone());
    }
    Ok(Paths::new()?.store_file())
}

/// Opens the configured store, creating its directory if needed.
pub fn open_store(cli: &Cli) -> anyhow::Result<(EngineConfig, Arc<KvFeatureStore>)> {
    let cfg = get_config(cli)?;
    let path = store_path(cli, &cfg)?;
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
    }
    let store = KvFeatureStore::open_path(&path, cfg.store)
        .with_context(|| format!("opening store {}", path.display()))?;
    tracing::debug!(path = %path.display(), "cli: store opened");
    Ok((cfg, Arc::new(store)))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VectorFile {
    One(Vec<f32>),
    Many(Vec<Vec<f32>>),
}

/// Loads vectors from a JSON file holding one array or an array of arrays.
pub fn load_vectors(path: &Path) -> anyhow::Result<Vec<Vec<f32>>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let parsed: VectorFile = serde_json::from_str(&content)
        .with_context(|| format!("parsing vectors from {}", path.display()))?;
    Ok(match parsed {
        VectorFile::One(v) => vec![v],
        VectorFile::Many(vs) => vs,
    })
}

/// Outputs result as JSON or YAML.
pub fn output_result<T: serde::Serialize>(result: &T, as_json: bool) -> anyhow::Result<()> {
    let output = if as_json {
        serde_json::to_string_pretty(result)? + "\n"
    } else {
        serde_yaml::to_string(result)?
    };
    print!("{output}");
    Ok(())
}

/// Prints verbose output if enabled.
pub fn print_verbose(cli: &Cli, msg: &str) {
    if cli.verbose {
        eprintln!("[verbose] {msg}");
    }
}

/// Prints success message.
pub fn print_success(msg: &str) {
    eprintln!("\x1b[32m✓\x1b[0m {msg}");
}

/// Prints warning message.
pub fn print_warning(msg: &str) {
    eprintln!("\x1b[33m⚠\x1b[0m {msg}");
}
