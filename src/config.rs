use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::archive::WalkOptions;
use crate::cli::Cli;

pub const DEFAULT_ANNOTATION: &str = "Lio/airlift/configuration/Config;";
pub const ANNOTATION_ENV: &str = "ANNOTATION_FINDER_ANNOTATION";

/// Optional JSON config file.
///
/// ```json
/// { "annotation": "io.airlift.configuration.Config", "jar_suffixes": [".jar", ".war"] }
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub annotation: Option<String>,
    pub jar_suffixes: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Exact annotation type descriptor, e.g. `Lio/airlift/configuration/Config;`.
    pub target_descriptor: String,
    pub walk: WalkOptions,
}

pub fn resolve_settings(cli: &Cli) -> Result<Settings> {
    let file = load_file_config(cli.config.as_deref())?;
    let env = std::env::var(ANNOTATION_ENV).ok();
    settings_from(cli.annotation.as_deref(), env.as_deref(), file)
}

pub fn settings_from(
    cli_annotation: Option<&str>,
    env_annotation: Option<&str>,
    file: FileConfig,
) -> Result<Settings> {
    let raw = cli_annotation
        .or(env_annotation.filter(|s| !s.trim().is_empty()))
        .or(file.annotation.as_deref())
        .unwrap_or(DEFAULT_ANNOTATION);

    let walk = match file.jar_suffixes {
        Some(suffixes) if !suffixes.is_empty() => WalkOptions {
            jar_suffixes: suffixes,
        },
        _ => WalkOptions::default(),
    };

    Ok(Settings {
        target_descriptor: normalize_descriptor(raw)?,
        walk,
    })
}

/// Accepts a descriptor (`Lpkg/Name;`) or a type name (`pkg.Name`,
/// `pkg/Name`, `@pkg.Name`) and returns the descriptor form.
pub fn normalize_descriptor(raw: &str) -> Result<String> {
    let s = raw.trim();
    if s.starts_with('L') && s.ends_with(';') && s.len() > 2 {
        return Ok(s.to_string());
    }

    let name = s.strip_prefix('@').unwrap_or(s).trim();
    if name.is_empty() {
        bail!("Annotation type name is empty");
    }
    if name.chars().any(|c| c.is_whitespace() || c == ';' || c == '[') {
        bail!("Invalid annotation type name: {raw}");
    }
    Ok(format!("L{};", name.replace('.', "/")))
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("annotation-finder").join("config.json"))
}

/// An explicit path must exist; the default location is optional.
fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig> {
    if let Some(path) = explicit {
        return read_file_config(path);
    }
    match default_config_path() {
        Some(path) if path.exists() => read_file_config(&path),
        _ => Ok(FileConfig::default()),
    }
}

pub fn read_file_config(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}
