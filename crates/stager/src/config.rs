use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde::Deserialize;
use stager_core::Config;

use crate::duration::parse_duration;

/// Command-line surface. Every field is optional except `--config`/`--init`
/// wiring so that a bare invocation falls through entirely to the JSON file
/// and then the built-in defaults, following "CLI > file > defaults"
/// precedence.
#[derive(Parser, Debug)]
#[command(name = "stagerd", author, version, about = "Host-dispatching reverse proxy with lazily-launched per-tenant workers")]
pub struct CliArgs {
    /// JSON config file to merge under CLI flags.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub domain_suffix: Option<String>,

    #[arg(long)]
    pub listen: Option<String>,

    #[arg(long)]
    pub base_port: Option<u16>,

    #[arg(long)]
    pub max_instances: Option<usize>,

    #[arg(long)]
    pub proxy_format: Option<String>,

    #[arg(long)]
    pub idle_time: Option<String>,

    #[arg(long)]
    pub resource_dir: Option<PathBuf>,

    #[arg(long)]
    pub hold_for: Option<String>,

    /// argv for the worker child process, e.g. `--init-command sh -c 'run.sh'`.
    #[arg(long, num_args = 1.., value_delimiter = ' ')]
    pub init_command: Option<Vec<String>>,
}

/// Shape of the JSON config file. Every field optional so a file only needs
/// to name what it overrides from the built-in defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileConfig {
    pub domain_suffix: Option<String>,
    pub listen: Option<String>,
    pub base_port: Option<u16>,
    pub max_instances: Option<usize>,
    pub proxy_format: Option<String>,
    pub init_command: Option<Vec<String>>,
    pub idle_time: Option<String>,
    pub resource_dir: Option<PathBuf>,
    pub hold_for: Option<String>,
}

impl FileConfig {
    pub fn from_path(path: &std::path::Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| anyhow::anyhow!("failed to read config file {}: {err}", path.display()))?;
        let parsed: Self = serde_json::from_str(&raw)
            .map_err(|err| anyhow::anyhow!("failed to parse config file {}: {err}", path.display()))?;
        Ok(parsed)
    }
}

/// Merge CLI flags over an optional JSON file over [`Config::default`], then
/// parse the duration-string fields, producing the plain-data `Config`
/// `stager-core` operates on.
pub fn build_config(args: &CliArgs) -> anyhow::Result<Arc<Config>> {
    let file = match &args.config {
        Some(path) => FileConfig::from_path(path)?,
        None => FileConfig::default(),
    };

    let mut config = Config::default();

    if let Some(v) = file.domain_suffix {
        config.domain_suffix = v;
    }
    if let Some(v) = file.listen {
        config.listen = v;
    }
    if let Some(v) = file.base_port {
        config.base_port = v;
    }
    if let Some(v) = file.max_instances {
        config.max_instances = v;
    }
    if let Some(v) = file.proxy_format {
        config.proxy_format = v;
    }
    if let Some(v) = file.init_command {
        config.init_command = v;
    }
    if let Some(v) = file.idle_time {
        config.idle_time = parse_duration(&v).map_err(|e| anyhow::anyhow!(e))?;
    }
    if let Some(v) = file.resource_dir {
        config.resource_dir = Some(v);
    }
    if let Some(v) = file.hold_for {
        config.hold_for = parse_duration(&v).map_err(|e| anyhow::anyhow!(e))?;
    }

    if let Some(v) = &args.domain_suffix {
        config.domain_suffix = v.clone();
    }
    if let Some(v) = &args.listen {
        config.listen = v.clone();
    }
    if let Some(v) = args.base_port {
        config.base_port = v;
    }
    if let Some(v) = args.max_instances {
        config.max_instances = v;
    }
    if let Some(v) = &args.proxy_format {
        config.proxy_format = v.clone();
    }
    if let Some(v) = &args.init_command {
        config.init_command = v.clone();
    }
    if let Some(v) = &args.idle_time {
        config.idle_time = parse_duration(v).map_err(|e| anyhow::anyhow!(e))?;
    }
    if let Some(v) = &args.resource_dir {
        config.resource_dir = Some(v.clone());
    }
    if let Some(v) = &args.hold_for {
        config.hold_for = parse_duration(v).map_err(|e| anyhow::anyhow!(e))?;
    }

    Ok(Arc::new(config))
}
