use clap::{Parser, Subcommand};

use ctoproxy_common::{GlobalConfig, GlobalConfigError, GlobalConfigPatch, ModelAdapter};

#[derive(Parser)]
#[command(name = "ctoproxy", version, about = "OpenAI-compatible bridge to cto.new")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Option<Command>,
    #[arg(long, global = true)]
    pub(crate) host: Option<String>,
    #[arg(long, global = true)]
    pub(crate) port: Option<u16>,
    /// One cookie header per line; edits are picked up without a restart.
    #[arg(long, global = true)]
    pub(crate) cookies_file: Option<String>,
    #[arg(long, global = true)]
    pub(crate) proxy: Option<String>,
    #[arg(long, global = true)]
    pub(crate) default_adapter: Option<String>,
    /// Extra `model=adapter` mapping; repeatable.
    #[arg(long = "model", global = true, value_parser = ModelAdapter::parse)]
    pub(crate) models: Vec<ModelAdapter>,
    #[arg(long, global = true)]
    pub(crate) stream_idle_timeout_secs: Option<u64>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    /// Run the HTTP gateway (default).
    Serve,
    /// Chat with the upstream from the terminal.
    Chat {
        #[arg(long)]
        adapter: Option<String>,
    },
}

impl Cli {
    pub(crate) fn patch(&self) -> GlobalConfigPatch {
        GlobalConfigPatch {
            host: self.host.clone(),
            port: self.port,
            cookies_file: self.cookies_file.clone(),
            proxy: self.proxy.clone(),
            default_adapter: self.default_adapter.clone(),
            model_adapters: (!self.models.is_empty()).then(|| self.models.clone()),
            stream_idle_timeout_secs: self.stream_idle_timeout_secs,
            ..GlobalConfigPatch::default()
        }
    }

    /// CLI flags over `CTOPROXY_*` variables over defaults.
    pub(crate) fn global_config(&self) -> Result<GlobalConfig, GlobalConfigError> {
        let mut merged = GlobalConfigPatch::from_env()?;
        merged.overlay(self.patch());
        merged.into_config()
    }
}
