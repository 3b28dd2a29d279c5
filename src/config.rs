use anyhow::Result;
use clap_serde_derive::ClapSerde;
use serde::Deserialize;

#[derive(ClapSerde, Deserialize, Debug)]
pub struct Config {
    /// The address the listener binds to
    #[arg(short, long, env, default_value = "0.0.0.0")]
    pub(crate) address: String,

    /// The port the listener binds to
    #[arg(short, long, env, default_value = "8000")]
    pub(crate) port: u16,

    /// Directory holding the tokenizer and model checkpoint
    #[arg(short, long, env, default_value = "ml_models")]
    pub(crate) model_dir: String,

    /// OTLP collector endpoint; leave empty to log to the console only
    #[arg(long, env, default_value = "")]
    pub(crate) otlp_endpoint: String,

    /// Also log to the console when exporting to an OTLP collector
    #[arg(long, env)]
    pub(crate) log_console: bool,
}

impl Config {
    pub fn from_toml(path: &str) -> Result<Self> {
        let str = std::fs::read_to_string(path)?;
        let config = toml::from_str(&str)?;
        Ok(config)
    }
}
