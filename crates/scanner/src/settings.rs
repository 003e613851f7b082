//! Configuration loading: optional TOML file overlaid by `ARB__*` env vars

use anyhow::Context;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use std::env;
use tracing::{debug, info};

use arb_core::AppConfig;

/// Config file path when `ARB_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "arb-scanner.toml";

/// Load from the file named by `ARB_CONFIG` plus the environment, then validate
pub fn load() -> anyhow::Result<AppConfig> {
    let path = env::var("ARB_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    info!("Loading configuration from {} (optional) and ARB__* env", path);

    let builder = Config::builder()
        .add_source(File::with_name(&path).required(false))
        .add_source(
            Environment::with_prefix("ARB")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("exchanges.enabled")
                .with_list_parse_key("universe.symbols"),
        );

    finish(builder, |key| env::var(key).ok())
}

/// Parse a TOML document without consulting the environment
pub fn from_toml_str(toml: &str) -> anyhow::Result<AppConfig> {
    let builder = Config::builder().add_source(File::from_str(toml, FileFormat::Toml));
    finish(builder, |_| None)
}

fn finish<F>(
    builder: ConfigBuilder<config::builder::DefaultState>,
    lookup: F,
) -> anyhow::Result<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config: AppConfig = builder
        .build()
        .context("failed to read configuration")?
        .try_deserialize()
        .context("failed to parse configuration")?;

    apply_legacy_env(&mut config, lookup);
    config.validate()?;
    Ok(config)
}

/// Plain `CMC_API_KEY`, `BOT_TOKEN` and `CHAT_ID` fill secrets left unset
fn apply_legacy_env<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let fill = |slot: &mut Option<String>, key: &str| {
        if slot.is_none() {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                debug!("Using {} from environment", key);
                *slot = Some(value);
            }
        }
    };

    fill(&mut config.universe.api_key, "CMC_API_KEY");
    fill(&mut config.alerts.telegram_bot_token, "BOT_TOKEN");
    fill(&mut config.alerts.telegram_chat_id, "CHAT_ID");
}
