//! Layered configuration: built-in defaults, an optional `suara.toml`,
//! and `SUARA__*` environment overrides, in that order.

use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub talk: TalkConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Port the narration service listens on.
    pub port: u16,
    /// Directory holding the audio cache and output files.
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TalkConfig {
    /// Chat completion endpoint.
    pub chat_url: String,
    /// Narration service synthesis endpoint.
    pub narrate_url: String,
    /// Model to select at startup; catalog default when unset.
    pub model: Option<String>,
    /// Language tag for synthesis.
    pub lang: String,
}

pub fn load() -> anyhow::Result<AppConfig> {
    let config = config::Config::builder()
        .set_default("server.port", 5001)?
        .set_default("server.data_dir", "data")?
        .set_default("talk.chat_url", "http://localhost:8080/chat")?
        .set_default("talk.narrate_url", "http://localhost:5001/tts/stream")?
        .set_default("talk.lang", "id")?
        .add_source(config::File::with_name("suara").required(false))
        .add_source(config::Environment::with_prefix("SUARA").separator("__"))
        .build()?;
    Ok(config.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable_without_a_config_file() {
        let config = load().unwrap();
        assert_eq!(config.server.port, 5001);
        assert_eq!(config.talk.lang, "id");
        assert!(config.talk.model.is_none());
        // The narrator wants the streaming route, not the JSON one.
        assert!(config.talk.narrate_url.ends_with("/tts/stream"));
    }
}
