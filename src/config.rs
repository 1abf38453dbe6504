use crate::classifier::ClassifierConfig;
use crate::decoder::DecoderOptions;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    /// Matched case-sensitively, so every spelling has to be listed.
    pub allowed_extensions: Vec<String>,
    pub exiv2_binary: String,
    #[serde(default)]
    pub writer_timeout_secs: Option<u64>,
    pub decoder: DecoderOptions,
    pub classifier: ClassifierConfig,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("PHOTOMETA").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("log_level", "info")?
            .set_default("allowed_extensions", vec!["jpg", "JPG", "jpeg", "JPEG"])?
            .set_default("exiv2_binary", "exiv2")?
            .set_default("decoder.continue_on_error", true)?
            .set_default("decoder.suppress_corrupt_field_warnings", true)?
            .set_default("decoder.untrusted_field_types", vec!["undefined", "unknown"])?
            .set_default("classifier.confidence_cutoff", 0.8)?
            .set_default("classifier.resized_image_size", 512)
    }

    pub fn writer_timeout(&self) -> Option<Duration> {
        self.writer_timeout_secs.map(Duration::from_secs)
    }
}
