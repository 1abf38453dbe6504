use serde_json::Error as SerdeJsonError;
use serde_yaml::Error as SerdeYamlError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] SerdeJsonError),

    #[error("YAML error: {0}")]
    Yaml(#[from] SerdeYamlError),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid copyright rule: {0}")]
    InvalidRule(String),

    #[error("Metadata writer error: {0}")]
    Writer(String),

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("Generic error: {0}")]
    Generic(String),
}
