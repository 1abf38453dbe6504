use crate::error::AppError;
use crate::settings::AzureSettings;
use image::imageops::FilterType;
use image::ImageOutputFormat;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::cmp::Ordering;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use url::Url;

const TAG_API_PATH: &str = "vision/v3.2/tag";
const SUBSCRIPTION_HEADER: &str = "Ocp-Apim-Subscription-Key";

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// Tags after the best one are kept only above this confidence.
    pub confidence_cutoff: f32,
    /// Edge length of the square the image is shrunk to when the service rejects it.
    pub resized_image_size: u32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self { confidence_cutoff: 0.8, resized_image_size: 512 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImageTag {
    pub name: String,
    pub confidence: f32,
}

/// A service that labels image content.
pub trait ImageTagger {
    fn tag_image(&self, image: &[u8]) -> Result<Vec<ImageTag>, AppError>;
}

/// Keep the most confident tag plus every other tag above `cutoff`.
pub fn select_tags(mut tags: Vec<ImageTag>, cutoff: f32) -> Vec<String> {
    tags.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(Ordering::Equal));
    let mut iter = tags.into_iter();
    let mut selected = match iter.next() {
        Some(best) => vec![best.name],
        None => return Vec::new(),
    };
    selected.extend(iter.filter(|t| t.confidence > cutoff).map(|t| t.name));
    selected
}

pub fn shrink_image(path: &Path, size: u32) -> Result<Vec<u8>, AppError> {
    let resized = image::open(path)?.resize_exact(size, size, FilterType::Triangle);
    let mut bytes = Vec::new();
    resized.write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Jpeg(90))?;
    Ok(bytes)
}

/// Tag an image file, retrying once with a shrunken copy if the service rejects the original.
pub fn classify_file(
    tagger: &dyn ImageTagger,
    path: &Path,
    config: &ClassifierConfig,
) -> Result<Vec<String>, AppError> {
    let original = fs::read(path)?;
    let tags = match tagger.tag_image(&original) {
        Ok(tags) => tags,
        Err(e) => {
            log::debug!("Tagging {:?} failed ({}), retrying with a resized image", path, e);
            let shrunk = shrink_image(path, config.resized_image_size)?;
            tagger.tag_image(&shrunk)?
        }
    };
    Ok(select_tags(tags, config.confidence_cutoff))
}

#[derive(Debug, Deserialize)]
struct TagResponse {
    tags: Vec<ImageTag>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Azure Computer Vision "tag" endpoint.
pub struct AzureTagger {
    client: Client,
    url: Url,
    subscription_key: String,
}

impl AzureTagger {
    pub fn new(settings: &AzureSettings) -> Result<Self, AppError> {
        let mut endpoint = settings.endpoint.clone();
        if !endpoint.ends_with('/') {
            endpoint.push('/');
        }
        let url = Url::parse(&endpoint)?.join(TAG_API_PATH)?;
        log::debug!("Azure tagger will use {}", url);
        Ok(Self {
            client: Client::new(),
            url,
            subscription_key: settings.subscription_key.clone(),
        })
    }
}

impl ImageTagger for AzureTagger {
    fn tag_image(&self, image: &[u8]) -> Result<Vec<ImageTag>, AppError> {
        let response = self
            .client
            .post(self.url.clone())
            .header(SUBSCRIPTION_HEADER, &self.subscription_key)
            .header(CONTENT_TYPE, mime::APPLICATION_OCTET_STREAM.as_ref())
            .body(image.to_vec())
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            let message = match serde_json::from_str::<ErrorBody>(&body) {
                Ok(e) => format!("{}: {}", e.error.code, e.error.message),
                Err(_) => body,
            };
            return Err(AppError::Classifier(format!("{} ({})", message, status)));
        }
        let parsed: TagResponse = serde_json::from_str(&body)?;
        Ok(parsed.tags)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::Cell;

    /// Returns fixed tags, optionally rejecting the first request.
    pub struct FakeTagger {
        pub tags: Vec<(&'static str, f32)>,
        pub reject_first: bool,
        pub calls: Cell<usize>,
    }

    impl FakeTagger {
        pub fn new(tags: Vec<(&'static str, f32)>) -> Self {
            Self { tags, reject_first: false, calls: Cell::new(0) }
        }
    }

    impl ImageTagger for FakeTagger {
        fn tag_image(&self, _image: &[u8]) -> Result<Vec<ImageTag>, AppError> {
            self.calls.set(self.calls.get() + 1);
            if self.reject_first && self.calls.get() == 1 {
                return Err(AppError::Classifier("InvalidImageSize".into()));
            }
            Ok(self
                .tags
                .iter()
                .map(|(name, confidence)| ImageTag { name: name.to_string(), confidence: *confidence })
                .collect())
        }
    }
}
