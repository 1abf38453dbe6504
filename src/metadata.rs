// src/metadata.rs

use crate::dates::{self, DateCandidate, DateCandidates, DateSource};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Composite tag: make and model joined, with repeated words collapsed.
pub const CAMERA_TAG: &str = "Camera";

/// Decoded metadata of one photo. Untrusted fields are kept as `None`.
#[derive(Debug, Clone)]
pub struct PhotoRecord {
    path: PathBuf,
    tags: HashMap<String, Option<String>>,
    keywords: Vec<String>,
}

impl PhotoRecord {
    pub fn new(path: PathBuf, tags: HashMap<String, Option<String>>, keywords: Vec<String>) -> Self {
        Self { path, tags, keywords }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn read_tag(&self, name: &str) -> Option<String> {
        if name == CAMERA_TAG {
            return self.camera();
        }
        self.tags
            .get(name)
            .cloned()
            .flatten()
            .filter(|v| !v.trim().is_empty())
    }

    fn camera(&self) -> Option<String> {
        let parts: Vec<String> = [self.read_tag("Image Make"), self.read_tag("Image Model")]
            .into_iter()
            .flatten()
            .collect();
        if parts.is_empty() {
            return None;
        }
        let joined = parts.join(" ");
        let mut words: Vec<&str> = joined.split(' ').collect();
        words.dedup();
        Some(words.join(" "))
    }

    pub fn copyright(&self) -> Option<String> {
        self.read_tag("Image Copyright")
    }

    pub fn name(&self) -> Option<String> {
        self.read_tag("Image DocumentName")
    }

    pub fn comment(&self) -> Option<String> {
        self.read_tag("EXIF UserComment")
    }

    pub fn dates(&self) -> DateCandidates {
        let candidates = DateSource::ALL
            .iter()
            .map(|&source| {
                let date = match source.tag_name() {
                    Some(tag) => self.read_tag(tag).and_then(|v| dates::parse_date(&v)),
                    None => dates::extract_filename_date(&self.file_name()),
                };
                DateCandidate { source, date }
            })
            .collect();
        DateCandidates::new(candidates)
    }

    pub fn canonical_date(&self) -> Option<NaiveDateTime> {
        self.dates().canonical()
    }
}

#[cfg(test)]
pub(crate) fn record(path: &str, tags: &[(&str, Option<&str>)]) -> PhotoRecord {
    PhotoRecord::new(
        PathBuf::from(path),
        tags.iter()
            .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
            .collect(),
        Vec::new(),
    )
}
