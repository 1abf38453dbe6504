use crate::error::AppError;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const FILENAME_REGEX_KEY: &str = "filename-regex";

#[derive(Debug, Deserialize, Clone)]
pub struct AzureSettings {
    pub endpoint: String,
    pub subscription_key: String,
}

#[derive(Debug, Deserialize)]
struct RawRuleSet {
    name: String,
    #[serde(default)]
    whenever: Vec<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    azure: Option<AzureSettings>,
    copyright: Option<Vec<RawRuleSet>>,
}

#[derive(Debug, Clone)]
pub enum Predicate {
    /// Anchored at the start of the base file name.
    FilenameRegex(Regex),
    /// Case-insensitive comparison against a tag's printable value.
    TagEquals { tag: String, value: String },
}

/// A copyright holder and the conditions, all of which must hold, that select it.
#[derive(Debug, Clone)]
pub struct CopyrightRuleSet {
    pub name: String,
    pub predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub azure: Option<AzureSettings>,
    /// `None` when the document has no `copyright` section at all.
    pub copyright: Option<Vec<CopyrightRuleSet>>,
}

impl Settings {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let path = path.as_ref();
        log::debug!("Loading settings from {:?}", path);
        let data = fs::read_to_string(path)?;
        Self::from_yaml(&data)
    }

    pub fn from_yaml(data: &str) -> Result<Self, AppError> {
        let raw: RawSettings = serde_yaml::from_str(data)?;

        let copyright = match raw.copyright {
            Some(rulesets) => Some(
                rulesets
                    .into_iter()
                    .enumerate()
                    .map(|(idx, ruleset)| compile_ruleset(idx, ruleset))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            None => None,
        };

        Ok(Self { azure: raw.azure, copyright })
    }

    pub fn copyright_rules(&self) -> &[CopyrightRuleSet] {
        self.copyright.as_deref().unwrap_or(&[])
    }
}

fn compile_ruleset(idx: usize, raw: RawRuleSet) -> Result<CopyrightRuleSet, AppError> {
    if raw.whenever.is_empty() {
        return Err(AppError::InvalidRule(format!(
            "ruleset '{}' (index {}) has no 'whenever' conditions",
            raw.name,
            idx + 1
        )));
    }

    let mut predicates = Vec::with_capacity(raw.whenever.len());
    for condition in raw.whenever {
        if condition.len() != 1 {
            return Err(AppError::InvalidRule(format!(
                "ruleset '{}' (index {}): each condition needs exactly one key, found {}",
                raw.name,
                idx + 1,
                condition.len()
            )));
        }
        for (key, value) in condition {
            let predicate = if key == FILENAME_REGEX_KEY {
                Predicate::FilenameRegex(Regex::new(&format!("^(?:{})", value))?)
            } else {
                Predicate::TagEquals { tag: key, value }
            };
            predicates.push(predicate);
        }
    }

    Ok(CopyrightRuleSet { name: raw.name, predicates })
}
