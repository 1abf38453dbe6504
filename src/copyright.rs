use crate::error::AppError;
use crate::metadata::PhotoRecord;
use crate::prompt::Prompter;
use crate::settings::{CopyrightRuleSet, Predicate};

/// Picks a copyright holder from ordered rulesets, first full match wins.
pub struct CopyrightRuleEngine<'a> {
    rulesets: &'a [CopyrightRuleSet],
}

impl<'a> CopyrightRuleEngine<'a> {
    pub fn new(rulesets: &'a [CopyrightRuleSet]) -> Self {
        Self { rulesets }
    }

    /// The holder named by the first matching ruleset, if any.
    pub fn matching_rule(&self, record: &PhotoRecord) -> Option<&'a str> {
        self.rulesets
            .iter()
            .find(|ruleset| ruleset.predicates.iter().all(|p| predicate_matches(p, record)))
            .map(|ruleset| ruleset.name.as_str())
    }

    /// Fall back to asking when no ruleset matches.
    pub fn resolve(&self, record: &PhotoRecord, prompter: &mut dyn Prompter) -> Result<String, AppError> {
        if let Some(name) = self.matching_rule(record) {
            log::debug!("Copyright rule '{}' matched {:?}", name, record.path());
            return Ok(name.to_string());
        }
        log::info!("No copyright rule found for {}", record.path().display());
        prompter.free_text("Please enter the name of the copyright holder:")
    }
}

fn predicate_matches(predicate: &Predicate, record: &PhotoRecord) -> bool {
    match predicate {
        Predicate::FilenameRegex(re) => re.is_match(&record.file_name()),
        Predicate::TagEquals { tag, value } => record
            .read_tag(tag)
            .map_or(false, |actual| actual.to_uppercase() == value.to_uppercase()),
    }
}
