use crate::classifier::{self, ClassifierConfig, ImageTagger};
use crate::error::AppError;
use crate::exiv2::KEYWORDS_TAG;
use crate::metadata::PhotoRecord;
use crate::mutation::{MetadataWriter, MutationDispatcher, MutationPlan};
use crate::processor::{FileHandler, Outcome};

/// Adds keywords from an image tagging service to photos that have none.
pub struct ClassifyHandler<'a> {
    tagger: &'a dyn ImageTagger,
    config: ClassifierConfig,
    dispatcher: MutationDispatcher<'a>,
}

impl<'a> ClassifyHandler<'a> {
    pub fn new(tagger: &'a dyn ImageTagger, config: ClassifierConfig, writer: &'a dyn MetadataWriter) -> Self {
        Self {
            tagger,
            config,
            dispatcher: MutationDispatcher::new(writer),
        }
    }
}

impl FileHandler for ClassifyHandler<'_> {
    fn process(&mut self, record: &PhotoRecord) -> Result<Outcome, AppError> {
        if !record.keywords().is_empty() {
            return Ok(Outcome::success("Skipped"));
        }

        log::debug!("  attempting to add keywords");
        let tags = classifier::classify_file(self.tagger, record.path(), &self.config)?;
        if tags.is_empty() {
            return Ok(Outcome::failure("Unclassified"));
        }
        log::debug!("Found {} classes: {:?}", tags.len(), tags);

        let mut plan = MutationPlan::new();
        for tag in tags {
            plan.add(KEYWORDS_TAG, tag);
        }
        Ok(self.dispatcher.apply(record.path(), plan))
    }
}
