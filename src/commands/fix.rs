use crate::copyright::CopyrightRuleEngine;
use crate::dates::{self, DateCandidates, DateSource, EXIF_DATE_FORMAT};
use crate::error::AppError;
use crate::metadata::PhotoRecord;
use crate::mutation::{MetadataWriter, MutationDispatcher, MutationPlan};
use crate::processor::{FileHandler, Outcome};
use crate::prompt::{Prompter, Selection};
use chrono::NaiveDateTime;

const COPYRIGHT_KEY: &str = "Exif.Image.Copyright";
const DOCUMENT_NAME_KEY: &str = "Exif.Image.DocumentName";

/// Offsets left over from the old dates would contradict the new ones.
const TIME_ZONE_KEYS: [&str; 3] = [
    "Exif.Photo.OffsetTime",
    "Exif.Photo.OffsetTimeOriginal",
    "Exif.Photo.OffsetTimeDigitized",
];

/// Repairs dates, copyright and document name.
pub struct FixHandler<'a> {
    prefer_filename: bool,
    rules: CopyrightRuleEngine<'a>,
    dispatcher: MutationDispatcher<'a>,
    prompter: &'a mut dyn Prompter,
}

impl<'a> FixHandler<'a> {
    pub fn new(
        prefer_filename: bool,
        rules: CopyrightRuleEngine<'a>,
        writer: &'a dyn MetadataWriter,
        prompter: &'a mut dyn Prompter,
    ) -> Self {
        Self {
            prefer_filename,
            rules,
            dispatcher: MutationDispatcher::new(writer),
            prompter,
        }
    }

    fn choose_date(&mut self, record: &PhotoRecord, candidates: &DateCandidates) -> Result<NaiveDateTime, AppError> {
        if self.prefer_filename {
            if let Some(date) = candidates.get(DateSource::Filename) {
                log::debug!("  auto-accepting filename match for date ({})", date);
                return Ok(date);
            }
        }

        let available = candidates.distinct();
        let options: Vec<String> = available.iter().map(|d| d.to_string()).collect();
        let heading = format!(
            "Found {} different dates in {}",
            available.len(),
            record.path().display()
        );
        loop {
            let selection = self.prompter.choose(
                &heading,
                &options,
                "Please pick one of these options (1, 2, 3 etc.) or enter a date in 'YYYY:MM:DD HH:MM:SS' format:",
            )?;
            match selection {
                Selection::Index(idx) => return Ok(available[idx]),
                Selection::Text(text) => match dates::parse_date(&text) {
                    Some(date) => return Ok(date),
                    None => log::warn!("'{}' is neither an option nor a date", text),
                },
            }
        }
    }

    fn plan(&mut self, record: &PhotoRecord) -> Result<MutationPlan, AppError> {
        let mut plan = MutationPlan::new();

        let candidates = record.dates();
        if !candidates.all_equal() {
            let date = self.choose_date(record, &candidates)?;
            let formatted = date.format(EXIF_DATE_FORMAT).to_string();
            for key in DateSource::ALL.iter().filter_map(|s| s.writer_key()) {
                plan.set(key, formatted.as_str());
            }
            for key in TIME_ZONE_KEYS {
                plan.cleanup(key);
            }
            log::debug!("  updating all dates to ({})", date);
        }

        if record.copyright().is_none() {
            let holder = self.rules.resolve(record, &mut *self.prompter)?;
            log::debug!("  adding copyright holder ({})", holder);
            plan.set(COPYRIGHT_KEY, holder);
        }

        if record.name().is_none() && record.comment().is_none() {
            let name = document_name(record);
            log::debug!("  setting DocumentName ({})", name);
            plan.set(DOCUMENT_NAME_KEY, name);
        }

        Ok(plan)
    }
}

/// The part of the file stem after the last `"- "`, uppercased.
pub fn document_name(record: &PhotoRecord) -> String {
    let stem = record
        .path()
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    stem.rsplit("- ").next().unwrap_or_default().to_uppercase()
}

impl FileHandler for FixHandler<'_> {
    fn process(&mut self, record: &PhotoRecord) -> Result<Outcome, AppError> {
        let plan = self.plan(record)?;
        if plan.is_empty() {
            return Ok(Outcome::success("Validated"));
        }
        Ok(self.dispatcher.apply(record.path(), plan))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::record;
    use crate::mutation::testing::RecordingWriter;
    use crate::mutation::MutationOp;
    use crate::prompt::ScriptedPrompter;
    use crate::settings::Settings;

    fn set(tag: &str, value: &str) -> MutationOp {
        MutationOp::Set { tag: tag.into(), value: value.into() }
    }

    fn date_ops(value: &str) -> Vec<MutationOp> {
        vec![
            set("Exif.Image.DateTime", value),
            set("Exif.Photo.DateTimeDigitized", value),
            set("Exif.Photo.DateTimeOriginal", value),
        ]
    }

    fn cleanup_ops() -> Vec<MutationOp> {
        TIME_ZONE_KEYS.iter().map(|t| MutationOp::Delete { tag: t.to_string() }).collect()
    }

    fn complete(path: &str, date: &str) -> PhotoRecord {
        record(
            path,
            &[
                ("Image DateTime", Some(date)),
                ("Image Copyright", Some("Alice")),
                ("Image DocumentName", Some("BEACH")),
            ],
        )
    }

    #[test]
    fn test_consistent_file_is_left_alone() {
        let writer = RecordingWriter::default();
        let mut prompter = ScriptedPrompter::new(&[]);
        let mut handler = FixHandler::new(false, CopyrightRuleEngine::new(&[]), &writer, &mut prompter);

        let outcome = handler.process(&complete("/p/a.jpg", "2021:03:04 15:30:12")).unwrap();

        assert_eq!(outcome, Outcome::success("Validated"));
        assert!(writer.calls.borrow().is_empty());
    }

    #[test]
    fn test_filename_date_auto_accepted() {
        let writer = RecordingWriter::default();
        let mut prompter = ScriptedPrompter::new(&[]);
        let mut handler = FixHandler::new(true, CopyrightRuleEngine::new(&[]), &writer, &mut prompter);

        let outcome = handler
            .process(&complete("/p/IMG_20210304-153012.jpg", "2020:01:01 00:00:00"))
            .unwrap();

        assert!(outcome.success);
        let mut expected = date_ops("2021:03:04 15:30:12");
        expected.extend(cleanup_ops());
        assert_eq!(*writer.calls.borrow(), expected);
    }

    #[test]
    fn test_date_chosen_by_index() {
        let writer = RecordingWriter::default();
        let mut prompter = ScriptedPrompter::new(&["1"]);
        let mut handler = FixHandler::new(false, CopyrightRuleEngine::new(&[]), &writer, &mut prompter);

        handler
            .process(&complete("/p/IMG_20210304-153012.jpg", "2020:01:01 00:00:00"))
            .unwrap();

        // Options are sorted, so the older EXIF date comes first.
        assert_eq!(writer.calls.borrow()[0], set("Exif.Image.DateTime", "2020:01:01 00:00:00"));
    }

    #[test]
    fn test_date_typed_after_bad_answer() {
        let writer = RecordingWriter::default();
        let mut prompter = ScriptedPrompter::new(&["tomorrow", "2019:12:31 23:59:59"]);
        let mut handler = FixHandler::new(false, CopyrightRuleEngine::new(&[]), &writer, &mut prompter);

        handler
            .process(&complete("/p/IMG_20210304-153012.jpg", "2020:01:01 00:00:00"))
            .unwrap();

        assert_eq!(writer.calls.borrow()[0], set("Exif.Image.DateTime", "2019:12:31 23:59:59"));
        drop(handler);
        assert_eq!(prompter.questions.len(), 2);
    }

    #[test]
    fn test_prompt_exhaustion_is_a_fault() {
        let writer = RecordingWriter::default();
        let mut prompter = ScriptedPrompter::new(&[]);
        let mut handler = FixHandler::new(false, CopyrightRuleEngine::new(&[]), &writer, &mut prompter);

        let result = handler.process(&complete("/p/IMG_20210304-153012.jpg", "2020:01:01 00:00:00"));
        assert!(matches!(result, Err(AppError::Prompt(_))));
    }

    #[test]
    fn test_copyright_and_document_name_added() {
        let settings =
            Settings::from_yaml("copyright:\n  - name: Alice\n    whenever:\n      - filename-regex: \"Holiday\"\n")
                .unwrap();
        let writer = RecordingWriter::default();
        let mut prompter = ScriptedPrompter::new(&[]);
        let mut handler =
            FixHandler::new(false, CopyrightRuleEngine::new(settings.copyright_rules()), &writer, &mut prompter);

        let r = record(
            "/p/Holiday 2020 - beach day.jpg",
            &[("EXIF DateTimeOriginal", Some("2020:08:01 12:00:00"))],
        );
        let outcome = handler.process(&r).unwrap();

        assert_eq!(outcome, Outcome::success("Updated"));
        assert_eq!(
            *writer.calls.borrow(),
            vec![
                set("Exif.Image.Copyright", "Alice"),
                set("Exif.Image.DocumentName", "BEACH DAY"),
            ]
        );
    }

    #[test]
    fn test_blank_copyright_is_replaced() {
        let writer = RecordingWriter::default();
        let mut prompter = ScriptedPrompter::new(&["Jane"]);
        let mut handler = FixHandler::new(false, CopyrightRuleEngine::new(&[]), &writer, &mut prompter);

        let r = record(
            "/p/photo.jpg",
            &[
                ("Image DateTime", Some("2021:03:04 15:30:12")),
                ("Image Copyright", Some("    ")),
                ("Image DocumentName", Some("BEACH")),
            ],
        );
        let outcome = handler.process(&r).unwrap();

        assert_eq!(outcome, Outcome::success("Updated"));
        assert_eq!(*writer.calls.borrow(), vec![set("Exif.Image.Copyright", "Jane")]);
    }

    #[test]
    fn test_writer_failure_marks_file_failed() {
        let writer = RecordingWriter::failing_on("Exif.Photo.DateTimeDigitized");
        let mut prompter = ScriptedPrompter::new(&["Bob"]);
        let mut handler = FixHandler::new(true, CopyrightRuleEngine::new(&[]), &writer, &mut prompter);

        let r = record(
            "/p/IMG_20210304-153012.jpg",
            &[
                ("Image DateTime", Some("2020:01:01 00:00:00")),
                ("Image DocumentName", Some("X")),
            ],
        );
        let outcome = handler.process(&r).unwrap();

        assert!(!outcome.success);
        assert_eq!(writer.calls.borrow().len(), 2);
    }

    #[test]
    fn test_document_name_from_stem() {
        assert_eq!(document_name(&record("/p/2020 - Trip - lake view.jpg", &[])), "LAKE VIEW");
        assert_eq!(document_name(&record("/p/sunset.jpg", &[])), "SUNSET");
    }
}
