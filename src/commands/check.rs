use super::{FAIL, PASS};
use crate::error::AppError;
use crate::metadata::PhotoRecord;
use crate::processor::{FileHandler, Outcome};

/// Reports on metadata without changing anything.
#[derive(Debug, Default)]
pub struct CheckHandler;

impl FileHandler for CheckHandler {
    fn process(&mut self, record: &PhotoRecord) -> Result<Outcome, AppError> {
        let mut failed = false;

        match record.canonical_date() {
            Some(date) => log::info!("... {} All dates are equal ({})", PASS, date),
            None => {
                log::info!("... {} Not all dates are equal!", FAIL);
                failed = true;
            }
        }

        if let Some(copyright) = record.copyright() {
            log::info!("... {} Found copyright information ({})", PASS, copyright);
        }

        let name = record.name();
        let comment = record.comment();
        if name.is_none() && comment.is_none() {
            log::info!("... {} No comment or document name found!", FAIL);
            failed = true;
        }
        if let Some(name) = name {
            log::info!("... {} Found document name ({})", PASS, name);
        }
        if let Some(comment) = comment {
            log::info!("... {} Found comment information ({})", PASS, comment);
        }

        Ok(if failed {
            Outcome::failure("Failed validation")
        } else {
            Outcome::success("Validated")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::record;

    #[test]
    fn test_consistent_named_photo_passes() {
        let r = record(
            "/p/photo.jpg",
            &[
                ("Image DateTime", Some("2021:03:04 15:30:12")),
                ("Image DocumentName", Some("BEACH")),
            ],
        );
        assert_eq!(CheckHandler.process(&r).unwrap(), Outcome::success("Validated"));
    }

    #[test]
    fn test_conflicting_dates_fail() {
        let r = record(
            "/p/IMG_20210304-153012.jpg",
            &[
                ("Image DateTime", Some("2020:01:01 00:00:00")),
                ("EXIF UserComment", Some("hello")),
            ],
        );
        assert!(!CheckHandler.process(&r).unwrap().success);
    }

    #[test]
    fn test_no_dates_fail() {
        let r = record("/p/photo.jpg", &[("Image DocumentName", Some("X"))]);
        assert!(!CheckHandler.process(&r).unwrap().success);
    }

    #[test]
    fn test_missing_name_and_comment_fail() {
        let r = record(
            "/p/photo.jpg",
            &[
                ("Image DateTime", Some("2021:03:04 15:30:12")),
                ("Image Copyright", Some("Alice")),
            ],
        );
        assert!(!CheckHandler.process(&r).unwrap().success);
    }
}
