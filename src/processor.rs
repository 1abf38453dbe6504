use crate::decoder::MetadataDecoder;
use crate::error::AppError;
use crate::metadata::PhotoRecord;
use crate::walker;
use std::fmt;
use std::path::{Path, PathBuf};

/// Result of handling a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub success: bool,
    pub status: String,
}

impl Outcome {
    pub fn success(status: impl Into<String>) -> Self {
        Self { success: true, status: status.into() }
    }

    pub fn failure(status: impl Into<String>) -> Self {
        Self { success: false, status: status.into() }
    }
}

/// Per-file work plugged into a batch run (check, fix, classify).
///
/// An `Err` is an unexpected fault and aborts the whole run; an ordinary
/// failure is reported through `Outcome::failure`.
pub trait FileHandler {
    fn process(&mut self, record: &PhotoRecord) -> Result<Outcome, AppError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub processed: u64,
    pub failed: u64,
}

impl BatchStats {
    pub fn record(&mut self, outcome: &Outcome) {
        self.processed += 1;
        if !outcome.success {
            self.failed += 1;
        }
    }

    pub fn failure_percentage(&self) -> f64 {
        if self.processed == 0 {
            return 0.0;
        }
        100.0 * self.failed as f64 / self.processed as f64
    }
}

impl fmt::Display for BatchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Processed {} photos of which {} ({:.2}%) failed validation",
            self.processed,
            self.failed,
            self.failure_percentage()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Scanning,
    Processing,
    Reporting,
    Done,
}

#[derive(Debug)]
pub enum ProgressEvent<'a> {
    Scanned { root: &'a Path, total: usize },
    Directory(&'a Path),
    FileDone { path: &'a Path, outcome: &'a Outcome },
    Finished(&'a BatchStats),
}

pub type ProgressCallback<'a> = dyn Fn(&ProgressEvent<'_>) + 'a;

pub struct BatchProcessor<'a> {
    decoder: &'a dyn MetadataDecoder,
    allowed_extensions: Vec<String>,
    state: BatchState,
}

impl<'a> BatchProcessor<'a> {
    pub fn new(decoder: &'a dyn MetadataDecoder, allowed_extensions: Vec<String>) -> Self {
        Self { decoder, allowed_extensions, state: BatchState::Idle }
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    fn transition(&mut self, next: BatchState) {
        log::trace!("Batch state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Run `handler` over every matching file under `root`, one at a time in path order.
    pub fn run(
        &mut self,
        root: &Path,
        handler: &mut dyn FileHandler,
        progress: &ProgressCallback<'_>,
    ) -> Result<BatchStats, AppError> {
        self.transition(BatchState::Scanning);
        let paths = walker::discover(root, &self.allowed_extensions)?;
        progress(&ProgressEvent::Scanned { root, total: paths.len() });

        self.transition(BatchState::Processing);
        let mut stats = BatchStats::default();
        let mut current_dir: Option<PathBuf> = None;
        for path in &paths {
            let parent = path.parent().map(Path::to_path_buf);
            if parent != current_dir {
                if let Some(dir) = &parent {
                    progress(&ProgressEvent::Directory(dir));
                }
                current_dir = parent;
            }

            let record = self.decoder.decode(path)?;
            let outcome = handler.process(&record)?;
            stats.record(&outcome);
            progress(&ProgressEvent::FileDone { path, outcome: &outcome });
        }

        self.transition(BatchState::Reporting);
        progress(&ProgressEvent::Finished(&stats));

        self.transition(BatchState::Done);
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::tempdir;

    struct EmptyDecoder;

    impl MetadataDecoder for EmptyDecoder {
        fn decode(&self, path: &Path) -> Result<PhotoRecord, AppError> {
            Ok(PhotoRecord::new(path.to_path_buf(), HashMap::new(), Vec::new()))
        }
    }

    /// Replays outcomes in order and remembers which files it saw.
    struct Scripted {
        outcomes: Vec<bool>,
        seen: Vec<String>,
    }

    impl FileHandler for Scripted {
        fn process(&mut self, record: &PhotoRecord) -> Result<Outcome, AppError> {
            self.seen.push(record.file_name());
            let ok = self.outcomes.remove(0);
            Ok(if ok { Outcome::success("Validated") } else { Outcome::failure("Failed") })
        }
    }

    struct Exploding;

    impl FileHandler for Exploding {
        fn process(&mut self, _record: &PhotoRecord) -> Result<Outcome, AppError> {
            Err(AppError::Generic("boom".into()))
        }
    }

    fn jpg_extensions() -> Vec<String> {
        ["jpg", "JPG", "jpeg", "JPEG"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_batch_counts_failures() {
        let dir = tempdir().unwrap();
        for name in ["a.jpg", "b.jpg", "c.jpg", "ignored.png"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let mut handler = Scripted { outcomes: vec![true, false, true], seen: Vec::new() };
        let mut processor = BatchProcessor::new(&EmptyDecoder, jpg_extensions());
        let stats = processor.run(dir.path(), &mut handler, &|_| {}).unwrap();

        assert_eq!(stats, BatchStats { processed: 3, failed: 1 });
        assert_eq!(format!("{:.2}", stats.failure_percentage()), "33.33");
        assert_eq!(handler.seen, vec!["a.jpg", "b.jpg", "c.jpg"]);
        assert_eq!(processor.state(), BatchState::Done);
        assert_eq!(stats.to_string(), "Processed 3 photos of which 1 (33.33%) failed validation");
    }

    #[test]
    fn test_empty_batch_reports_zero_percent() {
        let dir = tempdir().unwrap();
        let mut handler = Scripted { outcomes: vec![], seen: Vec::new() };
        let stats = BatchProcessor::new(&EmptyDecoder, jpg_extensions())
            .run(dir.path(), &mut handler, &|_| {})
            .unwrap();

        assert_eq!(stats.processed, 0);
        assert_eq!(stats.failure_percentage(), 0.0);
    }

    #[test]
    fn test_directory_boundaries_are_reported_once() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("one")).unwrap();
        fs::create_dir_all(dir.path().join("two")).unwrap();
        for name in ["one/a.jpg", "one/b.jpg", "two/c.JPG"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let events = RefCell::new(Vec::new());
        let mut handler = Scripted { outcomes: vec![true, true, true], seen: Vec::new() };
        BatchProcessor::new(&EmptyDecoder, jpg_extensions())
            .run(dir.path(), &mut handler, &|event| {
                let line = match event {
                    ProgressEvent::Scanned { total, .. } => format!("scanned {}", total),
                    ProgressEvent::Directory(d) => format!("dir {}", d.file_name().unwrap().to_string_lossy()),
                    ProgressEvent::FileDone { outcome, .. } => format!("file {}", outcome.status),
                    ProgressEvent::Finished(stats) => format!("done {}", stats.processed),
                };
                events.borrow_mut().push(line);
            })
            .unwrap();

        assert_eq!(
            events.into_inner(),
            vec![
                "scanned 3",
                "dir one",
                "file Validated",
                "file Validated",
                "dir two",
                "file Validated",
                "done 3",
            ]
        );
    }

    #[test]
    fn test_handler_fault_aborts_run() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.jpg"), b"x").unwrap();
        fs::write(dir.path().join("b.jpg"), b"x").unwrap();

        let mut processor = BatchProcessor::new(&EmptyDecoder, jpg_extensions());
        let result = processor.run(dir.path(), &mut Exploding, &|_| {});

        assert!(matches!(result, Err(AppError::Generic(_))));
        assert_eq!(processor.state(), BatchState::Processing);
    }
}
