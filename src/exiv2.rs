use crate::decoder::KeywordReader;
use crate::error::AppError;
use crate::mutation::{MetadataWriter, MutationOp};
use std::ffi::OsString;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

pub const KEYWORDS_TAG: &str = "Iptc.Application2.Keywords";

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// The exiv2 command line tool, one process per operation.
pub struct Exiv2 {
    binary: String,
    timeout: Option<Duration>,
}

impl Exiv2 {
    pub fn new(binary: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self { binary: binary.into(), timeout }
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus, AppError> {
        let limit = match self.timeout {
            Some(limit) => limit,
            None => return Ok(child.wait()?),
        };
        let deadline = Instant::now() + limit;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                child.kill()?;
                child.wait()?;
                return Err(AppError::Writer(format!(
                    "{} did not finish within {}s",
                    self.binary,
                    limit.as_secs_f64()
                )));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Arguments for one modify command. Values are passed as a single argument,
/// never through a shell.
pub fn modify_args(op: &MutationOp, path: &Path) -> Vec<OsString> {
    let command = match op {
        MutationOp::Set { tag, value } => format!("set {} Ascii {}", tag, value),
        MutationOp::Add { tag, value } => format!("add {} String {}", tag, value),
        MutationOp::Delete { tag } => format!("del {}", tag),
    };
    vec!["-q".into(), "-M".into(), command.into(), path.as_os_str().to_os_string()]
}

pub fn keyword_args(path: &Path) -> Vec<OsString> {
    vec![
        "-q".into(),
        "-P".into(),
        "v".into(),
        "-K".into(),
        KEYWORDS_TAG.into(),
        path.as_os_str().to_os_string(),
    ]
}

pub fn parse_keywords(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

impl MetadataWriter for Exiv2 {
    fn apply(&self, path: &Path, op: &MutationOp) -> Result<(), AppError> {
        let args = modify_args(op, path);
        log::debug!("Running {} {:?}", self.binary, args);

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|e| AppError::Writer(format!("could not start {}: {}", self.binary, e)))?;

        let status = self.wait(&mut child)?;
        if !status.success() {
            return Err(AppError::Writer(format!("{} exited with {}", self.binary, status)));
        }
        Ok(())
    }
}

impl KeywordReader for Exiv2 {
    fn read_keywords(&self, path: &Path) -> Result<Vec<String>, AppError> {
        let output = Command::new(&self.binary)
            .args(keyword_args(path))
            .stdin(Stdio::null())
            .output()?;

        if !output.status.success() {
            log::debug!("No IPTC keywords in {:?} ({})", path, output.status);
            return Ok(Vec::new());
        }
        Ok(parse_keywords(&String::from_utf8_lossy(&output.stdout)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_modify_args_keep_value_in_one_argument() {
        let op = MutationOp::Set {
            tag: "Exif.Image.Copyright".into(),
            value: "Jane \"$(rm -rf)\" Doe".into(),
        };
        let args = strings(modify_args(&op, Path::new("/photos/my file.jpg")));
        assert_eq!(
            args,
            vec![
                "-q",
                "-M",
                "set Exif.Image.Copyright Ascii Jane \"$(rm -rf)\" Doe",
                "/photos/my file.jpg"
            ]
        );
    }

    #[test]
    fn test_modify_args_for_add_and_delete() {
        let add = MutationOp::Add { tag: KEYWORDS_TAG.into(), value: "beach".into() };
        assert_eq!(
            strings(modify_args(&add, Path::new("a.jpg")))[2],
            "add Iptc.Application2.Keywords String beach"
        );

        let del = MutationOp::Delete { tag: "Exif.Photo.OffsetTime".into() };
        assert_eq!(strings(modify_args(&del, Path::new("a.jpg")))[2], "del Exif.Photo.OffsetTime");
    }

    #[test]
    fn test_parse_keywords() {
        assert_eq!(parse_keywords("beach\n sunset \n\n"), vec!["beach", "sunset"]);
        assert!(parse_keywords("").is_empty());
    }

    #[test]
    fn test_value_starting_with_a_type_name_keeps_it() {
        let op = MutationOp::Set { tag: "Exif.Image.DocumentName".into(), value: "Date night".into() };
        assert_eq!(
            strings(modify_args(&op, Path::new("a.jpg")))[2],
            "set Exif.Image.DocumentName Ascii Date night"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_hung_writer_is_killed_at_deadline() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("slow-exiv2");
        fs::write(&script, "#!/bin/sh\nexec sleep 30\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let exiv2 = Exiv2::new(script.to_string_lossy(), Some(Duration::from_millis(200)));
        let op = MutationOp::Delete { tag: "Exif.Photo.OffsetTime".into() };
        let started = Instant::now();
        let result = exiv2.apply(Path::new("a.jpg"), &op);

        assert!(started.elapsed() < Duration::from_secs(10));
        match result {
            Err(AppError::Writer(message)) => assert!(message.contains("did not finish"), "{}", message),
            other => panic!("expected a timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_binary_is_a_write_failure() {
        let exiv2 = Exiv2::new("definitely-not-an-exiv2-binary", None);
        let op = MutationOp::Delete { tag: "Exif.Photo.OffsetTime".into() };
        assert!(matches!(exiv2.apply(Path::new("a.jpg"), &op), Err(AppError::Writer(_))));
    }
}
