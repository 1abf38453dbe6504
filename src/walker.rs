use crate::error::AppError;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// All files under `root` whose extension is one of `allowed_extensions`
/// (compared case-sensitively), sorted by path.
pub fn discover(root: &Path, allowed_extensions: &[String]) -> Result<Vec<PathBuf>, AppError> {
    log::debug!("Starting file discovery in {:?}", root);
    log::debug!("Configured allowed extensions: {:?}", allowed_extensions);

    if !root.exists() {
        return Err(AppError::Generic(format!("{} does not exist", root.display())));
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_map(|e| match e {
        Ok(entry) => Some(entry),
        Err(err) => {
            log::warn!("Skipping unreadable entry: {}", err);
            None
        }
    }) {
        if !entry.file_type().is_file() {
            log::trace!("Skipping non-file entry: {:?}", entry.path());
            continue;
        }
        let path = entry.path();
        match path.extension().and_then(|s| s.to_str()) {
            Some(ext) if allowed_extensions.iter().any(|allowed| allowed == ext) => {
                log::trace!("Discovered photo: {:?}", path);
                paths.push(path.to_path_buf());
            }
            Some(_) => log::trace!("Skipping file due to unsupported extension: {:?}", path),
            None => log::trace!("Skipping file with no extension: {:?}", path),
        }
    }

    paths.sort();
    log::debug!("File discovery complete, {} files found.", paths.len());
    Ok(paths)
}
