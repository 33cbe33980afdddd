use crate::scan::*;

/// The last component of a path, as a string.
pub fn simplify_file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// The sub-directories of a directory, sorted by name.
pub fn list_subdirectories(root: &Path) -> ScanResult<Vec<PathBuf>> {
    let path = root.display().to_string();
    let mut dirs: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(root).context(ReadingDirectorySnafu { path: path.clone() })? {
        let entry = entry.context(ReadingDirectorySnafu { path: path.clone() })?;
        let p = entry.path();
        if p.is_dir() {
            dirs.push(p);
        }
    }
    dirs.sort();
    debug!("list_subdirectories: {:?}: {} folders", root, dirs.len());
    Ok(dirs)
}

/// The client id written in an id file: its first word.
pub fn first_token(contents: &str) -> Option<&str> {
    contents.split_whitespace().next()
}
