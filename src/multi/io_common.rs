use std::path::{Path, PathBuf};

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// The path of a data file, relative to the directory of the configuration.
pub fn data_path(root: &Path, file_path: &str) -> String {
    let p: PathBuf = [root, Path::new(file_path)].iter().collect();
    p.as_path().display().to_string()
}

/// The selections of a vote: trailing blank cells are dropped, so that a row
/// ending with a single empty cell is an undervote.
pub fn assemble_selections(cells: &[String]) -> Vec<String> {
    let len = cells
        .iter()
        .rposition(|s| !s.is_empty())
        .map(|idx| idx + 1)
        .unwrap_or(0);
    cells[..len].to_vec()
}
