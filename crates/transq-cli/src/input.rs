use crate::error::CliError;
use std::path::Path;

/// Reads `path` and returns its trimmed, non-blank lines in file order.
pub async fn read_source_lines(path: &Path) -> Result<Vec<String>, CliError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CliError::ReadInput {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let lines = source_lines(&contents);
    if lines.is_empty() {
        return Err(CliError::NoLines {
            path: path.to_path_buf(),
        });
    }
    Ok(lines)
}

fn source_lines(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect()
}
