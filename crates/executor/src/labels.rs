use crate::error::ExecutorError;
use std::path::Path;

/// Load the label list, one label per line, index-aligned with the model's
/// output channels.
///
/// Missing or empty files are fatal: proceeding without labels would
/// misalign every result, so initialization must abort instead.
pub fn load_labels(path: &Path) -> Result<Vec<String>, ExecutorError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ExecutorError::AssetLoad {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let labels: Vec<String> = contents.lines().map(str::to_owned).collect();

    if labels.is_empty() {
        return Err(ExecutorError::AssetLoad {
            path: path.display().to_string(),
            reason: "label file is empty".to_string(),
        });
    }

    tracing::info!(path = %path.display(), count = labels.len(), "Labels loaded");

    Ok(labels)
}
