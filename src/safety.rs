//! Safety utilities to prevent accidental file deletion.
//!
//! A run overwrites its JSON outputs and may wipe the target directory. These
//! checks refuse configurations where that would destroy an input.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{InputError, InputResult};

/// Best-effort absolute form of a path that may not exist yet.
fn resolve(path: &Path) -> PathBuf {
    if let Ok(canonical) = fs::canonicalize(path) {
        return canonical;
    }
    if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
        if !parent.as_os_str().is_empty() {
            return resolve(parent).join(name);
        }
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Validates that an output path is safe to overwrite.
///
/// The output cannot be the same file as any of `input_paths`.
pub fn validate_output_path(output: &Path, input_paths: &[&Path]) -> InputResult<()> {
    let resolved = resolve(output);
    for input in input_paths {
        if output == *input || resolved == resolve(input) {
            return Err(InputError::Config(format!(
                "Safety check failed: output '{}' cannot be the same as input '{}'",
                output.display(),
                input.display()
            )));
        }
    }
    Ok(())
}

/// Validates that no two outputs are the same file.
pub fn validate_distinct_outputs(outputs: &[&Path]) -> InputResult<()> {
    let resolved: Vec<PathBuf> = outputs.iter().map(|p| resolve(p)).collect();
    for (i, path) in resolved.iter().enumerate() {
        if let Some(j) = resolved[..i].iter().position(|earlier| earlier == path) {
            return Err(InputError::Config(format!(
                "Safety check failed: outputs '{}' and '{}' are the same file",
                outputs[j].display(),
                outputs[i].display()
            )));
        }
    }
    Ok(())
}

/// Validates that copies into `target` can never land in `source`, and that
/// the target never holds the source.
pub fn validate_target_dir(target: &Path, source: &Path) -> InputResult<()> {
    let target_resolved = resolve(target);
    let source_resolved = resolve(source);
    if target_resolved.starts_with(&source_resolved) {
        return Err(InputError::Config(format!(
            "Safety check failed: target '{}' is inside source directory '{}'",
            target.display(),
            source.display()
        )));
    }
    if source_resolved.starts_with(&target_resolved) {
        return Err(InputError::Config(format!(
            "Safety check failed: source directory '{}' is inside target '{}'",
            source.display(),
            target.display()
        )));
    }
    Ok(())
}

/// Validates that wiping `target` cannot delete any of `input_paths`.
pub fn validate_clean_target(target: &Path, input_paths: &[&Path]) -> InputResult<()> {
    let target_resolved = resolve(target);
    for input in input_paths {
        if resolve(input).starts_with(&target_resolved) {
            return Err(InputError::Config(format!(
                "Safety check failed: cleaning target '{}' would delete input '{}'",
                target.display(),
                input.display()
            )));
        }
    }
    Ok(())
}

/// Create the target directory, emptying it first when `clean` is set.
pub fn prepare_target_dir(target: &Path, clean: bool) -> InputResult<()> {
    let write_error = |source: std::io::Error| InputError::Write {
        path: target.to_path_buf(),
        source,
    };
    if clean && target.exists() {
        info!("Removing existing target {}", target.display());
        fs::remove_dir_all(target).map_err(write_error)?;
    }
    fs::create_dir_all(target).map_err(write_error)
}
