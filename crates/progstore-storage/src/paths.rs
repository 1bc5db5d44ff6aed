//! Lexical path-safety checks.
//!
//! Every check here is purely lexical and never touches the filesystem,
//! so a rejected name has no side effects.

use std::path::{Component, Path, PathBuf};

use progstore_core::error::AppError;
use progstore_core::result::AppResult;

/// Collapse `.` and `..` components without consulting the filesystem.
///
/// A `..` that would climb above the start of a relative path is kept, so
/// the result still compares unequal to anything under the base.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Join `name` under `root` and require the result to be a strict
/// descendant of `root`.
pub fn resolve_within(root: &Path, name: &str) -> AppResult<PathBuf> {
    let root_norm = normalize(root);
    let candidate = normalize(&root.join(name));

    if candidate != root_norm && candidate.starts_with(&root_norm) {
        Ok(candidate)
    } else {
        Err(AppError::invalid_path(format!(
            "'{name}' resolves outside of {}",
            root.display()
        )))
    }
}

/// Relative, `/`-separated form of `path` under `root`.
pub fn relative_to(root: &Path, path: &Path) -> AppResult<String> {
    let root_norm = normalize(root);
    let path_norm = normalize(path);
    let relative = path_norm.strip_prefix(&root_norm).map_err(|_| {
        AppError::invalid_path(format!(
            "{} is not under {}",
            path.display(),
            root.display()
        ))
    })?;

    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if segments.is_empty() {
        return Err(AppError::invalid_path(format!(
            "{} is the root itself",
            path.display()
        )));
    }
    Ok(segments.join("/"))
}

/// Turn an archive entry name into a safe relative path.
///
/// Backslashes are treated as separators and `.` segments are dropped.
/// Returns `None` for absolute names, names containing `..`, and names
/// that reduce to nothing.
pub fn safe_relative(name: &str) -> Option<PathBuf> {
    if name.contains('\0') {
        return None;
    }
    let unified = name.replace('\\', "/");
    let mut out = PathBuf::new();
    for component in Path::new(&unified).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}
