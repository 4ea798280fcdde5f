/// Path containment check for filesystem lookups driven by request data.
///
/// This is the authoritative boundary check. `input_sanitizer::sanitize_path`
/// is only a pre-filter and must not be relied on instead of this.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::AppError;

/// Resolves `candidate` against `base_dir` and returns the absolute path when it
/// stays strictly below the base directory.
///
/// Returns `None` for `..` escapes, absolute overrides, NUL bytes, the base
/// directory itself, and existing symlinks whose real target leaves the base.
pub fn validate_path(candidate: &str, base_dir: impl AsRef<Path>) -> Option<PathBuf> {
    if candidate.contains('\0') {
        return None;
    }

    let base = absolutize(base_dir.as_ref())?;
    let candidate = candidate.replace('\\', "/");
    let resolved = normalize(&base.join(candidate));

    if resolved == base || !resolved.starts_with(&base) {
        return None;
    }

    if escapes_via_symlink(&base, &resolved) {
        return None;
    }

    Some(resolved)
}

/// Fail-closed variant for handlers: rejection becomes `PATH_TRAVERSAL_DETECTED`
pub fn require_contained(candidate: &str, base_dir: impl AsRef<Path>) -> Result<PathBuf, AppError> {
    validate_path(candidate, base_dir).ok_or(AppError::PathTraversalDetected)
}

fn absolutize(path: &Path) -> Option<PathBuf> {
    if path.is_absolute() {
        Some(normalize(path))
    } else {
        let cwd = std::env::current_dir().ok()?;
        Some(normalize(&cwd.join(path)))
    }
}

/// Lexical normalization; does not touch the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

// Checks the deepest existing ancestor of `resolved`; a missing base means nothing to follow
fn escapes_via_symlink(base: &Path, resolved: &Path) -> bool {
    let real_base = match fs::canonicalize(base) {
        Ok(p) => p,
        Err(_) => return false,
    };

    for ancestor in resolved.ancestors() {
        if !ancestor.starts_with(base) {
            break;
        }
        if let Ok(real) = fs::canonicalize(ancestor) {
            return !real.starts_with(&real_base);
        }
    }

    false
}
