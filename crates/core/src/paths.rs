//! Filesystem containment for served assets.
//!
//! Every file that reaches the network goes through [`AllowedRoots::resolve`]:
//! the requested path is canonicalized (collapsing `..`, symlinks, and
//! relative segments) and accepted only if the result is equal to, or a
//! descendant of, one of the configured roots. This is the sole defense
//! between the browser and the local filesystem -- the server streams
//! whatever bytes a resolved path contains.

use std::path::{Path, PathBuf};

use crate::error::CoreError;

/// The allow-list of directories assets may be served from.
#[derive(Debug, Clone)]
pub struct AllowedRoots {
    roots: Vec<PathBuf>,
}

impl AllowedRoots {
    /// Canonicalize and validate the given roots.
    ///
    /// Fails if any root does not exist or is not a directory, so a
    /// misconfigured allow-list aborts startup instead of silently serving
    /// nothing.
    pub fn new<I, P>(roots: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut canonical = Vec::new();
        for root in roots {
            let root = root.as_ref();
            let resolved = std::fs::canonicalize(root).map_err(|err| {
                CoreError::Validation(format!(
                    "allowed root {} is not usable: {err}",
                    root.display()
                ))
            })?;
            if !resolved.is_dir() {
                return Err(CoreError::Validation(format!(
                    "allowed root {} is not a directory",
                    root.display()
                )));
            }
            canonical.push(resolved);
        }
        if canonical.is_empty() {
            return Err(CoreError::Validation(
                "at least one allowed root is required".into(),
            ));
        }
        Ok(Self { roots: canonical })
    }

    /// Resolve a requested path against the allow-list.
    ///
    /// Returns the canonical path if it lies under an allowed root, and
    /// [`CoreError::PathNotAllowed`] for everything else: empty paths, NUL
    /// bytes, paths that fail to canonicalize, and paths whose canonical
    /// form escapes every root (via `..` or symlinks).
    pub fn resolve(&self, requested: &str) -> Result<PathBuf, CoreError> {
        if requested.is_empty() || requested.contains('\0') {
            tracing::warn!("rejected empty or NUL-containing asset path");
            return Err(CoreError::PathNotAllowed);
        }

        let canonical = match std::fs::canonicalize(requested) {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!(path = %requested, %err, "asset path failed to canonicalize");
                return Err(CoreError::PathNotAllowed);
            }
        };

        if self.roots.iter().any(|root| canonical.starts_with(root)) {
            Ok(canonical)
        } else {
            tracing::warn!(path = %canonical.display(), "asset path escapes all allowed roots");
            Err(CoreError::PathNotAllowed)
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn roots_for(dir: &Path) -> AllowedRoots {
        AllowedRoots::new([dir]).unwrap()
    }

    #[test]
    fn accepts_file_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("video.mp4");
        std::fs::write(&file, b"x").unwrap();

        let roots = roots_for(dir.path());
        let resolved = roots.resolve(file.to_str().unwrap()).unwrap();
        assert!(resolved.starts_with(std::fs::canonicalize(dir.path()).unwrap()));
    }

    #[test]
    fn accepts_root_itself() {
        let dir = tempfile::tempdir().unwrap();
        let roots = roots_for(dir.path());
        assert!(roots.resolve(dir.path().to_str().unwrap()).is_ok());
    }

    #[test]
    fn rejects_file_outside_root() {
        let dir = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let file = other.path().join("secret.txt");
        std::fs::write(&file, b"x").unwrap();

        let roots = roots_for(dir.path());
        assert_matches!(
            roots.resolve(file.to_str().unwrap()),
            Err(CoreError::PathNotAllowed)
        );
    }

    #[test]
    fn rejects_dot_dot_escape() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        let secret = dir.path().join("secret.txt");
        std::fs::write(&secret, b"x").unwrap();

        // Only the subdirectory is allowed; `sub/../secret.txt` resolves to
        // its parent and must be rejected.
        let roots = roots_for(&sub);
        let sneaky = format!("{}/../secret.txt", sub.display());
        assert_matches!(roots.resolve(&sneaky), Err(CoreError::PathNotAllowed));
    }

    #[cfg(unix)]
    #[test]
    fn rejects_symlink_escape() {
        let dir = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let secret = other.path().join("secret.txt");
        std::fs::write(&secret, b"x").unwrap();

        let link = dir.path().join("link.txt");
        std::os::unix::fs::symlink(&secret, &link).unwrap();

        let roots = roots_for(dir.path());
        assert_matches!(
            roots.resolve(link.to_str().unwrap()),
            Err(CoreError::PathNotAllowed)
        );
    }

    #[test]
    fn rejects_empty_and_nul_paths() {
        let dir = tempfile::tempdir().unwrap();
        let roots = roots_for(dir.path());
        assert_matches!(roots.resolve(""), Err(CoreError::PathNotAllowed));
        assert_matches!(roots.resolve("a\0b"), Err(CoreError::PathNotAllowed));
    }

    #[test]
    fn rejects_nonexistent_path() {
        let dir = tempfile::tempdir().unwrap();
        let roots = roots_for(dir.path());
        let missing = dir.path().join("missing.mp4");
        assert_matches!(
            roots.resolve(missing.to_str().unwrap()),
            Err(CoreError::PathNotAllowed)
        );
    }

    #[test]
    fn missing_root_fails_construction() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("not-there");
        assert_matches!(
            AllowedRoots::new([&missing]),
            Err(CoreError::Validation(_))
        );
    }
}
