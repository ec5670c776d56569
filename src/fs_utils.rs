use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::PrepError;

/// How `ensure_dir` treats a directory that is already present.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DirPolicy {
    /// Refuse to reuse an existing directory; stale output must be removed first.
    Fresh,
    KeepExisting,
}

pub fn ensure_dir(path: &Path, policy: DirPolicy) -> Result<(), PrepError> {
    if path.is_dir() {
        return match policy {
            DirPolicy::KeepExisting => Ok(()),
            DirPolicy::Fresh => Err(PrepError::DirectoryExists {
                path: path.to_path_buf(),
            }),
        };
    }
    fs::create_dir_all(path)?;
    Ok(())
}

/// Remove a directory tree. A missing directory is not an error.
pub fn remove_tree(path: &Path) -> Result<(), PrepError> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn fresh_policy_rejects_existing_directory() {
        let root = tempdir().expect("tmpdir");
        let target = root.path().join("imagesTr");

        ensure_dir(&target, DirPolicy::Fresh).expect("first create");
        assert!(target.is_dir());
        assert!(matches!(
            ensure_dir(&target, DirPolicy::Fresh),
            Err(PrepError::DirectoryExists { .. })
        ));
        ensure_dir(&target, DirPolicy::KeepExisting).expect("keep existing");
    }

    #[test]
    fn remove_tree_tolerates_missing_paths() {
        let root = tempdir().expect("tmpdir");
        let nested = root.path().join("a/b");
        fs::create_dir_all(&nested).expect("nested");
        fs::write(nested.join("x.dcm"), b"x").expect("file");

        remove_tree(&root.path().join("a")).expect("remove");
        assert!(!root.path().join("a").exists());
        remove_tree(&root.path().join("a")).expect("second remove");
    }
}
