//! Recursive file enumeration.

use std::path::{Path, PathBuf};

use itertools::Itertools as _;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::relative_path;

/// A path is excluded when its string form contains any pattern as a
/// substring. `build` therefore also excludes `builder.sh`.
pub fn is_excluded<S: AsRef<str>>(path: &Path, exclude: &[S]) -> bool {
    let path = path.to_string_lossy();
    exclude
        .iter()
        .any(|pattern| path.contains(pattern.as_ref()))
}

/// Lists every file below `roots` (relative to `base`), depth first, in
/// directory iteration order. Exclusion patterns see the path relative to
/// `base`, so the location of the checkout never matters. Excluded
/// directories are not descended. Missing roots contribute nothing. Paths
/// reached through more than one root are reported once.
pub fn walk<P: AsRef<Path>, S: AsRef<str>>(
    base: &Path,
    roots: &[P],
    exclude: &[S],
) -> Vec<PathBuf> {
    roots
        .iter()
        .flat_map(|root| walk_root(base, &base.join(root.as_ref()), exclude))
        .unique()
        .collect()
}

fn walk_root<S: AsRef<str>>(base: &Path, root: &Path, exclude: &[S]) -> Vec<PathBuf> {
    if !root.exists() {
        debug!(root = %root.display(), "root does not exist");
        return Vec::new();
    }
    WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| !is_excluded(&relative_path(entry.path(), base), exclude))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(error) => {
                warn!(%error, "failed to read directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn exclusion_is_a_plain_substring_match() {
        let exclude = ["build"];
        for path in [
            "build/out.js",
            "src/build/x.ts",
            "my-build-tool.sh",
            "builder.sh",
        ] {
            assert!(is_excluded(Path::new(path), &exclude), "{path}");
        }
        assert!(!is_excluded(Path::new("src/main.rs"), &exclude));
    }

    #[test]
    fn walks_roots_and_skips_excluded() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/nested")).unwrap();
        fs::create_dir_all(root.join("target/debug")).unwrap();
        fs::write(root.join("README.md"), "# hi\n").unwrap();
        fs::write(root.join("src/lib.rs"), "").unwrap();
        fs::write(root.join("src/nested/mod.rs"), "").unwrap();
        fs::write(root.join("target/debug/app"), "").unwrap();

        let mut files = walk(root, &["."], &["target"]);
        files.sort();
        assert_eq!(
            files,
            vec![
                root.join("README.md"),
                root.join("src/lib.rs"),
                root.join("src/nested/mod.rs"),
            ]
        );
    }

    #[test]
    fn overlapping_roots_are_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("docs")).unwrap();
        fs::write(root.join("docs/a.md"), "").unwrap();

        let files = walk(root, &["docs", "docs"], &[] as &[&str]);
        assert_eq!(files, vec![root.join("docs").join("a.md")]);
    }

    #[test]
    fn missing_root_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let files = walk(dir.path(), &["nope"], &[] as &[&str]);
        assert!(files.is_empty());
    }

    #[test]
    fn base_directory_name_is_not_matched() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("build-agent/repo");
        fs::create_dir_all(base.join("docs")).unwrap();
        fs::write(base.join("docs/a.md"), "").unwrap();
        fs::write(base.join("builder.sh"), "").unwrap();

        let files = walk(&base, &["."], &["build"]);
        assert_eq!(
            files
                .iter()
                .map(|file| relative_path(file, &base))
                .collect::<Vec<_>>(),
            vec![PathBuf::from("docs/a.md")]
        );
    }
}
