//! Source collection: which files of a checkout the model gets to review.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{io_err, SiteError};

/// Extensions eligible for review.
pub const ALLOWED_EXTENSIONS: &[&str] = &["tsx", "ts", "jsx", "js", "css", "html", "json", "md"];

/// A file with any path segment in this set is skipped.
pub const SKIP_DIRS: &[&str] = &["node_modules", ".git", "dist", "build", ".next", ".cache"];

/// Files larger than this many bytes are skipped.
pub const MAX_FILE_BYTES: u64 = 50_000;

/// Relative `/`-separated path → full text content.
pub type CollectedFiles = BTreeMap<String, String>;

/// Walk `root` and return every eligible text file.
///
/// Unreadable and non-UTF-8 files are skipped. A symlinked file is collected
/// only when its target resolves inside `root`; symlinked directories are
/// never descended. Only a failure to list `root` itself is an error.
pub fn collect_sources(root: &Path) -> Result<CollectedFiles, SiteError> {
    let mut files = CollectedFiles::new();
    std::fs::read_dir(root).map_err(|e| io_err(root, e))?;
    let canonical_root = root.canonicalize().map_err(|e| io_err(root, e))?;
    walk(root, &canonical_root, root, &mut files);
    Ok(files)
}

fn walk(root: &Path, canonical_root: &Path, dir: &Path, out: &mut CollectedFiles) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("skipping unreadable directory {}: {e}", dir.display());
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let name = entry.file_name();
        let name = name.to_string_lossy();

        if file_type.is_dir() {
            if !SKIP_DIRS.contains(&name.as_ref()) {
                walk(root, canonical_root, &path, out);
            }
            continue;
        }
        if !is_allowed(&path) {
            continue;
        }
        if file_type.is_symlink() {
            if !links_inside(canonical_root, &path) {
                tracing::debug!("skipping symlink leaving the workspace: {}", path.display());
                continue;
            }
        } else if !file_type.is_file() {
            continue;
        }

        match std::fs::metadata(&path) {
            Ok(meta) if !meta.is_file() => continue,
            Ok(meta) if meta.len() > MAX_FILE_BYTES => continue,
            Ok(_) => {}
            Err(_) => continue,
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => {
                out.insert(relative_key(root, &path), content);
            }
            Err(e) => tracing::debug!("skipping {}: {e}", path.display()),
        }
    }
}

fn links_inside(canonical_root: &Path, link: &Path) -> bool {
    link.canonicalize()
        .is_ok_and(|target| target.starts_with(canonical_root))
}

fn is_allowed(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext))
}

fn relative_key(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: impl AsRef<[u8]>) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[rstest]
    #[case("src/App.tsx", true)]
    #[case("src/util.ts", true)]
    #[case("index.html", true)]
    #[case("styles/main.css", true)]
    #[case("package.json", true)]
    #[case("README.md", true)]
    #[case("legacy/app.jsx", true)]
    #[case("public/logo.svg", false)]
    #[case("Cargo.toml", false)]
    #[case("Makefile", false)]
    #[case("node_modules/react/index.js", false)]
    #[case("packages/ui/node_modules/x/index.js", false)]
    #[case(".git/config.json", false)]
    #[case("dist/bundle.js", false)]
    #[case("build/index.html", false)]
    #[case(".next/server.js", false)]
    #[case(".cache/data.json", false)]
    fn eligibility(#[case] rel: &str, #[case] included: bool) {
        let dir = TempDir::new().unwrap();
        write(dir.path(), rel, "content");
        let files = collect_sources(dir.path()).unwrap();
        assert_eq!(files.contains_key(rel), included, "{rel}");
    }

    #[test]
    fn size_ceiling_is_inclusive() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "at_limit.js", "a".repeat(MAX_FILE_BYTES as usize));
        write(dir.path(), "over_limit.js", "a".repeat(MAX_FILE_BYTES as usize + 1));
        let files = collect_sources(dir.path()).unwrap();
        assert!(files.contains_key("at_limit.js"));
        assert!(!files.contains_key("over_limit.js"));
    }

    #[test]
    fn non_utf8_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "bad.json", [0xff, 0xfe, 0x00, 0x80]);
        write(dir.path(), "good.json", "{}");
        let files = collect_sources(dir.path()).unwrap();
        assert_eq!(files.keys().collect::<Vec<_>>(), ["good.json"]);
    }

    #[test]
    fn keys_are_slash_separated_and_content_verbatim() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/components/Footer.tsx", "export {}\r\n");
        let files = collect_sources(dir.path()).unwrap();
        assert_eq!(files["src/components/Footer.tsx"], "export {}\r\n");
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = collect_sources(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, SiteError::Io { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_leaving_the_workspace_are_skipped() {
        let dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        write(outside.path(), "secret.md", "outside");
        std::os::unix::fs::symlink(outside.path(), dir.path().join("linked")).unwrap();
        std::os::unix::fs::symlink(outside.path().join("secret.md"), dir.path().join("alias.md"))
            .unwrap();
        let files = collect_sources(dir.path()).unwrap();
        assert!(files.is_empty(), "{files:?}");
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_file_inside_the_workspace_is_collected() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "docs/guide.md", "# Guide");
        std::os::unix::fs::symlink(dir.path().join("docs/guide.md"), dir.path().join("README.md"))
            .unwrap();
        std::os::unix::fs::symlink(dir.path().join("docs"), dir.path().join("docs-link")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("missing.md"), dir.path().join("dangling.md"))
            .unwrap();

        let files = collect_sources(dir.path()).unwrap();
        assert_eq!(files.keys().collect::<Vec<_>>(), ["README.md", "docs/guide.md"]);
        assert_eq!(files["README.md"], "# Guide");
    }
}
