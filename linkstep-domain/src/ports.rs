use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use tracing::{debug, warn};

/// Supplies the raw file names that become build targets.
pub trait TargetSource {
    fn list_names(&self) -> anyhow::Result<Vec<String>>;
}

/// Lists the entries of a directory (typically `src/bin`).
///
/// Hidden entries (leading `.`) are skipped since they would strip to an empty name.
#[derive(Debug, Clone)]
pub struct FsTargetSource {
    dir: Utf8PathBuf,
}

impl FsTargetSource {
    pub fn new(dir: Utf8PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }
}

impl TargetSource for FsTargetSource {
    fn list_names(&self) -> anyhow::Result<Vec<String>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.dir).with_context(|| format!("read dir {}", self.dir))? {
            let entry = entry.with_context(|| format!("read entry in {}", self.dir))?;
            let Ok(name) = entry.file_name().into_string() else {
                warn!(dir = self.dir.as_str(), "skipping non-UTF-8 file name");
                continue;
            };
            if name.starts_with('.') {
                debug!(name = name.as_str(), "skipping hidden entry");
                continue;
            }
            out.push(name);
        }
        Ok(out)
    }
}

/// Fixed listing for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTargetSource {
    names: Vec<String>,
}

impl InMemoryTargetSource {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }
}

impl TargetSource for InMemoryTargetSource {
    fn list_names(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.names.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn fs_source_lists_files_and_skips_hidden() {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        fs::write(root.join("01hello.rs"), "").expect("write");
        fs::write(root.join("00world.rs"), "").expect("write");
        fs::write(root.join(".gitkeep"), "").expect("write");

        let mut names = FsTargetSource::new(root).list_names().expect("list");
        names.sort();
        assert_eq!(names, vec!["00world.rs".to_string(), "01hello.rs".to_string()]);
    }

    #[test]
    fn fs_source_errors_on_missing_dir() {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().join("nope")).expect("utf8");
        let err = FsTargetSource::new(root).list_names().unwrap_err();
        assert!(format!("{err:#}").contains("read dir"));
    }
}
