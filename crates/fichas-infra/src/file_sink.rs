//! Archive sink writing to the file system

use std::path::{Path, PathBuf};

use fichas_domain::repository::ArchiveSink;
use fichas_types::Error;

/// Writes the delivered archive into `dir`, or to an explicit path
#[derive(Debug, Clone)]
pub struct FileArchiveSink {
    dir: PathBuf,
    file_name: Option<String>,
    written: Option<PathBuf>,
}

impl FileArchiveSink {
    /// Keep the name given on delivery, inside `dir`
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            file_name: None,
            written: None,
        }
    }

    /// Ignore the delivered name and write exactly to `path`
    pub fn at_path(path: &Path) -> Self {
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            dir,
            file_name: path.file_name().map(|n| n.to_string_lossy().into_owned()),
            written: None,
        }
    }

    /// Path of the last written archive
    pub fn written(&self) -> Option<&Path> {
        self.written.as_deref()
    }
}

impl ArchiveSink for FileArchiveSink {
    fn deliver(&mut self, name: &str, bytes: &[u8]) -> Result<(), Error> {
        let file_name = self.file_name.as_deref().unwrap_or(name);
        if !self.dir.as_os_str().is_empty() {
            std::fs::create_dir_all(&self.dir)?;
        }
        let path = self.dir.join(file_name);
        std::fs::write(&path, bytes)?;
        tracing::debug!(path = %path.display(), size = bytes.len(), "archive written");
        self.written = Some(path);
        Ok(())
    }
}
