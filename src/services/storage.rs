use std::path::{Path, PathBuf};
use uuid::Uuid;

const TEMP: &str = "temp";
const UPLOADS: &str = "uploads";
const OUTPUTS: &str = "outputs";

/// Local working directories under the configured data root.
///
/// `uploads/<job>` holds the downloaded source, `temp/<job>` subtitles and
/// the parsed transcript, `outputs/<job>` the rendered shorts and thumbnails.
#[derive(Debug, Clone)]
pub struct DataDirs {
    root: PathBuf,
}

impl DataDirs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn top_level(&self) -> [PathBuf; 3] {
        [self.root.join(TEMP), self.root.join(UPLOADS), self.root.join(OUTPUTS)]
    }

    /// Create the three working directories if missing.
    pub async fn ensure(&self) -> Result<(), StorageError> {
        for dir in self.top_level() {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|source| StorageError::Io { path: dir.clone(), source })?;
        }
        Ok(())
    }

    pub fn temp_dir(&self, job_id: Uuid) -> PathBuf {
        self.root.join(TEMP).join(job_id.to_string())
    }

    pub fn upload_dir(&self, job_id: Uuid) -> PathBuf {
        self.root.join(UPLOADS).join(job_id.to_string())
    }

    pub fn output_dir(&self, job_id: Uuid) -> PathBuf {
        self.root.join(OUTPUTS).join(job_id.to_string())
    }

    /// True when `path` lies inside the outputs directory. Guards file downloads.
    pub fn is_output_file(&self, path: &Path) -> bool {
        let outputs = self.root.join(OUTPUTS);
        match (path.canonicalize(), outputs.canonicalize()) {
            (Ok(file), Ok(dir)) => file.starts_with(dir),
            _ => false,
        }
    }

    /// Remove every file belonging to one job.
    pub async fn remove_job_files(&self, job_id: Uuid) -> Result<(), StorageError> {
        for dir in [self.temp_dir(job_id), self.upload_dir(job_id), self.output_dir(job_id)] {
            remove_dir_if_exists(&dir).await?;
        }
        Ok(())
    }

    /// Empty all working directories, leaving them in place.
    pub async fn wipe(&self) -> Result<(), StorageError> {
        for dir in self.top_level() {
            remove_dir_if_exists(&dir).await?;
        }
        self.ensure().await
    }
}

async fn remove_dir_if_exists(dir: &Path) -> Result<(), StorageError> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(StorageError::Io { path: dir.to_path_buf(), source }),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("filesystem error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
