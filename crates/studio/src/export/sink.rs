//! Delivery of finished artifacts.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::Artifact;
use crate::errors::StudioError;

/// Receives finished artifacts; returns where the artifact went, if anywhere
pub trait ArtifactSink {
    fn deliver(&mut self, artifact: &Artifact) -> Result<Option<PathBuf>, StudioError>;
}

/// Writes each artifact under its file name into a directory
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Creates the directory when it does not exist yet
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StudioError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }
}

impl ArtifactSink for DirectorySink {
    fn deliver(&mut self, artifact: &Artifact) -> Result<Option<PathBuf>, StudioError> {
        let path = self.dir.join(&artifact.file_name);
        std::fs::write(&path, &artifact.bytes)?;
        debug!(path = %path.display(), "artifact written");
        Ok(Some(path))
    }
}

/// Keeps artifacts in memory; clones share the same list
#[derive(Clone, Default)]
pub struct MemorySink {
    artifacts: Arc<Mutex<Vec<Artifact>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn artifacts(&self) -> Vec<Artifact> {
        self.artifacts
            .lock()
            .map(|list| list.clone())
            .unwrap_or_default()
    }
}

impl ArtifactSink for MemorySink {
    fn deliver(&mut self, artifact: &Artifact) -> Result<Option<PathBuf>, StudioError> {
        let mut list = self
            .artifacts
            .lock()
            .map_err(|_| StudioError::ExportFailure("artifact list poisoned".to_string()))?;
        list.push(artifact.clone());
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ExportKind;

    fn artifact() -> Artifact {
        Artifact {
            kind: ExportKind::Asset,
            file_name: "svg-model.gltf".to_string(),
            media_type: "model/gltf+json".to_string(),
            bytes: b"{}".to_vec(),
            clip: None,
        }
    }

    #[test]
    fn test_directory_sink_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path().join("out")).unwrap();
        let path = sink.deliver(&artifact()).unwrap().unwrap();
        assert_eq!(path.file_name().unwrap(), "svg-model.gltf");
        assert_eq!(std::fs::read(path).unwrap(), b"{}");
    }

    #[test]
    fn test_memory_sink_shared_between_clones() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        assert!(writer.deliver(&artifact()).unwrap().is_none());
        assert_eq!(sink.artifacts().len(), 1);
    }
}
