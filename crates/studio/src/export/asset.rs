use std::thread;

use crossbeam_channel::{bounded, Receiver, TryRecvError};
use tracing::debug;

use super::gltf::{serialize_group, AssetFormat};
use super::{Artifact, ExportKind, JobStatus};
use crate::errors::StudioError;
use crate::state::scene::GroupSnapshot;

/// Serializes a group snapshot on a worker thread
pub struct AssetJob {
    result_rx: Receiver<Result<Artifact, StudioError>>,
}

impl AssetJob {
    pub fn spawn(snapshot: GroupSnapshot, format: AssetFormat) -> Result<Self, StudioError> {
        let (result_tx, result_rx) = bounded(1);
        thread::Builder::new()
            .name("asset-export".to_string())
            .spawn(move || {
                debug!(meshes = snapshot.meshes.len(), ?format, "serializing model");
                let result = serialize_group(&snapshot, format).map(|bytes| Artifact {
                    kind: ExportKind::Asset,
                    file_name: format.file_name().to_string(),
                    media_type: format.media_type().to_string(),
                    bytes,
                    clip: None,
                });
                let _ = result_tx.send(result);
            })?;
        Ok(Self { result_rx })
    }

    pub fn poll(&mut self) -> JobStatus {
        match self.result_rx.try_recv() {
            Ok(result) => JobStatus::Finished(result),
            Err(TryRecvError::Empty) => JobStatus::Pending,
            Err(TryRecvError::Disconnected) => JobStatus::Finished(Err(StudioError::ExportFailure(
                "asset worker exited without a result".to_string(),
            ))),
        }
    }
}
