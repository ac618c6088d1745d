//! Asset and video export.
//!
//! Each export kind runs at most one job at a time. Jobs read a snapshot
//! of the model (or frames captured from the render surface) and do the
//! heavy encoding on a worker thread; the render loop only polls them.

pub mod asset;
pub mod encoder;
pub mod gltf;
#[cfg(feature = "video-rs")]
pub mod mp4;
pub mod sink;
pub mod video;

use serde::Serialize;
use tracing::{error, info};

use crate::errors::StudioError;
use crate::viewport::RenderSurface;
pub use asset::AssetJob;
pub use sink::{ArtifactSink, DirectorySink, MemorySink};
pub use video::{VideoJob, VideoState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    Asset,
    Video,
}

impl std::fmt::Display for ExportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportKind::Asset => write!(f, "asset"),
            ExportKind::Video => write!(f, "video"),
        }
    }
}

/// Timing of an encoded clip
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClipInfo {
    pub frame_count: u32,
    pub fps: u32,
    /// Sum of all frame delays
    pub duration_secs: f64,
}

/// A finished export ready for delivery
#[derive(Debug, Clone)]
pub struct Artifact {
    pub kind: ExportKind,
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
    pub clip: Option<ClipInfo>,
}

/// Poll result of a running job
pub enum JobStatus {
    Pending,
    Finished(Result<Artifact, StudioError>),
}

pub enum ExportJob {
    Asset(AssetJob),
    Video(VideoJob),
}

impl ExportJob {
    pub fn kind(&self) -> ExportKind {
        match self {
            ExportJob::Asset(_) => ExportKind::Asset,
            ExportJob::Video(_) => ExportKind::Video,
        }
    }

    /// Called once per rendered frame
    pub fn on_frame(&mut self, dt: f64, surface: &dyn RenderSurface) {
        if let ExportJob::Video(job) = self {
            job.on_frame(dt, surface);
        }
    }

    pub fn poll(&mut self) -> JobStatus {
        match self {
            ExportJob::Asset(job) => job.poll(),
            ExportJob::Video(job) => job.poll(),
        }
    }
}

/// Running export jobs, at most one per kind
#[derive(Default)]
pub struct ExportQueue {
    jobs: Vec<ExportJob>,
}

impl ExportQueue {
    pub fn is_active(&self, kind: ExportKind) -> bool {
        self.jobs.iter().any(|j| j.kind() == kind)
    }

    pub fn is_idle(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn video_state(&self) -> VideoState {
        self.jobs
            .iter()
            .find_map(|j| match j {
                ExportJob::Video(v) => Some(v.state()),
                ExportJob::Asset(_) => None,
            })
            .unwrap_or(VideoState::Idle)
    }

    pub fn start(&mut self, job: ExportJob) -> Result<(), StudioError> {
        let kind = job.kind();
        if self.is_active(kind) {
            return Err(StudioError::ExportInProgress(kind));
        }
        info!(%kind, "export started");
        self.jobs.push(job);
        Ok(())
    }

    pub fn on_frame(&mut self, dt: f64, surface: &dyn RenderSurface) {
        for job in &mut self.jobs {
            job.on_frame(dt, surface);
        }
    }

    /// Remove and return every job that finished since the last poll
    pub fn poll(&mut self) -> Vec<(ExportKind, Result<Artifact, StudioError>)> {
        let mut finished = Vec::new();
        let mut i = 0;
        while i < self.jobs.len() {
            match self.jobs[i].poll() {
                JobStatus::Pending => i += 1,
                JobStatus::Finished(result) => {
                    let kind = self.jobs.remove(i).kind();
                    match &result {
                        Ok(artifact) => info!(
                            %kind,
                            file = %artifact.file_name,
                            bytes = artifact.bytes.len(),
                            "export finished"
                        ),
                        Err(e) => error!(%kind, "export failed: {}", e),
                    }
                    finished.push((kind, result));
                }
            }
        }
        finished
    }
}
