//! The studio: scene, animation and exports behind one frame loop.

use std::path::PathBuf;

use serde::Serialize;
use shared::{Color, Controls, MaterialPreset};
use tracing::{error, info, warn};

use crate::animation::{AnimationDriver, PlaybackState};
use crate::errors::StudioError;
use crate::export::encoder::{ClipEncoder, ClipFormat};
use crate::export::gltf::AssetFormat;
use crate::export::{
    ArtifactSink, AssetJob, ExportJob, ExportKind, ExportQueue, VideoJob, VideoState,
};
use crate::input::Upload;
use crate::state::scene::{LoadOutcome, SceneState};
use crate::viewport::RenderSurface;

type EncoderFactory = Box<dyn Fn() -> Box<dyn ClipEncoder>>;

/// Something the frame loop wants the host to know about
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StudioEvent {
    ExportFinished {
        kind: ExportKind,
        file_name: String,
        location: Option<PathBuf>,
        bytes: usize,
    },
    ExportFailed {
        kind: ExportKind,
        error: String,
    },
}

pub struct Studio {
    scene: SceneState,
    animation: AnimationDriver,
    exports: ExportQueue,
    sink: Box<dyn ArtifactSink>,
    clip_encoder: EncoderFactory,
}

impl Studio {
    pub fn new(controls: Controls, sink: Box<dyn ArtifactSink>) -> Self {
        let scene = SceneState::new(controls);
        let animation = AnimationDriver::new(scene.controls().animation_speed);
        Self {
            scene,
            animation,
            exports: ExportQueue::default(),
            sink,
            clip_encoder: Box::new(|| ClipFormat::default().encoder()),
        }
    }

    /// Replace the encoder used for video exports
    pub fn with_clip_encoder(
        mut self,
        factory: impl Fn() -> Box<dyn ClipEncoder> + 'static,
    ) -> Self {
        self.clip_encoder = Box::new(factory);
        self
    }

    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    pub fn animation(&self) -> &AnimationDriver {
        &self.animation
    }

    /// Current control values, including the live animation speed
    pub fn controls(&self) -> Controls {
        Controls {
            animation_speed: self.animation.speed(),
            ..*self.scene.controls()
        }
    }

    // ── Document ──────────────────────────────────────────────

    /// Accept a user upload; non-SVG files are rejected without touching the scene
    pub fn upload(&mut self, upload: Upload) -> Result<LoadOutcome, StudioError> {
        self.ensure_not_recording()?;
        let text = upload.into_svg_text().map_err(|e| {
            warn!("rejected upload: {}", e);
            e
        })?;
        self.scene.load_svg(&text)
    }

    pub fn load_svg(&mut self, text: &str) -> Result<LoadOutcome, StudioError> {
        self.ensure_not_recording()?;
        self.scene.load_svg(text)
    }

    fn ensure_not_recording(&self) -> Result<(), StudioError> {
        if self.exports.video_state() != VideoState::Idle {
            warn!("document load refused while recording");
            return Err(StudioError::RecordingActive);
        }
        Ok(())
    }

    // ── Controls ──────────────────────────────────────────────

    pub fn set_thickness(&mut self, thickness: f32) -> Option<LoadOutcome> {
        self.scene.set_thickness(thickness)
    }

    pub fn set_metalness(&mut self, value: f32) {
        self.scene.set_metalness(value);
    }

    pub fn set_roughness(&mut self, value: f32) {
        self.scene.set_roughness(value);
    }

    pub fn set_opacity(&mut self, value: f32) {
        self.scene.set_opacity(value);
    }

    pub fn set_color(&mut self, color: Color) {
        self.scene.set_color(color);
    }

    pub fn select_preset(&mut self, preset: MaterialPreset) {
        self.scene.select_preset(preset);
    }

    pub fn set_animation_speed(&mut self, speed: f32) {
        self.animation.set_speed(speed);
    }

    pub fn play(&mut self) {
        self.animation.play();
    }

    pub fn pause(&mut self) {
        self.animation.pause();
    }

    pub fn toggle_playback(&mut self) -> PlaybackState {
        self.animation.toggle()
    }

    pub fn reset_rotation(&mut self) {
        if let Some(group) = self.scene.group_mut() {
            self.animation.reset_rotation(group);
        }
    }

    pub fn rotation(&self) -> f64 {
        self.scene.group().map(|g| g.rotation_y).unwrap_or(0.0)
    }

    // ── Export ────────────────────────────────────────────────

    /// Start serializing the current model on a worker thread
    pub fn export_asset(&mut self, format: AssetFormat) -> Result<(), StudioError> {
        if self.exports.is_active(ExportKind::Asset) {
            return Err(StudioError::ExportInProgress(ExportKind::Asset));
        }
        let snapshot = self.scene.snapshot().ok_or(StudioError::NoModelToExport)?;
        let job = AssetJob::spawn(snapshot, format)?;
        self.exports.start(ExportJob::Asset(job))
    }

    /// Start recording a clip from the next rendered frame on
    pub fn export_video(&mut self) -> Result<(), StudioError> {
        if self.exports.is_active(ExportKind::Video) {
            return Err(StudioError::ExportInProgress(ExportKind::Video));
        }
        if !self.scene.has_model() {
            return Err(StudioError::NoModelToExport);
        }
        let job = VideoJob::start((self.clip_encoder)())?;
        self.exports.start(ExportJob::Video(job))
    }

    pub fn video_state(&self) -> VideoState {
        self.exports.video_state()
    }

    pub fn is_exporting(&self, kind: ExportKind) -> bool {
        self.exports.is_active(kind)
    }

    pub fn exports_busy(&self) -> bool {
        !self.exports.is_idle()
    }

    // ── Frame loop ────────────────────────────────────────────

    /// One presented frame: animate, render, feed the recorder, then
    /// collect finished exports and hand them to the sink.
    pub fn tick(&mut self, dt: f64, surface: &mut dyn RenderSurface) -> Vec<StudioEvent> {
        if let Some(group) = self.scene.group_mut() {
            self.animation.advance(group, dt);
        }
        surface.render(self.scene.group());
        self.exports.on_frame(dt, &*surface);

        self.exports
            .poll()
            .into_iter()
            .map(|(kind, result)| match result {
                Ok(artifact) => match self.sink.deliver(&artifact) {
                    Ok(location) => {
                        info!(%kind, file = %artifact.file_name, "artifact delivered");
                        StudioEvent::ExportFinished {
                            kind,
                            file_name: artifact.file_name,
                            location,
                            bytes: artifact.bytes.len(),
                        }
                    }
                    Err(e) => {
                        error!(%kind, "artifact delivery failed: {}", e);
                        StudioEvent::ExportFailed {
                            kind,
                            error: e.to_string(),
                        }
                    }
                },
                Err(e) => StudioEvent::ExportFailed {
                    kind,
                    error: e.to_string(),
                },
            })
            .collect()
    }
}
