//! Headless test harness for driving the studio frame by frame.
//!
//! Wraps a `Studio` with a small software surface and an in-memory
//! artifact sink, and records every event the frame loop emits.

use std::time::Duration;

use shared::Controls;

use crate::errors::StudioError;
use crate::export::encoder::{ClipEncoder, ClipFormat};
use crate::export::{Artifact, MemorySink};
use crate::state::scene::{LoadOutcome, MeshId};
use crate::studio::{Studio, StudioEvent};
use crate::validation::MeshValidator;
use crate::viewport::raster::SoftwareSurface;
use crate::viewport::{CapturedFrame, RenderSurface};

/// Nominal frame delta of a 60 Hz display
pub const FRAME_DT: f64 = 1.0 / 60.0;

const SURFACE_WIDTH: u32 = 48;
const SURFACE_HEIGHT: u32 = 32;

/// Headless test harness: studio, surface, sink and event log
pub struct TestHarness {
    pub studio: Studio,
    pub surface: SoftwareSurface,
    sink: MemorySink,
    events: Vec<StudioEvent>,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_controls(Controls::default())
    }

    pub fn with_controls(controls: Controls) -> Self {
        let sink = MemorySink::new();
        Self {
            // GIF keeps clips decodable without ffmpeg
            studio: Studio::new(controls, Box::new(sink.clone()))
                .with_clip_encoder(|| ClipFormat::Gif.encoder()),
            surface: SoftwareSurface::new(SURFACE_WIDTH, SURFACE_HEIGHT),
            sink,
            events: Vec::new(),
        }
    }

    /// Record clips with a different encoder
    pub fn with_clip_encoder(
        self,
        factory: impl Fn() -> Box<dyn ClipEncoder> + 'static,
    ) -> Self {
        Self {
            studio: self.studio.with_clip_encoder(factory),
            ..self
        }
    }

    // ── Document ──────────────────────────────────────────────

    pub fn load_svg(&mut self, svg: &str) -> Result<LoadOutcome, StudioError> {
        self.studio.load_svg(svg)
    }

    pub fn mesh_count(&self) -> usize {
        self.studio
            .scene()
            .group()
            .map(|g| g.meshes.len())
            .unwrap_or(0)
    }

    pub fn mesh_ids(&self) -> Vec<MeshId> {
        self.studio
            .scene()
            .group()
            .map(|g| g.mesh_ids())
            .unwrap_or_default()
    }

    pub fn rotation(&self) -> f64 {
        self.studio.rotation()
    }

    // ── Frame loop ────────────────────────────────────────────

    /// Present one frame of `dt` seconds
    pub fn tick(&mut self, dt: f64) -> Vec<StudioEvent> {
        let events = self.studio.tick(dt, &mut self.surface);
        self.events.extend(events.iter().cloned());
        events
    }

    pub fn run_frames(&mut self, count: usize, dt: f64) {
        for _ in 0..count {
            self.tick(dt);
        }
    }

    /// Tick until no export is running. Returns false if `max_ticks` ran out.
    pub fn run_until_idle(&mut self, dt: f64, max_ticks: usize) -> bool {
        for _ in 0..max_ticks {
            if !self.studio.exports_busy() {
                return true;
            }
            self.tick(dt);
            // Worker threads finish on wall-clock time, not frame time
            std::thread::sleep(Duration::from_millis(1));
        }
        !self.studio.exports_busy()
    }

    pub fn capture(&self) -> CapturedFrame {
        self.surface.capture()
    }

    // ── Results ───────────────────────────────────────────────

    pub fn artifacts(&self) -> Vec<Artifact> {
        self.sink.artifacts()
    }

    pub fn events(&self) -> &[StudioEvent] {
        &self.events
    }

    /// Validation errors of every mesh in the group, keyed by mesh name
    pub fn validate_meshes(&self) -> Vec<(String, Vec<String>)> {
        self.studio
            .scene()
            .group()
            .map(|g| {
                g.meshes
                    .iter()
                    .map(|m| (m.name.clone(), MeshValidator::new(&m.geometry).validate_all()))
                    .filter(|(_, errors)| !errors.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_harness_starts_empty() {
        let h = TestHarness::new();
        assert_eq!(h.mesh_count(), 0);
        assert!(h.artifacts().is_empty());
        assert_eq!(h.rotation(), 0.0);
    }

    #[test]
    fn test_load_and_spin() {
        let mut h = TestHarness::new();
        h.load_svg(fixtures::TWO_SHAPES_SVG).unwrap();
        assert_eq!(h.mesh_count(), 2);
        assert!(h.validate_meshes().is_empty());
        h.run_frames(60, FRAME_DT);
        assert!((h.rotation() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_idle_harness_is_idle() {
        let mut h = TestHarness::new();
        assert!(h.run_until_idle(FRAME_DT, 1));
        assert!(h.events().is_empty());
    }
}
