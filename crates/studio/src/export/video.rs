//! Fixed-length clip recorder.
//!
//! The render loop hands the recorder its frame delta; the recorder
//! captures the surface and sends one frame per due 30 fps slot to an
//! encoder thread. Capture never waits on the encoder.

use std::thread;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TryRecvError};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::encoder::ClipEncoder;
use super::{Artifact, ClipInfo, ExportKind, JobStatus};
use crate::errors::StudioError;
use crate::viewport::{CapturedFrame, RenderSurface};

pub const VIDEO_FPS: u32 = 30;
pub const VIDEO_DURATION_SECS: u32 = 5;
pub const VIDEO_FRAME_COUNT: u32 = VIDEO_FPS * VIDEO_DURATION_SECS;

/// Slack when comparing slot times against accumulated frame deltas
const SLOT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoState {
    #[default]
    Idle,
    Recording,
    /// All frames captured, encoder still flushing
    Finalizing,
}

pub struct VideoJob {
    state: VideoState,
    frame_tx: Option<Sender<CapturedFrame>>,
    result_rx: Receiver<Result<Artifact, StudioError>>,
    /// Render-loop time since recording started
    elapsed: f64,
    frames_sent: u32,
}

impl VideoJob {
    /// Spawn the encoder thread and enter `Recording`
    pub fn start(mut encoder: Box<dyn ClipEncoder>) -> Result<Self, StudioError> {
        let (frame_tx, frame_rx) = unbounded::<CapturedFrame>();
        let (result_tx, result_rx) = bounded(1);

        thread::Builder::new()
            .name("clip-encoder".to_string())
            .spawn(move || {
                let file_name = encoder.file_name();
                let media_type = encoder.media_type();
                let mut frames = frame_rx.iter();
                let result = encoder
                    .encode(&mut frames, VIDEO_FPS)
                    .map(|clip| Artifact {
                        kind: ExportKind::Video,
                        file_name: file_name.to_string(),
                        media_type: media_type.to_string(),
                        bytes: clip.bytes,
                        clip: Some(ClipInfo {
                            frame_count: clip.frame_count,
                            fps: VIDEO_FPS,
                            duration_secs: clip.duration_secs,
                        }),
                    });
                let _ = result_tx.send(result);
            })?;

        info!(
            fps = VIDEO_FPS,
            frames = VIDEO_FRAME_COUNT,
            "recording started"
        );
        Ok(Self {
            state: VideoState::Recording,
            frame_tx: Some(frame_tx),
            result_rx,
            elapsed: 0.0,
            frames_sent: 0,
        })
    }

    pub fn state(&self) -> VideoState {
        self.state
    }

    pub fn frames_sent(&self) -> u32 {
        self.frames_sent
    }

    /// Feed one rendered frame that was shown for `dt` seconds.
    ///
    /// Slot `k` is due at `k / 30` s; every due slot gets the current
    /// capture, so long frames repeat and short frames may send nothing.
    pub fn on_frame(&mut self, dt: f64, surface: &dyn RenderSurface) {
        if self.state != VideoState::Recording {
            return;
        }
        let Some(tx) = &self.frame_tx else {
            return;
        };

        let mut capture: Option<CapturedFrame> = None;
        let mut disconnected = false;
        while self.frames_sent < VIDEO_FRAME_COUNT
            && self.frames_sent as f64 / VIDEO_FPS as f64 <= self.elapsed + SLOT_EPSILON
        {
            let frame = capture.get_or_insert_with(|| surface.capture()).clone();
            if tx.send(frame).is_err() {
                disconnected = true;
                break;
            }
            self.frames_sent += 1;
        }
        if dt.is_finite() && dt > 0.0 {
            self.elapsed += dt;
        }

        if disconnected {
            warn!(
                frames = self.frames_sent,
                "clip encoder stopped early"
            );
            self.finish_capture();
        } else if self.frames_sent >= VIDEO_FRAME_COUNT {
            self.finish_capture();
        }
    }

    /// Hang up the frame channel so the encoder can flush
    fn finish_capture(&mut self) {
        self.frame_tx = None;
        self.state = VideoState::Finalizing;
        debug!(frames = self.frames_sent, "recording finalizing");
    }

    pub fn poll(&mut self) -> JobStatus {
        match self.result_rx.try_recv() {
            Ok(result) => {
                self.state = VideoState::Idle;
                JobStatus::Finished(result)
            }
            Err(TryRecvError::Empty) => JobStatus::Pending,
            Err(TryRecvError::Disconnected) => {
                self.state = VideoState::Idle;
                JobStatus::Finished(Err(StudioError::ExportFailure(
                    "clip encoder exited without a result".to_string(),
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::encoder::EncodedClip;
    use crate::state::scene::Group;
    use std::time::Duration;

    /// Counts frames without encoding anything
    struct CountingEncoder;

    impl ClipEncoder for CountingEncoder {
        fn file_name(&self) -> &'static str {
            "count.bin"
        }

        fn media_type(&self) -> &'static str {
            "application/octet-stream"
        }

        fn encode(
            &mut self,
            frames: &mut dyn Iterator<Item = CapturedFrame>,
            fps: u32,
        ) -> Result<EncodedClip, StudioError> {
            let frame_count = frames.count() as u32;
            Ok(EncodedClip {
                bytes: frame_count.to_le_bytes().to_vec(),
                frame_count,
                duration_secs: frame_count as f64 / fps as f64,
            })
        }
    }

    struct FailingEncoder;

    impl ClipEncoder for FailingEncoder {
        fn file_name(&self) -> &'static str {
            "fail.bin"
        }

        fn media_type(&self) -> &'static str {
            "application/octet-stream"
        }

        fn encode(
            &mut self,
            _frames: &mut dyn Iterator<Item = CapturedFrame>,
            _fps: u32,
        ) -> Result<EncodedClip, StudioError> {
            Err(StudioError::ExportFailure("encoder broke".to_string()))
        }
    }

    struct FlatSurface;

    impl RenderSurface for FlatSurface {
        fn size(&self) -> (u32, u32) {
            (2, 2)
        }

        fn render(&mut self, _group: Option<&Group>) {}

        fn capture(&self) -> CapturedFrame {
            CapturedFrame {
                width: 2,
                height: 2,
                pixels: vec![255; 16],
            }
        }
    }

    fn wait(job: &mut VideoJob) -> Result<Artifact, StudioError> {
        for _ in 0..2000 {
            if let JobStatus::Finished(result) = job.poll() {
                return result;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        panic!("video job did not finish");
    }

    #[test]
    fn test_records_exact_frame_count_at_display_rate() {
        let mut job = VideoJob::start(Box::new(CountingEncoder)).unwrap();
        assert_eq!(job.state(), VideoState::Recording);
        let mut ticks = 0;
        while job.state() == VideoState::Recording {
            job.on_frame(1.0 / 60.0, &FlatSurface);
            ticks += 1;
            assert!(ticks < 1000);
        }
        // 150 slots, the last one due at 149/30 s
        assert_eq!(ticks, 299);
        assert_eq!(job.state(), VideoState::Finalizing);

        let artifact = wait(&mut job).unwrap();
        assert_eq!(job.state(), VideoState::Idle);
        let clip = artifact.clip.unwrap();
        assert_eq!(clip.frame_count, VIDEO_FRAME_COUNT);
        assert!((clip.duration_secs - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_long_frames_repeat_capture() {
        let mut job = VideoJob::start(Box::new(CountingEncoder)).unwrap();
        job.on_frame(0.5, &FlatSurface);
        assert_eq!(job.frames_sent(), 1);
        job.on_frame(0.5, &FlatSurface);
        assert_eq!(job.frames_sent(), 16);
        for _ in 0..20 {
            job.on_frame(0.5, &FlatSurface);
        }
        assert_eq!(job.frames_sent(), VIDEO_FRAME_COUNT);
        assert_eq!(wait(&mut job).unwrap().clip.unwrap().frame_count, 150);
    }

    #[test]
    fn test_encoder_failure_reported() {
        let mut job = VideoJob::start(Box::new(FailingEncoder)).unwrap();
        for _ in 0..400 {
            job.on_frame(1.0 / 30.0, &FlatSurface);
        }
        assert_eq!(job.state(), VideoState::Finalizing);
        assert!(matches!(
            wait(&mut job),
            Err(StudioError::ExportFailure(_))
        ));
    }
}
