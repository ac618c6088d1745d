//! H.264 MP4 clips through ffmpeg (`video-rs` feature).

use std::path::Path;

use ndarray::Array3;
use tracing::{info, instrument};
use video_rs::encode::{Encoder, Settings};
use video_rs::time::Time;

use super::encoder::{ClipEncoder, EncodedClip};
use crate::errors::StudioError;
use crate::viewport::CapturedFrame;

/// Encodes frames as H.264 (yuv420p) in an MP4 container at the exact frame rate
#[derive(Default)]
pub struct VideoRsClipEncoder;

fn video_err(e: video_rs::Error) -> StudioError {
    StudioError::ExportFailure(format!("video encoding failed: {}", e))
}

/// Drop alpha and crop to even dimensions, as yuv420p requires
pub(crate) fn to_rgb_frame(frame: &CapturedFrame) -> Result<Array3<u8>, StudioError> {
    let width = (frame.width & !1) as usize;
    let height = (frame.height & !1) as usize;
    if width == 0 || height == 0 {
        return Err(StudioError::ExportFailure(format!(
            "frame {}x{} is too small to encode",
            frame.width, frame.height
        )));
    }
    let stride = frame.width as usize * 4;
    if frame.pixels.len() != stride * frame.height as usize {
        return Err(StudioError::ExportFailure(
            "captured frame does not match its dimensions".to_string(),
        ));
    }

    let mut rgb = Vec::with_capacity(width * height * 3);
    for row in frame.pixels.chunks_exact(stride).take(height) {
        for px in row.chunks_exact(4).take(width) {
            rgb.extend_from_slice(&px[..3]);
        }
    }
    Array3::from_shape_vec((height, width, 3), rgb)
        .map_err(|e| StudioError::ExportFailure(e.to_string()))
}

fn open_encoder(path: &Path, frame: &Array3<u8>) -> Result<Encoder, StudioError> {
    let (height, width, _) = frame.dim();
    let settings = Settings::preset_h264_yuv420p(width, height, false);
    Encoder::new(path.to_path_buf(), settings).map_err(video_err)
}

impl ClipEncoder for VideoRsClipEncoder {
    fn file_name(&self) -> &'static str {
        "svg-3d-animation.mp4"
    }

    fn media_type(&self) -> &'static str {
        "video/mp4"
    }

    #[instrument(skip_all, fields(fps = fps))]
    fn encode(
        &mut self,
        frames: &mut dyn Iterator<Item = CapturedFrame>,
        fps: u32,
    ) -> Result<EncodedClip, StudioError> {
        video_rs::init().map_err(video_err)?;
        let fps = fps.max(1);
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(self.file_name());

        let mut encoder: Option<Encoder> = None;
        let mut first_dim = None;
        let mut frame_count = 0u32;
        for frame in frames {
            let rgb = to_rgb_frame(&frame)?;
            match first_dim {
                None => first_dim = Some(rgb.dim()),
                Some(dim) if dim != rgb.dim() => {
                    return Err(StudioError::ExportFailure(
                        "frame size changed during recording".to_string(),
                    ));
                }
                Some(_) => {}
            }
            if encoder.is_none() {
                encoder = Some(open_encoder(&path, &rgb)?);
            }
            if let Some(enc) = encoder.as_mut() {
                let at = Time::from_secs_f64(frame_count as f64 / fps as f64);
                enc.encode(&rgb, at).map_err(video_err)?;
            }
            frame_count += 1;
        }

        let Some(mut encoder) = encoder else {
            return Err(StudioError::ExportFailure("no frames were captured".to_string()));
        };
        encoder.finish().map_err(video_err)?;
        drop(encoder);

        let bytes = std::fs::read(&path)?;
        info!(frames = frame_count, bytes = bytes.len(), "encoded mp4 clip");
        Ok(EncodedClip {
            bytes,
            frame_count,
            duration_secs: frame_count as f64 / fps as f64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: u32, height: u32) -> CapturedFrame {
        let pixels = (0..width * height)
            .flat_map(|i| [(i % 256) as u8, 10, 20, 255])
            .collect();
        CapturedFrame {
            width,
            height,
            pixels,
        }
    }

    #[test]
    fn test_rgb_frame_cropped_to_even() {
        let rgb = to_rgb_frame(&frame(5, 3)).unwrap();
        assert_eq!(rgb.dim(), (2, 4, 3));
        assert_eq!(rgb[[0, 1, 0]], 1);
        assert_eq!(rgb[[1, 0, 0]], 5);
        assert_eq!(rgb[[1, 3, 2]], 20);
    }

    #[test]
    fn test_rgb_frame_rejects_bad_input() {
        assert!(to_rgb_frame(&frame(1, 1)).is_err());
        let bad = CapturedFrame {
            width: 4,
            height: 4,
            pixels: vec![0; 10],
        };
        assert!(to_rgb_frame(&bad).is_err());
    }

    #[test]
    fn test_encodes_mp4_at_exact_rate() {
        let mut frames = (0..30).map(|_| frame(48, 32));
        let clip = VideoRsClipEncoder.encode(&mut frames, 30).unwrap();
        assert_eq!(clip.frame_count, 30);
        assert_eq!(clip.duration_secs, 1.0);
        assert_eq!(&clip.bytes[4..8], b"ftyp");
    }

    #[test]
    fn test_no_frames_is_failure() {
        let result = VideoRsClipEncoder.encode(&mut std::iter::empty(), 30);
        assert!(matches!(result, Err(StudioError::ExportFailure(_))));
    }
}
