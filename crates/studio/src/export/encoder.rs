//! Clip encoders turn captured frames into a playable file.

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::errors::StudioError;
use crate::viewport::CapturedFrame;

/// Encoded clip bytes and the timing actually written
pub struct EncodedClip {
    pub bytes: Vec<u8>,
    pub frame_count: u32,
    pub duration_secs: f64,
}

/// Runs on the encoder thread and drains frames until the sender hangs up
pub trait ClipEncoder: Send {
    fn file_name(&self) -> &'static str;

    fn media_type(&self) -> &'static str;

    fn encode(
        &mut self,
        frames: &mut dyn Iterator<Item = CapturedFrame>,
        fps: u32,
    ) -> Result<EncodedClip, StudioError>;
}

/// Container and codec of recorded clips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ClipFormat {
    /// Animated GIF; delays are whole centiseconds
    Gif,
    /// H.264 MP4 at the exact frame rate; needs the `video-rs` feature
    Mp4,
}

impl Default for ClipFormat {
    fn default() -> Self {
        #[cfg(feature = "video-rs")]
        {
            ClipFormat::Mp4
        }
        #[cfg(not(feature = "video-rs"))]
        {
            ClipFormat::Gif
        }
    }
}

impl ClipFormat {
    /// Whether this build can encode the format
    pub fn is_available(self) -> bool {
        match self {
            ClipFormat::Gif => true,
            ClipFormat::Mp4 => cfg!(feature = "video-rs"),
        }
    }

    /// Encoder for this format; MP4 falls back to GIF without ffmpeg support
    pub fn encoder(self) -> Box<dyn ClipEncoder> {
        match self {
            ClipFormat::Gif => Box::new(GifClipEncoder::default()),
            #[cfg(feature = "video-rs")]
            ClipFormat::Mp4 => Box::new(super::mp4::VideoRsClipEncoder),
            #[cfg(not(feature = "video-rs"))]
            ClipFormat::Mp4 => {
                tracing::warn!("built without the video-rs feature, recording GIF instead");
                Box::new(GifClipEncoder::default())
            }
        }
    }
}

/// Looping animated GIF
pub struct GifClipEncoder {
    /// NeuQuant sampling speed, 1 (best) to 30 (fastest)
    speed: i32,
}

impl Default for GifClipEncoder {
    fn default() -> Self {
        Self { speed: 10 }
    }
}

impl GifClipEncoder {
    pub fn with_speed(speed: i32) -> Self {
        Self {
            speed: speed.clamp(1, 30),
        }
    }
}

/// Delay of frame `k` in centiseconds.
///
/// GIF delays are whole centiseconds, so rounding is distributed across
/// frames: the first `k` delays always sum to `round(100 k / fps)`.
pub fn frame_delay_cs(k: u32, fps: u32) -> u32 {
    let fps = fps.max(1);
    let at = |n: u32| (100 * n + fps / 2) / fps;
    at(k + 1) - at(k)
}

fn encode_err(e: image::ImageError) -> StudioError {
    StudioError::ExportFailure(format!("GIF encoding failed: {}", e))
}

impl ClipEncoder for GifClipEncoder {
    fn file_name(&self) -> &'static str {
        "svg-3d-animation.gif"
    }

    fn media_type(&self) -> &'static str {
        "image/gif"
    }

    #[instrument(skip_all, fields(fps = fps, speed = self.speed))]
    fn encode(
        &mut self,
        frames: &mut dyn Iterator<Item = CapturedFrame>,
        fps: u32,
    ) -> Result<EncodedClip, StudioError> {
        let mut bytes = Vec::new();
        let mut frame_count = 0u32;
        let mut total_cs = 0u32;
        {
            let mut gif = GifEncoder::new_with_speed(&mut bytes, self.speed);
            gif.set_repeat(Repeat::Infinite).map_err(encode_err)?;
            for frame in frames {
                let delay_cs = frame_delay_cs(frame_count, fps);
                let image = RgbaImage::from_raw(frame.width, frame.height, frame.pixels)
                    .ok_or_else(|| {
                        StudioError::ExportFailure(
                            "captured frame does not match its dimensions".to_string(),
                        )
                    })?;
                let delay = Delay::from_numer_denom_ms(delay_cs * 10, 1);
                gif.encode_frame(Frame::from_parts(image, 0, 0, delay))
                    .map_err(encode_err)?;
                frame_count += 1;
                total_cs += delay_cs;
            }
        }

        if frame_count == 0 {
            return Err(StudioError::ExportFailure("no frames were captured".to_string()));
        }
        Ok(EncodedClip {
            bytes,
            frame_count,
            duration_secs: total_cs as f64 / 100.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::gif::GifDecoder;
    use image::AnimationDecoder;
    use std::io::Cursor;

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> CapturedFrame {
        let pixels = (0..width * height)
            .flat_map(|_| [rgb[0], rgb[1], rgb[2], 255])
            .collect();
        CapturedFrame {
            width,
            height,
            pixels,
        }
    }

    #[test]
    fn test_delays_sum_exactly() {
        let total: u32 = (0..150).map(|k| frame_delay_cs(k, 30)).sum();
        assert_eq!(total, 500);
        let first: Vec<u32> = (0..3).map(|k| frame_delay_cs(k, 30)).collect();
        assert_eq!(first, vec![3, 4, 3]);
        assert_eq!(frame_delay_cs(0, 25), 4);
    }

    #[test]
    fn test_gif_roundtrip_timing() {
        let mut frames = (0..6).map(|i| solid(4, 3, [i * 40, 0, 0]));
        let clip = GifClipEncoder::with_speed(30).encode(&mut frames, 30).unwrap();
        assert_eq!(clip.frame_count, 6);
        assert!((clip.duration_secs - 0.2).abs() < 1e-9);

        let decoder = GifDecoder::new(Cursor::new(clip.bytes)).unwrap();
        let decoded = decoder.into_frames().collect_frames().unwrap();
        assert_eq!(decoded.len(), 6);
        let total_ms: u32 = decoded
            .iter()
            .map(|f| {
                let (n, d) = f.delay().numer_denom_ms();
                n / d
            })
            .sum();
        assert_eq!(total_ms, 200);
    }

    #[test]
    fn test_mismatched_frame_rejected() {
        let bad = CapturedFrame {
            width: 4,
            height: 4,
            pixels: vec![0; 10],
        };
        let result = GifClipEncoder::default().encode(&mut std::iter::once(bad), 30);
        assert!(matches!(result, Err(StudioError::ExportFailure(_))));
    }

    #[test]
    fn test_clip_format_encoders() {
        let gif = ClipFormat::Gif.encoder();
        assert_eq!(gif.file_name(), "svg-3d-animation.gif");
        assert_eq!(gif.media_type(), "image/gif");
        let parsed: ClipFormat = serde_json::from_str("\"gif\"").unwrap();
        assert_eq!(parsed, ClipFormat::Gif);
        assert!(ClipFormat::default().is_available());
        #[cfg(not(feature = "video-rs"))]
        {
            assert_eq!(ClipFormat::default(), ClipFormat::Gif);
            assert!(!ClipFormat::Mp4.is_available());
            assert_eq!(ClipFormat::Mp4.encoder().file_name(), "svg-3d-animation.gif");
        }
        #[cfg(feature = "video-rs")]
        assert_eq!(ClipFormat::Mp4.encoder().file_name(), "svg-3d-animation.mp4");
    }

    #[test]
    fn test_no_frames_is_failure() {
        let result = GifClipEncoder::default().encode(&mut std::iter::empty(), 30);
        assert!(result.is_err());
    }
}
