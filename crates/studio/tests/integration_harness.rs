//! Integration tests for the frame loop and both export kinds.
//!
//! Drives `TestHarness` tick by tick; worker threads are waited on with
//! `run_until_idle`.

use std::io::Cursor;

use image::codecs::gif::GifDecoder;
use image::AnimationDecoder;
use shared::Controls;
use svg3d_studio_lib::errors::StudioError;
use svg3d_studio_lib::export::encoder::{ClipEncoder, EncodedClip};
use svg3d_studio_lib::export::gltf::AssetFormat;
use svg3d_studio_lib::export::{ExportKind, VideoState};
use svg3d_studio_lib::fixtures::*;
use svg3d_studio_lib::harness::{TestHarness, FRAME_DT};
use svg3d_studio_lib::input::Upload;
use svg3d_studio_lib::viewport::CapturedFrame;
use svg3d_studio_lib::StudioEvent;

const VIDEO_DT: f64 = 1.0 / 30.0;

fn loaded(svg: &str) -> TestHarness {
    let mut h = TestHarness::new();
    h.load_svg(svg).unwrap();
    h
}

/// Encoder that gives up immediately
struct BrokenEncoder;

impl ClipEncoder for BrokenEncoder {
    fn file_name(&self) -> &'static str {
        "broken.gif"
    }

    fn media_type(&self) -> &'static str {
        "image/gif"
    }

    fn encode(
        &mut self,
        _frames: &mut dyn Iterator<Item = CapturedFrame>,
        _fps: u32,
    ) -> Result<EncodedClip, StudioError> {
        Err(StudioError::ExportFailure("disk full".to_string()))
    }
}

// ── Asset export ──────────────────────────────────────────────

#[test]
fn test_asset_export_delivers_gltf() {
    let mut h = loaded(TWO_SHAPES_SVG);
    h.studio.export_asset(AssetFormat::Gltf).unwrap();
    assert!(h.run_until_idle(FRAME_DT, 5000));

    let artifacts = h.artifacts();
    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].file_name, "svg-model.gltf");
    assert_eq!(artifacts[0].media_type, "model/gltf+json");

    let doc: serde_json::Value = serde_json::from_slice(&artifacts[0].bytes).unwrap();
    assert_eq!(doc["meshes"].as_array().unwrap().len(), 2);

    assert!(matches!(
        h.events(),
        [StudioEvent::ExportFinished {
            kind: ExportKind::Asset,
            location: None,
            ..
        }]
    ));
}

#[test]
fn test_second_asset_export_rejected_while_running() {
    let mut h = loaded(SQUARE_SVG);
    h.studio.export_asset(AssetFormat::Glb).unwrap();
    let second = h.studio.export_asset(AssetFormat::Glb);
    assert!(matches!(
        second,
        Err(StudioError::ExportInProgress(ExportKind::Asset))
    ));
    assert!(h.run_until_idle(FRAME_DT, 5000));
    assert_eq!(h.artifacts().len(), 1);

    // a new request is accepted once the first one finished
    h.studio.export_asset(AssetFormat::Glb).unwrap();
    assert!(h.run_until_idle(FRAME_DT, 5000));
    assert_eq!(h.artifacts().len(), 2);
}

#[test]
fn test_export_snapshot_ignores_later_edits() {
    let mut h = loaded(SQUARE_SVG);
    h.studio.export_asset(AssetFormat::Gltf).unwrap();
    // rebuild and restyle while the worker runs
    h.studio.set_thickness(1.5);
    h.studio.set_opacity(1.0);
    assert!(h.run_until_idle(FRAME_DT, 5000));

    let doc: serde_json::Value = serde_json::from_slice(&h.artifacts()[0].bytes).unwrap();
    assert_eq!(doc["materials"][0]["alphaMode"], "BLEND");
    let max_z = doc["accessors"][0]["max"][2].as_f64().unwrap();
    assert!((max_z - 0.12).abs() < 1e-5);
}

// ── Video export ──────────────────────────────────────────────

#[test]
fn test_video_export_runs_full_cycle() {
    let mut h = loaded(SQUARE_SVG);
    h.studio.export_video().unwrap();
    assert_eq!(h.studio.video_state(), VideoState::Recording);

    // 150 slots at 30 fps; the last slot is due at 149/30 s
    h.run_frames(149, VIDEO_DT);
    assert_eq!(h.studio.video_state(), VideoState::Recording);
    h.tick(VIDEO_DT);
    assert_ne!(h.studio.video_state(), VideoState::Recording);

    assert!(h.run_until_idle(VIDEO_DT, 10_000));
    assert_eq!(h.studio.video_state(), VideoState::Idle);

    let artifacts = h.artifacts();
    assert_eq!(artifacts.len(), 1);
    let clip = &artifacts[0];
    assert_eq!(clip.file_name, "svg-3d-animation.gif");
    assert_eq!(clip.media_type, "image/gif");
    let info = clip.clip.unwrap();
    assert_eq!(info.frame_count, 150);
    assert_eq!(info.fps, 30);
    assert!((info.duration_secs - 5.0).abs() <= 1.0 / 30.0);

    let frames = GifDecoder::new(Cursor::new(clip.bytes.clone()))
        .unwrap()
        .into_frames()
        .collect_frames()
        .unwrap();
    assert_eq!(frames.len(), 150);
    let total_ms: u32 = frames
        .iter()
        .map(|f| {
            let (n, d) = f.delay().numer_denom_ms();
            n / d
        })
        .sum();
    assert_eq!(total_ms, 5000);
    assert_eq!(frames[0].buffer().dimensions(), (48, 32));
}

#[test]
fn test_recording_does_not_stall_animation() {
    let mut h = loaded(SQUARE_SVG);
    h.studio.export_video().unwrap();
    h.run_frames(150, VIDEO_DT);
    assert!((h.rotation() - 5.0).abs() < 1e-9);
}

#[test]
fn test_second_video_export_rejected() {
    let mut h = loaded(SQUARE_SVG);
    h.studio.export_video().unwrap();
    h.run_frames(10, VIDEO_DT);
    assert!(matches!(
        h.studio.export_video(),
        Err(StudioError::ExportInProgress(ExportKind::Video))
    ));
    // asset exports are independent of the recording
    h.studio.export_asset(AssetFormat::Gltf).unwrap();
    assert!(h.run_until_idle(VIDEO_DT, 10_000));
    assert_eq!(h.artifacts().len(), 2);
}

#[test]
fn test_upload_refused_until_recording_finishes() {
    let mut h = loaded(SQUARE_SVG);
    let ids = h.mesh_ids();
    h.studio.export_video().unwrap();
    h.tick(VIDEO_DT);

    let upload = Upload::svg("circle.svg", CIRCLE_SVG);
    assert!(matches!(
        h.studio.upload(upload.clone()),
        Err(StudioError::RecordingActive)
    ));
    assert_eq!(h.mesh_ids(), ids);

    assert!(h.run_until_idle(VIDEO_DT, 10_000));
    assert!(h.studio.upload(upload).is_ok());
    assert_ne!(h.mesh_ids(), ids);
}

#[test]
fn test_encoder_failure_surfaces_once() {
    let mut h = TestHarness::new().with_clip_encoder(|| Box::new(BrokenEncoder));
    h.load_svg(SQUARE_SVG).unwrap();
    h.studio.export_video().unwrap();
    assert!(h.run_until_idle(VIDEO_DT, 10_000));

    let failures: Vec<_> = h
        .events()
        .iter()
        .filter(|e| matches!(e, StudioEvent::ExportFailed { .. }))
        .collect();
    assert_eq!(failures.len(), 1);
    match failures[0] {
        StudioEvent::ExportFailed { kind, error } => {
            assert_eq!(*kind, ExportKind::Video);
            assert!(error.contains("disk full"));
        }
        _ => unreachable!(),
    }
    // the live scene is untouched
    assert!(h.studio.scene().has_model());
    assert_eq!(h.studio.video_state(), VideoState::Idle);
}

// ── Input and edge cases ──────────────────────────────────────

#[test]
fn test_non_svg_upload_rejected() {
    let mut h = loaded(SQUARE_SVG);
    let version = h.studio.scene().version();
    let result = h
        .studio
        .upload(Upload::new("notes.txt", "text/plain", b"hello".to_vec()));
    assert!(matches!(result, Err(StudioError::InvalidInputFormat(_))));
    assert_eq!(h.studio.scene().version(), version);
}

#[test]
fn test_malformed_upload_keeps_last_good_group() {
    let mut h = loaded(TWO_SHAPES_SVG);
    let ids = h.mesh_ids();
    assert!(h.load_svg(MALFORMED_SVG).is_err());
    h.run_frames(5, FRAME_DT);
    assert_eq!(h.mesh_ids(), ids);
}

#[test]
fn test_empty_document_renders_background_only() {
    let mut h = loaded(EMPTY_SVG);
    assert_eq!(h.mesh_count(), 0);
    h.tick(FRAME_DT);
    let frame = h.capture();
    assert_eq!(frame.pixel(24, 16), [17, 17, 17, 255]);
    assert!(matches!(
        h.studio.export_video(),
        Err(StudioError::NoModelToExport)
    ));
}

#[test]
fn test_model_is_visible_in_capture() {
    let mut h = loaded(SQUARE_SVG);
    h.studio.pause();
    h.tick(FRAME_DT);
    let frame = h.capture();
    assert_ne!(frame.pixel(24, 16), [17, 17, 17, 255]);
}

#[test]
fn test_animation_speed_from_controls() {
    let mut h = TestHarness::with_controls(Controls {
        animation_speed: 2.0,
        ..Controls::default()
    });
    h.load_svg(SQUARE_SVG).unwrap();
    h.run_frames(30, FRAME_DT);
    assert!((h.rotation() - 1.0).abs() < 1e-9);
}
