use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use shared::{Color, MaterialPreset};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use svg3d_studio_lib::export::encoder::ClipFormat;
use svg3d_studio_lib::export::gltf::AssetFormat;
use svg3d_studio_lib::export::{DirectorySink, VideoState};
use svg3d_studio_lib::input::Upload;
use svg3d_studio_lib::state::scene::LoadOutcome;
use svg3d_studio_lib::state::AppSettings;
use svg3d_studio_lib::viewport::camera::OrbitCamera;
use svg3d_studio_lib::viewport::raster::SoftwareSurface;
use svg3d_studio_lib::{Studio, StudioError, StudioEvent};

/// Presented frame interval of the headless loop
const FRAME_DT: f64 = 1.0 / 60.0;

/// Give up on pending exports after this much wall-clock time
const EXPORT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// SVG document to extrude
    #[arg(value_name = "SVG")]
    input: PathBuf,

    /// Directory for exported files
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Extrusion depth (0.1 - 2.0)
    #[arg(long)]
    thickness: Option<f32>,

    #[arg(long)]
    metalness: Option<f32>,

    #[arg(long)]
    roughness: Option<f32>,

    /// Opacity (0.1 - 1.0); below 1 the model renders blended
    #[arg(long)]
    opacity: Option<f32>,

    /// Material preset: chrome, gold, copper, steel or bronze
    #[arg(long)]
    preset: Option<String>,

    /// Base colour as #rrggbb
    #[arg(long)]
    color: Option<String>,

    /// Rotation speed multiplier (0.1 - 3.0)
    #[arg(long)]
    speed: Option<f32>,

    /// Start with the animation paused
    #[arg(long)]
    paused: bool,

    /// Render surface width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Render surface height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Export the model as a 3D asset
    #[arg(long)]
    export_asset: bool,

    #[arg(long, value_enum)]
    asset_format: Option<AssetFormat>,

    /// Clip container for --export-video
    #[arg(long, value_enum)]
    clip_format: Option<ClipFormat>,

    /// Record a 5 second clip of the spinning model
    #[arg(long)]
    export_video: bool,

    /// Extra frames to present after exports finish
    #[arg(long, default_value_t = 0)]
    frames: u32,

    /// Persist the resulting settings as the new defaults
    #[arg(long)]
    save_settings: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "svg3d_studio=info,svg3d_studio_lib=info".into()
        }))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = match apply_overrides(AppSettings::load(), &cli) {
        Ok(settings) => settings,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if cli.save_settings {
        settings.save();
    }

    match run(&cli, &settings) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Fold command-line flags into the loaded settings
fn apply_overrides(mut settings: AppSettings, cli: &Cli) -> Result<AppSettings, String> {
    let controls = &mut settings.controls;
    if let Some(name) = &cli.preset {
        let preset = MaterialPreset::from_name(name)
            .ok_or_else(|| format!("Unknown material preset '{name}'"))?;
        controls.apply_preset(preset);
    }
    if let Some(hex) = &cli.color {
        controls.color = Color::from_hex(hex).map_err(|e| e.to_string())?;
    }
    if let Some(v) = cli.thickness {
        controls.thickness = v;
    }
    if let Some(v) = cli.metalness {
        controls.metalness = v;
    }
    if let Some(v) = cli.roughness {
        controls.roughness = v;
    }
    if let Some(v) = cli.opacity {
        controls.opacity = v;
    }
    if let Some(v) = cli.speed {
        controls.animation_speed = v;
    }
    settings.controls = settings.controls.clamped();

    if cli.paused {
        settings.start_paused = true;
    }
    if let Some(w) = cli.width {
        settings.surface.width = w;
    }
    if let Some(h) = cli.height {
        settings.surface.height = h;
    }
    if let Some(dir) = &cli.out {
        settings.export.output_dir = Some(dir.clone());
    }
    if let Some(format) = cli.asset_format {
        settings.export.asset_format = format;
    }
    if let Some(format) = cli.clip_format {
        settings.export.clip_format = format;
    }
    Ok(settings)
}

/// Load, export and spin; `Ok(false)` when any export failed
fn run(cli: &Cli, settings: &AppSettings) -> Result<bool, StudioError> {
    let out_dir = settings
        .export
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let sink = DirectorySink::new(&out_dir)?;
    let clip_format = settings.export.clip_format;
    let mut studio = Studio::new(settings.controls, Box::new(sink))
        .with_clip_encoder(move || clip_format.encoder());
    if settings.start_paused {
        studio.pause();
    }

    let mut camera = OrbitCamera::new();
    camera.rotate(settings.surface.camera_yaw, settings.surface.camera_pitch);
    let mut surface = SoftwareSurface::new(settings.surface.width, settings.surface.height)
        .with_background(settings.surface.background_color)
        .with_camera(camera);

    match studio.upload(Upload::from_path(&cli.input)?)? {
        LoadOutcome::Built { meshes, skipped } => {
            info!(meshes, skipped, "model ready");
        }
        LoadOutcome::Empty => warn!("document contains no fillable shapes"),
    }

    let mut ok = true;
    if cli.export_asset {
        if let Err(e) = studio.export_asset(settings.export.asset_format) {
            error!("asset export not started: {e}");
            ok = false;
        }
    }
    if cli.export_video {
        if let Err(e) = studio.export_video() {
            error!("video export not started: {e}");
            ok = false;
        }
    }

    let started = Instant::now();
    let mut extra_frames = cli.frames;
    loop {
        for event in studio.tick(FRAME_DT, &mut surface) {
            match event {
                StudioEvent::ExportFinished {
                    file_name,
                    location,
                    bytes,
                    ..
                } => {
                    let path = location.unwrap_or_else(|| out_dir.join(&file_name));
                    info!(path = %path.display(), bytes, "export written");
                }
                StudioEvent::ExportFailed { kind, error } => {
                    error!(%kind, "export failed: {error}");
                    ok = false;
                }
            }
        }

        if studio.exports_busy() {
            if started.elapsed() > EXPORT_TIMEOUT {
                error!("exports did not finish within {:?}", EXPORT_TIMEOUT);
                return Ok(false);
            }
            // Recording advances on frame time; encoding needs wall-clock time
            if studio.video_state() != VideoState::Recording {
                std::thread::sleep(Duration::from_millis(2));
            }
            continue;
        }
        if extra_frames == 0 {
            break;
        }
        extra_frames -= 1;
    }

    info!(rotation = studio.rotation(), "done");
    Ok(ok)
}
