//! JSON command protocol for driving the studio from a script or agent.

use serde::{Deserialize, Serialize};
use shared::{Color, MaterialPreset};

use crate::export::gltf::AssetFormat;
use crate::export::ExportKind;
use crate::harness::TestHarness;

/// A command against the studio's control surface.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum StudioCommand {
    /// Replace the document with SVG markup
    LoadSvg {
        svg: String,
    },
    SetThickness {
        value: f32,
    },
    SetMetalness {
        value: f32,
    },
    SetRoughness {
        value: f32,
    },
    SetOpacity {
        value: f32,
    },
    /// Base colour as `#rrggbb` or `#rgb`
    SetColor {
        hex: String,
    },
    SelectPreset {
        preset: MaterialPreset,
    },
    SetAnimationSpeed {
        value: f32,
    },
    Play,
    Pause,
    TogglePlayback,
    ResetRotation,
    ExportAsset {
        #[serde(default)]
        format: AssetFormat,
    },
    ExportVideo,
    /// Report controls, playback, meshes and export state.
    Inspect,
}

/// Response from executing a command.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl CommandResponse {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
            data: None,
        }
    }

    fn ok_with_data(data: serde_json::Value) -> Self {
        Self {
            success: true,
            error: None,
            data: Some(data),
        }
    }

    fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(msg.into()),
            data: None,
        }
    }
}

fn to_value<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

/// Execute a single command on the harness.
pub fn execute_command(harness: &mut TestHarness, cmd: StudioCommand) -> CommandResponse {
    let studio = &mut harness.studio;
    match cmd {
        StudioCommand::LoadSvg { svg } => match studio.load_svg(&svg) {
            Ok(outcome) => CommandResponse::ok_with_data(to_value(&outcome)),
            Err(e) => CommandResponse::err(e.to_string()),
        },

        StudioCommand::SetThickness { value } => {
            let rebuilt = studio.set_thickness(value);
            CommandResponse::ok_with_data(serde_json::json!({
                "thickness": studio.controls().thickness,
                "rebuilt": rebuilt.map(|o| to_value(&o)),
            }))
        }

        StudioCommand::SetMetalness { value } => {
            studio.set_metalness(value);
            CommandResponse::ok_with_data(serde_json::json!({
                "metalness": studio.controls().metalness,
            }))
        }

        StudioCommand::SetRoughness { value } => {
            studio.set_roughness(value);
            CommandResponse::ok_with_data(serde_json::json!({
                "roughness": studio.controls().roughness,
            }))
        }

        StudioCommand::SetOpacity { value } => {
            studio.set_opacity(value);
            CommandResponse::ok_with_data(serde_json::json!({
                "opacity": studio.controls().opacity,
            }))
        }

        StudioCommand::SetColor { hex } => match Color::from_hex(&hex) {
            Ok(color) => {
                studio.set_color(color);
                CommandResponse::ok_with_data(serde_json::json!({ "color": color.to_hex() }))
            }
            Err(e) => CommandResponse::err(e.to_string()),
        },

        StudioCommand::SelectPreset { preset } => {
            studio.select_preset(preset);
            CommandResponse::ok_with_data(to_value(&studio.controls()))
        }

        StudioCommand::SetAnimationSpeed { value } => {
            studio.set_animation_speed(value);
            CommandResponse::ok_with_data(serde_json::json!({
                "animation_speed": studio.animation().speed(),
            }))
        }

        StudioCommand::Play => {
            studio.play();
            CommandResponse::ok()
        }

        StudioCommand::Pause => {
            studio.pause();
            CommandResponse::ok()
        }

        StudioCommand::TogglePlayback => {
            let state = studio.toggle_playback();
            CommandResponse::ok_with_data(serde_json::json!({ "playback": state }))
        }

        StudioCommand::ResetRotation => {
            studio.reset_rotation();
            CommandResponse::ok()
        }

        StudioCommand::ExportAsset { format } => match studio.export_asset(format) {
            Ok(()) => CommandResponse::ok_with_data(serde_json::json!({
                "file_name": format.file_name(),
            })),
            Err(e) => CommandResponse::err(e.to_string()),
        },

        StudioCommand::ExportVideo => match studio.export_video() {
            Ok(()) => CommandResponse::ok_with_data(serde_json::json!({
                "video_state": studio.video_state(),
            })),
            Err(e) => CommandResponse::err(e.to_string()),
        },

        StudioCommand::Inspect => {
            let scene = studio.scene();
            let meshes: Vec<serde_json::Value> = scene
                .group()
                .map(|g| {
                    g.meshes
                        .iter()
                        .map(|m| {
                            serde_json::json!({
                                "id": m.id.to_string(),
                                "name": m.name,
                                "vertex_count": m.geometry.vertex_count(),
                                "triangle_count": m.geometry.triangle_count(),
                            })
                        })
                        .collect()
                })
                .unwrap_or_default();
            CommandResponse::ok_with_data(serde_json::json!({
                "controls": to_value(&studio.controls()),
                "playback": studio.animation().state(),
                "rotation": studio.rotation(),
                "mesh_count": meshes.len(),
                "meshes": meshes,
                "frame": scene.document().map(|d| to_value(&d.frame)),
                "video_state": studio.video_state(),
                "exports_busy": studio.exports_busy(),
                "exporting": {
                    "asset": studio.is_exporting(ExportKind::Asset),
                    "video": studio.is_exporting(ExportKind::Video),
                },
            }))
        }
    }
}

/// Parse and execute a single JSON command string.
pub fn execute_json(harness: &mut TestHarness, json: &str) -> Result<CommandResponse, String> {
    let cmd: StudioCommand =
        serde_json::from_str(json).map_err(|e| format!("Invalid command JSON: {e}"))?;
    Ok(execute_command(harness, cmd))
}

/// Parse and execute multiple JSON commands (array).
pub fn execute_json_batch(
    harness: &mut TestHarness,
    json: &str,
) -> Result<Vec<CommandResponse>, String> {
    let cmds: Vec<StudioCommand> =
        serde_json::from_str(json).map_err(|e| format!("Invalid commands JSON: {e}"))?;
    Ok(cmds
        .into_iter()
        .map(|cmd| execute_command(harness, cmd))
        .collect())
}
