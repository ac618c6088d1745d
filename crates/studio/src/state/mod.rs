pub mod scene;
pub mod settings;

pub use scene::{
    Document, Group, GroupSnapshot, LoadOutcome, MeshId, MeshSnapshot, SceneState, SolidMesh,
};
pub use settings::{AppSettings, ExportSettings, SurfaceSettings};
