//! Surface material bound to every mesh of the model.

use serde::Serialize;
use shared::{Color, MaterialSpec, TransparencyMode};

use crate::state::scene::SolidMesh;

/// Environment reflection strength; fixed for every material
pub const ENV_MAP_INTENSITY: f32 = 1.0;

/// Render-ready material state derived from a `MaterialSpec`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SurfaceMaterial {
    pub color: Color,
    pub metalness: f32,
    pub roughness: f32,
    pub opacity: f32,
    pub transparency: TransparencyMode,
    /// Back faces are drawn whenever the material blends
    pub double_sided: bool,
    /// Fragments with alpha below this are discarded (0 disables)
    pub alpha_test: f32,
    pub env_map_intensity: f32,
}

impl SurfaceMaterial {
    pub fn from_spec(spec: &MaterialSpec) -> Self {
        let transparency = spec.transparency_mode();
        Self {
            color: spec.color,
            metalness: spec.metalness,
            roughness: spec.roughness,
            opacity: spec.opacity,
            transparency,
            double_sided: transparency == TransparencyMode::Blended,
            alpha_test: spec.alpha_test(),
            env_map_intensity: ENV_MAP_INTENSITY,
        }
    }

    pub fn is_blended(&self) -> bool {
        self.transparency == TransparencyMode::Blended
    }
}

impl Default for SurfaceMaterial {
    fn default() -> Self {
        Self::from_spec(&MaterialSpec::default())
    }
}

/// Rebind a mesh's material in place; geometry and identity are untouched
pub fn bind_material(spec: &MaterialSpec, mesh: &mut SolidMesh) {
    mesh.material = SurfaceMaterial::from_spec(spec);
}
