use shared::{clamp_to, Color, MaterialPreset, METALNESS_RANGE, OPACITY_RANGE, ROUGHNESS_RANGE};
use tracing::debug;

use super::SceneState;
use crate::material::bind_material;

impl SceneState {
    pub fn set_metalness(&mut self, value: f32) {
        self.controls.metalness = clamp_to(value, &METALNESS_RANGE);
        self.rebind_materials();
    }

    pub fn set_roughness(&mut self, value: f32) {
        self.controls.roughness = clamp_to(value, &ROUGHNESS_RANGE);
        self.rebind_materials();
    }

    pub fn set_opacity(&mut self, value: f32) {
        self.controls.opacity = clamp_to(value, &OPACITY_RANGE);
        self.rebind_materials();
    }

    pub fn set_color(&mut self, color: Color) {
        self.controls.color = color;
        self.rebind_materials();
    }

    /// Colour, metalness and roughness follow the preset; opacity stays
    pub fn select_preset(&mut self, preset: MaterialPreset) {
        self.controls.apply_preset(preset);
        self.rebind_materials();
    }

    /// Push the current material controls onto every mesh in place
    fn rebind_materials(&mut self) {
        let spec = self.controls.material();
        if let Some(group) = self.group.as_mut() {
            for mesh in &mut group.meshes {
                bind_material(&spec, mesh);
            }
            debug!(meshes = group.meshes.len(), "rebound materials");
        }
        self.version += 1;
    }
}
