use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::material::{Color, MaterialPreset, MaterialSpec};

pub const THICKNESS_RANGE: RangeInclusive<f32> = 0.1..=2.0;
pub const METALNESS_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const ROUGHNESS_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const OPACITY_RANGE: RangeInclusive<f32> = 0.1..=1.0;
pub const ANIMATION_SPEED_RANGE: RangeInclusive<f32> = 0.1..=3.0;

/// Bevel smoothness (rings per end face)
pub const BEVEL_SEGMENTS: u32 = 2;
/// Body subdivisions along the extrusion axis
pub const EXTRUSION_STEPS: u32 = 2;
/// Bevel size and thickness as a fraction of depth
pub const BEVEL_RATIO: f32 = 0.1;

/// Clamp `value` into `range`; NaN falls back to the range start
pub fn clamp_to(value: f32, range: &RangeInclusive<f32>) -> f32 {
    if value.is_nan() {
        return *range.start();
    }
    value.clamp(*range.start(), *range.end())
}

/// Extrusion settings derived from the thickness control
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtrusionParams {
    pub depth: f32,
    pub bevel_size: f32,
    pub bevel_thickness: f32,
    pub bevel_segments: u32,
    pub steps: u32,
}

impl ExtrusionParams {
    pub fn from_depth(depth: f32) -> Self {
        Self {
            depth,
            bevel_size: depth * BEVEL_RATIO,
            bevel_thickness: depth * BEVEL_RATIO,
            bevel_segments: BEVEL_SEGMENTS,
            steps: EXTRUSION_STEPS,
        }
    }
}

/// Values exposed by the control surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Controls {
    pub thickness: f32,
    pub metalness: f32,
    pub roughness: f32,
    pub opacity: f32,
    pub animation_speed: f32,
    /// Last selected preset; manual edits keep the name
    pub preset: MaterialPreset,
    pub color: Color,
}

impl Default for Controls {
    fn default() -> Self {
        let preset = MaterialPreset::Chrome;
        Self {
            thickness: 0.2,
            metalness: 0.8,
            roughness: 0.2,
            opacity: 0.6,
            animation_speed: 1.0,
            preset,
            color: preset.color(),
        }
    }
}

impl Controls {
    /// Copy with every value clamped into its range
    pub fn clamped(&self) -> Self {
        Self {
            thickness: clamp_to(self.thickness, &THICKNESS_RANGE),
            metalness: clamp_to(self.metalness, &METALNESS_RANGE),
            roughness: clamp_to(self.roughness, &ROUGHNESS_RANGE),
            opacity: clamp_to(self.opacity, &OPACITY_RANGE),
            animation_speed: clamp_to(self.animation_speed, &ANIMATION_SPEED_RANGE),
            preset: self.preset,
            color: self.color,
        }
    }

    pub fn extrusion(&self) -> ExtrusionParams {
        ExtrusionParams::from_depth(self.thickness)
    }

    pub fn material(&self) -> MaterialSpec {
        MaterialSpec {
            color: self.color,
            metalness: self.metalness,
            roughness: self.roughness,
            opacity: self.opacity,
        }
    }

    /// Select a preset: colour, metalness and roughness follow it, opacity stays
    pub fn apply_preset(&mut self, preset: MaterialPreset) {
        self.preset = preset;
        self.color = preset.color();
        self.metalness = preset.metalness();
        self.roughness = preset.roughness();
    }
}
