//! Value types shared between the studio core and its control surface.

mod controls;
mod material;

pub use controls::{
    clamp_to, Controls, ExtrusionParams, ANIMATION_SPEED_RANGE, BEVEL_RATIO, BEVEL_SEGMENTS,
    EXTRUSION_STEPS, METALNESS_RANGE, OPACITY_RANGE, ROUGHNESS_RANGE, THICKNESS_RANGE,
};
pub use material::{
    Color, ColorParseError, MaterialPreset, MaterialSpec, TransparencyMode,
    LOW_OPACITY_ALPHA_TEST, LOW_OPACITY_THRESHOLD, OPAQUE_THRESHOLD,
};
