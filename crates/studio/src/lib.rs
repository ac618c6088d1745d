// Library crate: the conversion pipeline, scene owner and export jobs.
// The binary is a thin headless driver on top of `Studio`.

pub mod animation;
pub mod build;
pub mod command;
pub mod errors;
pub mod export;
pub mod extrude;
pub mod fixtures;
pub mod harness;
pub mod input;
pub mod material;
pub mod normalize;
pub mod state;
pub mod studio;
pub mod validation;
pub mod vector;
pub mod viewport;

pub use errors::StudioError;
pub use studio::{Studio, StudioEvent};
