//! Mesh building for a whole document: one solid per outline.

use shared::ExtrusionParams;
use tracing::warn;

use crate::extrude::extrude_outline;
use crate::normalize::NormalizationFrame;
use crate::vector::Outline;
use crate::viewport::mesh::MeshData;

/// A built solid and the outline it came from
pub struct BuiltMesh {
    pub outline_index: usize,
    pub name: String,
    pub geometry: MeshData,
}

/// Build one mesh per outline with a shared frame.
///
/// Outlines that fail to build are reported next to the successful ones
/// instead of aborting the whole document.
pub fn build_outline_meshes(
    outlines: &[Outline],
    frame: &NormalizationFrame,
    params: &ExtrusionParams,
) -> (Vec<BuiltMesh>, Vec<(usize, String)>) {
    let mut meshes = Vec::with_capacity(outlines.len());
    let mut errors = Vec::new();

    for (i, outline) in outlines.iter().enumerate() {
        match extrude_outline(outline, frame, params) {
            Ok(geometry) => meshes.push(BuiltMesh {
                outline_index: i,
                name: format!("outline-{}", i),
                geometry,
            }),
            Err(msg) => {
                warn!(outline = i, "skipping outline: {}", msg);
                errors.push((i, msg));
            }
        }
    }

    (meshes, errors)
}
