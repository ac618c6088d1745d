use shared::{clamp_to, THICKNESS_RANGE};
use tracing::{info, instrument, warn};

use super::{Document, Group, LoadOutcome, SceneState, SolidMesh};
use crate::build::build_outline_meshes;
use crate::errors::StudioError;
use crate::normalize::NormalizationFrame;
use crate::vector::parse_document;

impl SceneState {
    /// Replace the document with freshly parsed markup.
    ///
    /// On a parse error nothing changes. On success the old group is torn
    /// down and a new one (rotation 0) is built from the new outlines.
    pub fn load_svg(&mut self, text: &str) -> Result<LoadOutcome, StudioError> {
        let parsed = match parse_document(text) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("rejected document: {}", e);
                return Err(e);
            }
        };

        let frame = NormalizationFrame::compute(&parsed.outlines);
        info!(
            outlines = parsed.outlines.len(),
            scale = frame.scale,
            "loaded vector document"
        );
        self.document = Some(Document {
            outlines: parsed.outlines,
            frame,
            width: parsed.width,
            height: parsed.height,
        });

        Ok(self.rebuild_meshes(true))
    }

    /// Set extrusion depth; rebuilds the meshes when the value changes.
    /// Returns `None` when no rebuild happened.
    pub fn set_thickness(&mut self, thickness: f32) -> Option<LoadOutcome> {
        let thickness = clamp_to(thickness, &THICKNESS_RANGE);
        if thickness == self.controls.thickness {
            return None;
        }
        self.controls.thickness = thickness;
        self.version += 1;
        self.document.as_ref()?;
        Some(self.rebuild_meshes(false))
    }

    /// Dispose every current mesh, then build and attach the replacements.
    ///
    /// `fresh_group` starts a new group at rotation 0; otherwise the
    /// current group (and its rotation) is kept.
    #[instrument(skip(self))]
    pub(crate) fn rebuild_meshes(&mut self, fresh_group: bool) -> LoadOutcome {
        let mut group = match self.group.take() {
            Some(mut old) => {
                self.disposed_count += dispose_meshes(&mut old);
                if fresh_group {
                    Group::default()
                } else {
                    old
                }
            }
            None => Group::default(),
        };

        let params = self.controls.extrusion();
        let spec = self.controls.material();
        let (built, errors) = match &self.document {
            Some(doc) => build_outline_meshes(&doc.outlines, &doc.frame, &params),
            None => (Vec::new(), Vec::new()),
        };

        group.meshes = built
            .into_iter()
            .map(|b| SolidMesh::new(b.name, b.geometry, &spec))
            .collect();

        let outcome = if group.meshes.is_empty() {
            LoadOutcome::Empty
        } else {
            LoadOutcome::Built {
                meshes: group.meshes.len(),
                skipped: errors.len(),
            }
        };

        info!(
            meshes = group.meshes.len(),
            skipped = errors.len(),
            depth = params.depth,
            "rebuilt model"
        );

        self.group = Some(group);
        self.rebuild_count += 1;
        self.version += 1;
        outcome
    }
}

fn dispose_meshes(group: &mut Group) -> u64 {
    let count = group.meshes.len() as u64;
    for mesh in group.meshes.drain(..) {
        mesh.dispose();
    }
    count
}
