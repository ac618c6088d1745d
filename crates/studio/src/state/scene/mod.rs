//! Scene state management
//!
//! Owns the loaded document, the control values and the single group of
//! solids built from them. Every mutation bumps a version counter.

mod material_ops;
mod rebuild;

use std::sync::Arc;

use glam::Mat4;
use serde::Serialize;
use shared::{Controls, MaterialSpec};
use tracing::debug;
use uuid::Uuid;

use crate::material::SurfaceMaterial;
use crate::normalize::NormalizationFrame;
use crate::vector::Outline;
use crate::viewport::bounds::Aabb;
use crate::viewport::mesh::MeshData;

/// Identity of one built mesh; a rebuild always issues new ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MeshId(Uuid);

impl MeshId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MeshId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MeshId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One extruded outline with its bound material
#[derive(Debug, Clone)]
pub struct SolidMesh {
    pub id: MeshId,
    pub name: String,
    /// Shared with in-flight export snapshots; never mutated after build
    pub geometry: Arc<MeshData>,
    pub material: SurfaceMaterial,
}

impl SolidMesh {
    pub fn new(name: String, geometry: MeshData, spec: &MaterialSpec) -> Self {
        Self {
            id: MeshId::new(),
            name,
            geometry: Arc::new(geometry),
            material: SurfaceMaterial::from_spec(spec),
        }
    }

    /// Release this mesh's geometry and material
    pub fn dispose(self) {
        debug!(mesh = %self.id, name = %self.name, "disposing mesh");
    }
}

/// Container of every solid of the current document
#[derive(Debug, Default)]
pub struct Group {
    pub meshes: Vec<SolidMesh>,
    /// Accumulated rotation about +Y in radians (not wrapped)
    pub rotation_y: f64,
}

impl Group {
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn mesh_ids(&self) -> Vec<MeshId> {
        self.meshes.iter().map(|m| m.id).collect()
    }

    /// Object-to-world transform
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_rotation_y(self.rotation_y.rem_euclid(std::f64::consts::TAU) as f32)
    }

    /// Bounds of all meshes before rotation
    pub fn local_aabb(&self) -> Option<Aabb> {
        let aabb = self
            .meshes
            .iter()
            .map(|m| Aabb::from_mesh(&m.geometry))
            .fold(Aabb::EMPTY, |acc, b| acc.union(&b));
        (!aabb.is_empty()).then_some(aabb)
    }

    /// Read-only copy for exporters; geometry buffers are shared, not copied
    pub fn snapshot(&self) -> GroupSnapshot {
        GroupSnapshot {
            meshes: self
                .meshes
                .iter()
                .map(|m| MeshSnapshot {
                    name: m.name.clone(),
                    geometry: Arc::clone(&m.geometry),
                    material: m.material,
                })
                .collect(),
            rotation_y: self.rotation_y,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MeshSnapshot {
    pub name: String,
    pub geometry: Arc<MeshData>,
    pub material: SurfaceMaterial,
}

/// Group state captured when an export starts
#[derive(Debug, Clone)]
pub struct GroupSnapshot {
    pub meshes: Vec<MeshSnapshot>,
    pub rotation_y: f64,
}

/// The parsed source document and its normalization frame
#[derive(Debug, Clone)]
pub struct Document {
    pub outlines: Vec<Outline>,
    pub frame: NormalizationFrame,
    pub width: f64,
    pub height: f64,
}

/// What a load or rebuild produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoadOutcome {
    /// At least one mesh attached; `skipped` outlines failed to build
    Built { meshes: usize, skipped: usize },
    /// The document holds no buildable geometry; the group is empty
    Empty,
}

/// Scene state: document, controls and the built group
#[derive(Default)]
pub struct SceneState {
    pub(crate) document: Option<Document>,
    pub(crate) group: Option<Group>,
    pub(crate) controls: Controls,
    /// Monotonically increasing version counter
    pub(crate) version: u64,
    pub(crate) rebuild_count: u64,
    pub(crate) disposed_count: u64,
}

impl SceneState {
    pub fn new(controls: Controls) -> Self {
        Self {
            controls: controls.clamped(),
            ..Self::default()
        }
    }

    /// Current scene version (increments on every mutation)
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of completed mesh rebuilds
    pub fn rebuild_count(&self) -> u64 {
        self.rebuild_count
    }

    /// Number of meshes released by rebuilds so far
    pub fn disposed_count(&self) -> u64 {
        self.disposed_count
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn group(&self) -> Option<&Group> {
        self.group.as_ref()
    }

    pub fn group_mut(&mut self) -> Option<&mut Group> {
        self.group.as_mut()
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    /// A group with at least one mesh exists
    pub fn has_model(&self) -> bool {
        self.group.as_ref().is_some_and(|g| !g.is_empty())
    }

    /// Snapshot for export, `None` when there is nothing to export
    pub fn snapshot(&self) -> Option<GroupSnapshot> {
        self.group
            .as_ref()
            .filter(|g| !g.is_empty())
            .map(Group::snapshot)
    }
}
