//! Mesh validation utilities.
//!
//! `MeshValidator` checks mesh data integrity: stride, in-range indices,
//! unit normals, bounding box, and whether the surface is closed and
//! consistently wound.

use std::collections::HashMap;

use crate::viewport::bounds::Aabb;
use crate::viewport::mesh::{MeshData, VERTEX_STRIDE};

/// Positions are welded on a grid of this resolution before edge checks
const WELD_SCALE: f32 = 1e5;

/// Validator for `MeshData` integrity checks.
pub struct MeshValidator<'a> {
    mesh: &'a MeshData,
}

impl<'a> MeshValidator<'a> {
    pub fn new(mesh: &'a MeshData) -> Self {
        Self { mesh }
    }

    pub fn vertex_count(&self) -> usize {
        self.mesh.vertices.len() / VERTEX_STRIDE
    }

    pub fn triangle_count(&self) -> usize {
        self.mesh.indices.len() / 3
    }

    /// Check that the vertex buffer length is a multiple of the stride.
    pub fn is_stride_valid(&self) -> bool {
        self.mesh.vertices.len() % VERTEX_STRIDE == 0
    }

    pub fn is_index_stride_valid(&self) -> bool {
        self.mesh.indices.len() % 3 == 0
    }

    pub fn are_indices_in_range(&self) -> bool {
        let max_idx = self.vertex_count() as u32;
        self.mesh.indices.iter().all(|&i| i < max_idx)
    }

    /// Check that all vertex normals have unit length (within epsilon).
    pub fn are_normals_normalized(&self, epsilon: f32) -> bool {
        (0..self.vertex_count()).all(|i| (self.mesh.normal(i).length() - 1.0).abs() <= epsilon)
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::from_mesh(self.mesh)
    }

    /// Compute the dimensions (width, height, depth) of the bounding box.
    pub fn dimensions(&self) -> [f32; 3] {
        self.aabb().size().to_array()
    }

    pub fn assert_dimensions_approx(&self, expected: [f32; 3], tolerance: f32) -> bool {
        let dims = self.dimensions();
        dims.iter()
            .zip(expected)
            .all(|(d, e)| (d - e).abs() < tolerance)
    }

    /// Every position lies within `[-limit, limit]` on X and Y (plus tolerance)
    pub fn fits_planar_extent(&self, limit: f32, tolerance: f32) -> bool {
        self.mesh
            .positions()
            .all(|p| p.x.abs() <= limit + tolerance && p.y.abs() <= limit + tolerance)
    }

    /// Directed edges over welded positions, degenerate edges skipped
    fn directed_edges(&self) -> HashMap<([i64; 3], [i64; 3]), usize> {
        let weld = |i: u32| {
            let p = self.mesh.position(i as usize) * WELD_SCALE;
            [p.x.round() as i64, p.y.round() as i64, p.z.round() as i64]
        };
        let mut edges = HashMap::new();
        for tri in self.mesh.indices.chunks_exact(3) {
            let k = [weld(tri[0]), weld(tri[1]), weld(tri[2])];
            for e in 0..3 {
                let (a, b) = (k[e], k[(e + 1) % 3]);
                if a != b {
                    *edges.entry((a, b)).or_insert(0) += 1;
                }
            }
        }
        edges
    }

    /// Every undirected edge is shared by exactly two triangles.
    pub fn is_watertight(&self) -> bool {
        if !self.are_indices_in_range() || self.triangle_count() == 0 {
            return false;
        }
        let directed = self.directed_edges();
        let mut undirected: HashMap<([i64; 3], [i64; 3]), usize> = HashMap::new();
        for (&(a, b), &count) in &directed {
            let key = if a < b { (a, b) } else { (b, a) };
            *undirected.entry(key).or_insert(0) += count;
        }
        undirected.values().all(|&c| c == 2)
    }

    /// Each directed edge appears once and is matched by its reverse.
    pub fn has_consistent_winding(&self) -> bool {
        if !self.are_indices_in_range() {
            return false;
        }
        let directed = self.directed_edges();
        directed
            .iter()
            .all(|(&(a, b), &count)| count == 1 && directed.get(&(b, a)) == Some(&1))
    }

    /// Run all validation checks and return a list of error messages.
    /// An empty list means the mesh is valid.
    pub fn validate_all(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !self.is_stride_valid() {
            errors.push(format!(
                "Vertex buffer length {} is not a multiple of {}",
                self.mesh.vertices.len(),
                VERTEX_STRIDE
            ));
        }

        if !self.is_index_stride_valid() {
            errors.push(format!(
                "Index buffer length {} is not a multiple of 3",
                self.mesh.indices.len()
            ));
        }

        if !self.are_indices_in_range() {
            let max_idx = self.vertex_count() as u32;
            let out_of_range: Vec<_> = self
                .mesh
                .indices
                .iter()
                .filter(|&&i| i >= max_idx)
                .take(5)
                .collect();
            errors.push(format!(
                "Indices out of range (vertex_count={}): {:?}",
                max_idx, out_of_range
            ));
        }

        if !self.mesh.all_finite() {
            errors.push("Vertex data contains non-finite values".to_string());
        }

        if self.vertex_count() > 0 && !self.are_normals_normalized(0.1) {
            errors.push("Some normals are not unit-length (epsilon=0.1)".to_string());
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn simple_triangle() -> MeshData {
        MeshData {
            vertices: vec![
                0.0, 0.0, 0.0, 0.0, 0.0, 1.0, //
                1.0, 0.0, 0.0, 0.0, 0.0, 1.0, //
                0.0, 1.0, 0.0, 0.0, 0.0, 1.0,
            ],
            indices: vec![0, 1, 2],
        }
    }

    /// Outward-wound tetrahedron with per-face vertices
    fn tetrahedron() -> MeshData {
        let p = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        ];
        let faces = [[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]];
        let mut mesh = MeshData::default();
        for f in faces {
            let [a, b, c] = f.map(|i| p[i]);
            let n = (b - a).cross(c - a).normalize();
            let ia = mesh.push_vertex(a, n);
            let ib = mesh.push_vertex(b, n);
            let ic = mesh.push_vertex(c, n);
            mesh.indices.extend_from_slice(&[ia, ib, ic]);
        }
        mesh
    }

    #[test]
    fn test_counts() {
        let mesh = simple_triangle();
        let v = MeshValidator::new(&mesh);
        assert_eq!(v.vertex_count(), 3);
        assert_eq!(v.triangle_count(), 1);
        assert!(v.is_stride_valid());
    }

    #[test]
    fn test_stride_invalid() {
        let bad = MeshData {
            vertices: vec![0.0; 10],
            indices: vec![],
        };
        assert!(!MeshValidator::new(&bad).is_stride_valid());
    }

    #[test]
    fn test_indices_out_of_range() {
        let bad = MeshData {
            vertices: vec![0.0; 6],
            indices: vec![0, 1, 2],
        };
        assert!(!MeshValidator::new(&bad).are_indices_in_range());
    }

    #[test]
    fn test_normals_not_normalized() {
        let bad = MeshData {
            vertices: vec![0.0, 0.0, 0.0, 0.0, 0.0, 5.0],
            indices: vec![0],
        };
        assert!(!MeshValidator::new(&bad).are_normals_normalized(0.01));
    }

    #[test]
    fn test_dimensions() {
        let mesh = simple_triangle();
        let v = MeshValidator::new(&mesh);
        assert!(v.assert_dimensions_approx([1.0, 1.0, 0.0], 0.01));
        assert!(!v.assert_dimensions_approx([2.0, 1.0, 0.0], 0.01));
        assert!(v.fits_planar_extent(1.0, 0.0));
        assert!(!v.fits_planar_extent(0.5, 0.0));
    }

    #[test]
    fn test_single_triangle_not_watertight() {
        let mesh = simple_triangle();
        let v = MeshValidator::new(&mesh);
        assert!(!v.is_watertight());
        assert!(!v.has_consistent_winding());
    }

    #[test]
    fn test_tetrahedron_closed_and_consistent() {
        let mesh = tetrahedron();
        let v = MeshValidator::new(&mesh);
        assert!(v.validate_all().is_empty());
        assert!(v.is_watertight());
        assert!(v.has_consistent_winding());
    }

    #[test]
    fn test_flipped_face_breaks_winding() {
        let mut mesh = tetrahedron();
        mesh.indices.swap(0, 1);
        let v = MeshValidator::new(&mesh);
        assert!(v.is_watertight());
        assert!(!v.has_consistent_winding());
    }

    #[test]
    fn test_validate_all_catches_bad_stride_and_nan() {
        let mut bad = simple_triangle();
        bad.vertices[0] = f32::NAN;
        bad.vertices.push(0.0);
        let errors = MeshValidator::new(&bad).validate_all();
        assert!(errors.iter().any(|e| e.contains("multiple of 6")));
        assert!(errors.iter().any(|e| e.contains("non-finite")));
    }
}
