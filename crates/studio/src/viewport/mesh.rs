use glam::Vec3;

/// Floats per vertex: position(3) + normal(3)
pub const VERTEX_STRIDE: usize = 6;

/// CPU-side mesh data: interleaved [pos.x, pos.y, pos.z, norm.x, norm.y, norm.z]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / VERTEX_STRIDE
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn position(&self, index: usize) -> Vec3 {
        let base = index * VERTEX_STRIDE;
        Vec3::from_slice(&self.vertices[base..base + 3])
    }

    pub fn normal(&self, index: usize) -> Vec3 {
        let base = index * VERTEX_STRIDE + 3;
        Vec3::from_slice(&self.vertices[base..base + 3])
    }

    /// Append a vertex, returning its index
    pub fn push_vertex(&mut self, position: Vec3, normal: Vec3) -> u32 {
        let index = self.vertex_count() as u32;
        self.vertices.extend_from_slice(&[
            position.x, position.y, position.z, normal.x, normal.y, normal.z,
        ]);
        index
    }

    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.vertices
            .chunks_exact(VERTEX_STRIDE)
            .map(|v| Vec3::new(v[0], v[1], v[2]))
    }

    pub fn all_finite(&self) -> bool {
        self.vertices.iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_vertex_layout() {
        let mut mesh = MeshData::default();
        let a = mesh.push_vertex(Vec3::new(1.0, 2.0, 3.0), Vec3::Z);
        let b = mesh.push_vertex(Vec3::ZERO, Vec3::NEG_Z);
        assert_eq!((a, b), (0, 1));
        assert_eq!(mesh.vertex_count(), 2);
        assert_eq!(mesh.position(0), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(mesh.normal(1), Vec3::NEG_Z);
        assert!(mesh.is_empty());
    }

    #[test]
    fn test_all_finite() {
        let mut mesh = MeshData::default();
        mesh.push_vertex(Vec3::ONE, Vec3::Z);
        assert!(mesh.all_finite());
        mesh.vertices[0] = f32::NAN;
        assert!(!mesh.all_finite());
    }
}
