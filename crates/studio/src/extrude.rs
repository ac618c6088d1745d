use std::f64::consts::FRAC_PI_2;

use glam::{DVec2, Vec3};
use shared::ExtrusionParams;

use crate::normalize::NormalizationFrame;
use crate::vector::Outline;
use crate::viewport::mesh::MeshData;

/// Longest miter vector relative to the inset distance
const MITER_LIMIT: f64 = 4.0;

/// Largest inset as a fraction of the outline's smaller side
const MAX_INSET_FRACTION: f64 = 0.25;

/// One ring of vertices along the extrusion axis
#[derive(Debug, Clone, Copy, PartialEq)]
struct Layer {
    /// Position along the extrusion axis before centring
    z: f64,
    /// Inward planar offset in document units
    inset: f64,
}

// ── Extrude ─────────────────────────────────────────────────

/// Extrude one outline into a closed, beveled solid.
///
/// The sweep runs from `-bevel_thickness` to `depth + bevel_thickness`;
/// it is then moved by `(-center_x, -center_y, -depth / 2)` and scaled by
/// `(scale, -scale, 1)`. Faces wind counter-clockwise seen from outside.
pub fn extrude_outline(
    outline: &Outline,
    frame: &NormalizationFrame,
    params: &ExtrusionParams,
) -> Result<MeshData, String> {
    if outline.contour.len() < 3 {
        return Err("outline contour has fewer than 3 points".to_string());
    }
    let rings: Vec<&[DVec2]> = std::iter::once(outline.contour.as_slice())
        .chain(
            outline
                .holes
                .iter()
                .map(|h| h.as_slice())
                .filter(|h| h.len() >= 3),
        )
        .collect();

    let cap_triangles = triangulate_cap(&rings)?;
    if cap_triangles.is_empty() {
        return Err("cap triangulation produced no triangles".to_string());
    }

    let depth = params.depth as f64;
    let max_inset = max_inset(outline.contour.as_slice());
    let layers = bevel_layers(params, max_inset);
    let miters: Vec<Vec<DVec2>> = rings.iter().map(|r| miter_vectors(r)).collect();

    // Planar positions per layer, all rings concatenated in cap order
    let layer_points: Vec<Vec<DVec2>> = layers
        .iter()
        .map(|layer| {
            rings
                .iter()
                .zip(&miters)
                .flat_map(|(ring, m)| {
                    ring.iter()
                        .zip(m)
                        .map(move |(p, miter)| *p - *miter * layer.inset)
                })
                .collect()
        })
        .collect();

    let to_world = |p: DVec2, z: f64| -> Vec3 {
        let planar = frame.apply(p);
        Vec3::new(planar.x as f32, planar.y as f32, (z - depth * 0.5) as f32)
    };

    let mut mesh = MeshData::default();

    // Front cap faces -Z, back cap +Z. The Y mirror flips handedness, so a
    // triangle counter-clockwise in document space is emitted reversed.
    let last = layers.len() - 1;
    for (layer_idx, normal, reversed) in [(0, Vec3::NEG_Z, false), (last, Vec3::Z, true)] {
        let points = &layer_points[layer_idx];
        let z = layers[layer_idx].z;
        let base = mesh.vertex_count() as u32;
        for p in points {
            mesh.push_vertex(to_world(*p, z), normal);
        }
        for tri in &cap_triangles {
            let [a, b, c] = tri.map(|i| base + i as u32);
            if reversed {
                mesh.indices.extend_from_slice(&[a, c, b]);
            } else {
                mesh.indices.extend_from_slice(&[a, b, c]);
            }
        }
    }

    // Side walls between consecutive layers
    let mut ring_start = 0;
    for ring in &rings {
        let n = ring.len();
        for pair in 0..last {
            let (lower, upper) = (&layer_points[pair], &layer_points[pair + 1]);
            let (z0, z1) = (layers[pair].z, layers[pair + 1].z);
            for i in 0..n {
                let j = (i + 1) % n;
                let a = to_world(lower[ring_start + i], z0);
                let b = to_world(lower[ring_start + j], z0);
                let c = to_world(upper[ring_start + j], z1);
                let d = to_world(upper[ring_start + i], z1);
                push_quad(&mut mesh, [a, b, c, d]);
            }
        }
        ring_start += n;
    }

    if mesh.is_empty() {
        return Err("extrusion produced no triangles".to_string());
    }
    Ok(mesh)
}

/// Quad `a b c d` counter-clockwise seen from outside in document space,
/// emitted mirrored with one flat normal
fn push_quad(mesh: &mut MeshData, [a, b, c, d]: [Vec3; 4]) {
    let normal = (c - a).cross(b - a).normalize_or_zero();
    if normal == Vec3::ZERO {
        return;
    }
    let base = mesh.vertex_count() as u32;
    for p in [a, b, c, d] {
        mesh.push_vertex(p, normal);
    }
    mesh.indices
        .extend_from_slice(&[base, base + 2, base + 1, base, base + 3, base + 2]);
}

/// Layer sequence: front bevel rings, body rings, back bevel rings.
/// `z` increases strictly along the sequence.
fn bevel_layers(params: &ExtrusionParams, max_inset: f64) -> Vec<Layer> {
    let depth = params.depth as f64;
    let bevel_thickness = params.bevel_thickness as f64;
    let bevel_size = (params.bevel_size as f64).min(max_inset);
    let segments = if bevel_thickness > 0.0 {
        params.bevel_segments
    } else {
        0
    };
    let steps = params.steps.max(1);

    let bevel_ring = |b: u32| {
        let t = b as f64 / segments as f64 * FRAC_PI_2;
        (bevel_thickness * t.cos(), bevel_size * (1.0 - t.sin()))
    };

    let mut layers = Vec::with_capacity((2 * segments + steps + 1) as usize);
    for b in 0..segments {
        let (dz, inset) = bevel_ring(b);
        layers.push(Layer { z: -dz, inset });
    }
    for s in 0..=steps {
        layers.push(Layer {
            z: depth * s as f64 / steps as f64,
            inset: 0.0,
        });
    }
    for b in (0..segments).rev() {
        let (dz, inset) = bevel_ring(b);
        layers.push(Layer { z: depth + dz, inset });
    }
    layers
}

fn max_inset(contour: &[DVec2]) -> f64 {
    let (min, max) = contour.iter().fold(
        (DVec2::splat(f64::MAX), DVec2::splat(f64::MIN)),
        |(lo, hi), p| (lo.min(*p), hi.max(*p)),
    );
    let size = max - min;
    size.x.min(size.y).max(0.0) * MAX_INSET_FRACTION
}

/// Per-vertex offset directions pointing away from the solid.
///
/// Uses the right-hand edge normal, which points outward for a
/// counter-clockwise contour and into the hole for a clockwise hole.
fn miter_vectors(ring: &[DVec2]) -> Vec<DVec2> {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let prev = ring[(i + n - 1) % n];
            let cur = ring[i];
            let next = ring[(i + 1) % n];
            let e1 = (cur - prev).normalize_or_zero();
            let e2 = (next - cur).normalize_or_zero();
            let n1 = DVec2::new(e1.y, -e1.x);
            let n2 = DVec2::new(e2.y, -e2.x);
            let denom = 1.0 + n1.dot(n2);
            if denom < 1e-6 {
                return n1;
            }
            let miter = (n1 + n2) / denom;
            let len = miter.length();
            if len > MITER_LIMIT {
                miter * (MITER_LIMIT / len)
            } else {
                miter
            }
        })
        .collect()
}

/// Triangulate contour + holes; triangles are counter-clockwise and index
/// into the concatenation of all rings.
fn triangulate_cap(rings: &[&[DVec2]]) -> Result<Vec<[usize; 3]>, String> {
    let mut coords: Vec<f64> = Vec::new();
    let mut hole_indices: Vec<usize> = Vec::new();
    for (i, ring) in rings.iter().enumerate() {
        if i > 0 {
            hole_indices.push(coords.len() / 2);
        }
        for p in ring.iter() {
            coords.push(p.x);
            coords.push(p.y);
        }
    }

    let indices = earcutr::earcut(&coords, &hole_indices, 2)
        .map_err(|e| format!("cap triangulation failed: {:?}", e))?;

    let point = |i: usize| DVec2::new(coords[2 * i], coords[2 * i + 1]);
    Ok(indices
        .chunks_exact(3)
        .filter_map(|tri| {
            let (a, b, c) = (tri[0], tri[1], tri[2]);
            let area = (point(b) - point(a)).perp_dot(point(c) - point(a));
            if area > 0.0 {
                Some([a, b, c])
            } else if area < 0.0 {
                Some([a, c, b])
            } else {
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{square_frame_outline, square_outline};
    use crate::validation::MeshValidator;

    fn unit_frame(outline: &Outline) -> NormalizationFrame {
        NormalizationFrame::compute(std::slice::from_ref(outline))
    }

    #[test]
    fn test_layers_monotonic_and_symmetric() {
        let params = ExtrusionParams::from_depth(0.2);
        let layers = bevel_layers(&params, f64::MAX);
        assert_eq!(layers.len(), 2 + 3 + 2);
        for w in layers.windows(2) {
            assert!(w[1].z > w[0].z);
        }
        assert!((layers[0].z + 0.02).abs() < 1e-6);
        assert!((layers[6].z - 0.22).abs() < 1e-6);
        assert!((layers[0].inset - 0.02).abs() < 1e-6);
        assert_eq!(layers[3].inset, 0.0);
        assert_eq!(layers[0].inset, layers[6].inset);
    }

    #[test]
    fn test_inset_clamped_for_small_outlines() {
        let params = ExtrusionParams::from_depth(2.0);
        let layers = bevel_layers(&params, 0.05);
        assert!(layers.iter().all(|l| l.inset <= 0.05));
    }

    #[test]
    fn test_square_solid_is_closed_and_centered() {
        let outline = square_outline(10.0, 10.0, 80.0);
        let params = ExtrusionParams::from_depth(0.2);
        let mesh = extrude_outline(&outline, &unit_frame(&outline), &params).unwrap();
        let v = MeshValidator::new(&mesh);
        assert!(v.validate_all().is_empty(), "{:?}", v.validate_all());
        assert!(v.is_watertight());
        assert!(v.has_consistent_winding());

        let aabb = v.aabb();
        assert!((aabb.min.x + 1.0).abs() < 1e-5);
        assert!((aabb.max.x - 1.0).abs() < 1e-5);
        assert!((aabb.min.z + 0.12).abs() < 1e-5);
        assert!((aabb.max.z - 0.12).abs() < 1e-5);
    }

    #[test]
    fn test_frame_with_hole_is_closed() {
        let outline = square_frame_outline(10.0, 4.0);
        let mesh = extrude_outline(
            &outline,
            &unit_frame(&outline),
            &ExtrusionParams::from_depth(0.5),
        )
        .unwrap();
        let v = MeshValidator::new(&mesh);
        assert!(v.is_watertight());
        assert!(v.has_consistent_winding());
        // centre of the hole stays empty on both caps
        assert!(mesh.positions().all(|p| p.x.abs() > 0.3 || p.y.abs() > 0.3));
    }

    #[test]
    fn test_outward_normals() {
        let outline = square_outline(0.0, 0.0, 2.0);
        let mesh = extrude_outline(
            &outline,
            &unit_frame(&outline),
            &ExtrusionParams::from_depth(1.0),
        )
        .unwrap();
        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| mesh.position(i as usize));
            let centroid = (a + b + c) / 3.0;
            let geometric = (b - a).cross(c - a).normalize();
            assert!(
                geometric.dot(centroid) > 0.0,
                "triangle at {:?} faces inward",
                centroid
            );
            let stored = mesh.normal(tri[0] as usize);
            assert!(stored.dot(geometric) > 0.99);
        }
    }

    #[test]
    fn test_y_axis_flipped() {
        // Document top (small y) ends up at +Y
        let outline = Outline {
            contour: vec![
                DVec2::new(0.0, 0.0),
                DVec2::new(10.0, 0.0),
                DVec2::new(0.0, 10.0),
            ],
            holes: Vec::new(),
            closed: true,
        };
        let frame = unit_frame(&outline);
        let mesh = extrude_outline(&outline, &frame, &ExtrusionParams::from_depth(0.2)).unwrap();
        let top_right = mesh
            .positions()
            .filter(|p| p.x > 0.5)
            .map(|p| p.y)
            .fold(f32::MIN, f32::max);
        assert!(top_right > 0.5);
    }

    #[test]
    fn test_missing_contour_rejected() {
        let outline = Outline {
            contour: vec![DVec2::ZERO, DVec2::X],
            holes: Vec::new(),
            closed: true,
        };
        let frame = NormalizationFrame::default();
        assert!(extrude_outline(&outline, &frame, &ExtrusionParams::from_depth(0.2)).is_err());
    }
}
