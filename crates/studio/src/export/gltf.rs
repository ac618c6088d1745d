//! glTF 2.0 serialization of a group snapshot.
//!
//! The scene is one root node `SVGModel` carrying the group rotation, with
//! one child node, mesh and PBR material per solid.

use base64::Engine;
use glam::DQuat;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::instrument;

use crate::errors::StudioError;
use crate::state::scene::GroupSnapshot;

/// GLB magic number: "glTF"
const GLB_MAGIC: u32 = 0x46546C67;
/// GLB version 2
const GLB_VERSION: u32 = 2;
/// JSON chunk type
const CHUNK_TYPE_JSON: u32 = 0x4E4F534A;
/// BIN chunk type
const CHUNK_TYPE_BIN: u32 = 0x004E4942;

/// glTF component types
const FLOAT: u32 = 5126;
const UNSIGNED_INT: u32 = 5125;

/// glTF buffer view targets
const ARRAY_BUFFER: u32 = 34962;
const ELEMENT_ARRAY_BUFFER: u32 = 34963;

pub const ROOT_NODE_NAME: &str = "SVGModel";
const GENERATOR: &str = concat!("svg3d-studio ", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AssetFormat {
    /// JSON document with the buffer embedded as a data URI
    #[default]
    Gltf,
    /// Binary container
    Glb,
}

impl AssetFormat {
    pub fn file_name(&self) -> &'static str {
        match self {
            AssetFormat::Gltf => "svg-model.gltf",
            AssetFormat::Glb => "svg-model.glb",
        }
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            AssetFormat::Gltf => "model/gltf+json",
            AssetFormat::Glb => "model/gltf-binary",
        }
    }
}

/// Serialize a snapshot in the requested format
#[instrument(skip(snapshot), fields(meshes = snapshot.meshes.len()))]
pub fn serialize_group(
    snapshot: &GroupSnapshot,
    format: AssetFormat,
) -> Result<Vec<u8>, StudioError> {
    match format {
        AssetFormat::Gltf => build_gltf(snapshot),
        AssetFormat::Glb => build_glb(snapshot),
    }
}

/// glTF JSON with the binary buffer inlined as base64
pub fn build_gltf(snapshot: &GroupSnapshot) -> Result<Vec<u8>, StudioError> {
    let (mut doc, bin_data) = build_document(snapshot)?;
    let uri = format!(
        "data:application/octet-stream;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(&bin_data)
    );
    doc["buffers"] = json!([{
        "byteLength": bin_data.len(),
        "uri": uri
    }]);
    serde_json::to_vec_pretty(&doc).map_err(|e| StudioError::ExportFailure(e.to_string()))
}

/// Build a complete GLB (binary glTF) file
pub fn build_glb(snapshot: &GroupSnapshot) -> Result<Vec<u8>, StudioError> {
    let (doc, mut bin_data) = build_document(snapshot)?;

    let mut json_bytes =
        serde_json::to_vec(&doc).map_err(|e| StudioError::ExportFailure(e.to_string()))?;

    // Pad JSON to 4-byte alignment with spaces (per GLB spec)
    while json_bytes.len() % 4 != 0 {
        json_bytes.push(b' ');
    }

    // Pad BIN to 4-byte alignment with zeros (per GLB spec)
    while bin_data.len() % 4 != 0 {
        bin_data.push(0);
    }

    let too_large = || StudioError::ExportFailure("model exceeds the 4 GiB GLB limit".to_string());
    let json_chunk_length = u32::try_from(json_bytes.len()).map_err(|_| too_large())?;
    let bin_chunk_length = u32::try_from(bin_data.len()).map_err(|_| too_large())?;

    let total_length = 12u32 // header
        .checked_add(8 + json_chunk_length) // JSON chunk header + data
        .and_then(|n| n.checked_add(8 + bin_chunk_length)) // BIN chunk header + data
        .ok_or_else(too_large)?;

    let mut glb = Vec::with_capacity(total_length as usize);

    // Header
    glb.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    glb.extend_from_slice(&GLB_VERSION.to_le_bytes());
    glb.extend_from_slice(&total_length.to_le_bytes());

    // JSON chunk
    glb.extend_from_slice(&json_chunk_length.to_le_bytes());
    glb.extend_from_slice(&CHUNK_TYPE_JSON.to_le_bytes());
    glb.extend_from_slice(&json_bytes);

    // BIN chunk
    glb.extend_from_slice(&bin_chunk_length.to_le_bytes());
    glb.extend_from_slice(&CHUNK_TYPE_BIN.to_le_bytes());
    glb.extend_from_slice(&bin_data);

    Ok(glb)
}

struct MeshMeta {
    name: String,
    vertex_count: usize,
    index_count: usize,
    pos_offset: usize,
    pos_length: usize,
    norm_offset: usize,
    norm_length: usize,
    idx_offset: usize,
    idx_length: usize,
    pos_min: [f32; 3],
    pos_max: [f32; 3],
}

/// glTF document (without `buffers`) plus the packed binary buffer
fn build_document(snapshot: &GroupSnapshot) -> Result<(Value, Vec<u8>), StudioError> {
    // ── Phase 1: Build binary buffer ─────────────────────────
    let mut bin_data: Vec<u8> = Vec::new();
    let mut metas: Vec<MeshMeta> = Vec::new();

    for mesh in &snapshot.meshes {
        let geometry = &mesh.geometry;
        let vertex_count = geometry.vertex_count();
        let index_count = geometry.indices.len();
        if vertex_count == 0 || index_count == 0 {
            continue;
        }
        if !geometry.all_finite() {
            return Err(StudioError::ExportFailure(format!(
                "mesh '{}' contains non-finite vertex data",
                mesh.name
            )));
        }
        if geometry.indices.iter().any(|&i| i as usize >= vertex_count) {
            return Err(StudioError::ExportFailure(format!(
                "mesh '{}' has indices past its {} vertices",
                mesh.name, vertex_count
            )));
        }

        let mut positions: Vec<f32> = Vec::with_capacity(vertex_count * 3);
        let mut normals: Vec<f32> = Vec::with_capacity(vertex_count * 3);
        let mut pos_min = [f32::MAX; 3];
        let mut pos_max = [f32::MIN; 3];

        for v in 0..vertex_count {
            let p = geometry.position(v).to_array();
            positions.extend_from_slice(&p);
            normals.extend_from_slice(&geometry.normal(v).to_array());
            for axis in 0..3 {
                pos_min[axis] = pos_min[axis].min(p[axis]);
                pos_max[axis] = pos_max[axis].max(p[axis]);
            }
        }

        let pos_offset = bin_data.len();
        bin_data.extend_from_slice(&floats_to_bytes(&positions));
        let pos_length = bin_data.len() - pos_offset;

        let norm_offset = bin_data.len();
        bin_data.extend_from_slice(&floats_to_bytes(&normals));
        let norm_length = bin_data.len() - norm_offset;

        let idx_offset = bin_data.len();
        bin_data.extend_from_slice(&u32s_to_bytes(&geometry.indices));
        let idx_length = bin_data.len() - idx_offset;

        metas.push(MeshMeta {
            name: mesh.name.clone(),
            vertex_count,
            index_count,
            pos_offset,
            pos_length,
            norm_offset,
            norm_length,
            idx_offset,
            idx_length,
            pos_min,
            pos_max,
        });
    }

    if metas.is_empty() {
        return Err(StudioError::NoModelToExport);
    }

    // ── Phase 2: Build glTF JSON ─────────────────────────────
    // 3 bufferViews and accessors per mesh (positions, normals, indices)
    let mut accessors = Vec::new();
    let mut buffer_views = Vec::new();
    let mut gltf_meshes = Vec::new();
    let mut materials = Vec::new();
    let mut nodes = vec![Value::Null]; // root, filled below
    let mut children: Vec<usize> = Vec::new();

    let with_geometry = snapshot
        .meshes
        .iter()
        .filter(|m| m.geometry.vertex_count() > 0 && !m.geometry.indices.is_empty());

    for (i, (meta, mesh)) in metas.iter().zip(with_geometry).enumerate() {
        let base = i * 3;

        buffer_views.push(json!({
            "buffer": 0,
            "byteOffset": meta.pos_offset,
            "byteLength": meta.pos_length,
            "target": ARRAY_BUFFER
        }));
        buffer_views.push(json!({
            "buffer": 0,
            "byteOffset": meta.norm_offset,
            "byteLength": meta.norm_length,
            "target": ARRAY_BUFFER
        }));
        buffer_views.push(json!({
            "buffer": 0,
            "byteOffset": meta.idx_offset,
            "byteLength": meta.idx_length,
            "target": ELEMENT_ARRAY_BUFFER
        }));

        accessors.push(json!({
            "bufferView": base,
            "byteOffset": 0,
            "componentType": FLOAT,
            "count": meta.vertex_count,
            "type": "VEC3",
            "min": meta.pos_min,
            "max": meta.pos_max
        }));
        accessors.push(json!({
            "bufferView": base + 1,
            "byteOffset": 0,
            "componentType": FLOAT,
            "count": meta.vertex_count,
            "type": "VEC3"
        }));
        accessors.push(json!({
            "bufferView": base + 2,
            "byteOffset": 0,
            "componentType": UNSIGNED_INT,
            "count": meta.index_count,
            "type": "SCALAR"
        }));

        let m = &mesh.material;
        let [r, g, b] = m.color.to_linear_f32();
        let alpha_mode = if m.is_blended() { "BLEND" } else { "OPAQUE" };
        materials.push(json!({
            "name": format!("{}-material", meta.name),
            "pbrMetallicRoughness": {
                "baseColorFactor": [r, g, b, m.opacity],
                "metallicFactor": m.metalness,
                "roughnessFactor": m.roughness
            },
            "alphaMode": alpha_mode,
            "doubleSided": m.double_sided
        }));

        gltf_meshes.push(json!({
            "name": meta.name,
            "primitives": [{
                "attributes": {
                    "POSITION": base,
                    "NORMAL": base + 1
                },
                "indices": base + 2,
                "material": i
            }]
        }));

        children.push(nodes.len());
        nodes.push(json!({
            "name": meta.name,
            "mesh": i
        }));
    }

    let q = DQuat::from_rotation_y(snapshot.rotation_y);
    nodes[0] = json!({
        "name": ROOT_NODE_NAME,
        "rotation": [q.x as f32, q.y as f32, q.z as f32, q.w as f32],
        "children": children
    });

    let doc = json!({
        "asset": {
            "version": "2.0",
            "generator": GENERATOR
        },
        "scene": 0,
        "scenes": [{
            "name": "Scene",
            "nodes": [0]
        }],
        "nodes": nodes,
        "meshes": gltf_meshes,
        "materials": materials,
        "accessors": accessors,
        "bufferViews": buffer_views,
        "buffers": [{
            "byteLength": bin_data.len()
        }]
    });

    Ok((doc, bin_data))
}

fn floats_to_bytes(data: &[f32]) -> Vec<u8> {
    data.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn u32s_to_bytes(data: &[u32]) -> Vec<u8> {
    data.iter().flat_map(|v| v.to_le_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::state::scene::SceneState;
    use shared::Controls;

    fn snapshot(svg: &str) -> GroupSnapshot {
        let mut scene = SceneState::new(Controls::default());
        scene.load_svg(svg).unwrap();
        scene.snapshot().unwrap()
    }

    fn parse_gltf(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[test]
    fn test_gltf_structure() {
        let doc = parse_gltf(&build_gltf(&snapshot(fixtures::TWO_SHAPES_SVG)).unwrap());
        assert_eq!(doc["asset"]["version"], "2.0");
        assert_eq!(doc["nodes"][0]["name"], ROOT_NODE_NAME);
        assert_eq!(doc["nodes"][0]["children"], json!([1, 2]));
        assert_eq!(doc["meshes"].as_array().unwrap().len(), 2);
        assert_eq!(doc["materials"].as_array().unwrap().len(), 2);
        assert_eq!(doc["accessors"].as_array().unwrap().len(), 6);
    }

    #[test]
    fn test_gltf_embeds_buffer() {
        let doc = parse_gltf(&build_gltf(&snapshot(fixtures::SQUARE_SVG)).unwrap());
        let buffer = &doc["buffers"][0];
        let uri = buffer["uri"].as_str().unwrap();
        let payload = uri
            .strip_prefix("data:application/octet-stream;base64,")
            .unwrap();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .unwrap();
        assert_eq!(bytes.len() as u64, buffer["byteLength"].as_u64().unwrap());
    }

    #[test]
    fn test_material_fields() {
        // default controls: opacity 0.6 blends
        let doc = parse_gltf(&build_gltf(&snapshot(fixtures::SQUARE_SVG)).unwrap());
        let mat = &doc["materials"][0];
        assert_eq!(mat["alphaMode"], "BLEND");
        assert_eq!(mat["doubleSided"], true);
        let base = mat["pbrMetallicRoughness"]["baseColorFactor"].as_array().unwrap();
        assert!((base[3].as_f64().unwrap() - 0.6).abs() < 1e-6);
        let metallic = mat["pbrMetallicRoughness"]["metallicFactor"].as_f64().unwrap();
        assert!((metallic - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_rotation_quaternion() {
        let mut snap = snapshot(fixtures::SQUARE_SVG);
        snap.rotation_y = std::f64::consts::PI;
        let doc = parse_gltf(&build_gltf(&snap).unwrap());
        let rot = doc["nodes"][0]["rotation"].as_array().unwrap();
        assert!((rot[1].as_f64().unwrap() - 1.0).abs() < 1e-6);
        assert!(rot[3].as_f64().unwrap().abs() < 1e-6);
    }

    #[test]
    fn test_position_bounds_recorded() {
        let doc = parse_gltf(&build_gltf(&snapshot(fixtures::SQUARE_SVG)).unwrap());
        let max = doc["accessors"][0]["max"].as_array().unwrap();
        assert!((max[0].as_f64().unwrap() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_glb_header_and_chunks() {
        let glb = build_glb(&snapshot(fixtures::RING_SVG)).unwrap();
        let word = |i: usize| u32::from_le_bytes([glb[i], glb[i + 1], glb[i + 2], glb[i + 3]]);
        assert_eq!(word(0), GLB_MAGIC);
        assert_eq!(word(4), 2);
        assert_eq!(word(8) as usize, glb.len());
        let json_len = word(12) as usize;
        assert_eq!(json_len % 4, 0);
        assert_eq!(word(16), CHUNK_TYPE_JSON);
        let doc: Value = serde_json::from_slice(&glb[20..20 + json_len]).unwrap();
        assert!(doc["buffers"][0].get("uri").is_none());
        assert_eq!(word(20 + json_len + 4), CHUNK_TYPE_BIN);
    }

    #[test]
    fn test_non_finite_geometry_fails() {
        let mut snap = snapshot(fixtures::SQUARE_SVG);
        let mut geometry = (*snap.meshes[0].geometry).clone();
        geometry.vertices[0] = f32::INFINITY;
        snap.meshes[0].geometry = std::sync::Arc::new(geometry);
        assert!(matches!(
            serialize_group(&snap, AssetFormat::Gltf),
            Err(StudioError::ExportFailure(_))
        ));
    }

    #[test]
    fn test_empty_snapshot_is_no_model() {
        let snap = GroupSnapshot {
            meshes: Vec::new(),
            rotation_y: 0.0,
        };
        assert!(matches!(build_glb(&snap), Err(StudioError::NoModelToExport)));
    }

    #[test]
    fn test_format_names() {
        assert_eq!(AssetFormat::Gltf.file_name(), "svg-model.gltf");
        assert_eq!(AssetFormat::Glb.file_name(), "svg-model.glb");
        assert_eq!(AssetFormat::default(), AssetFormat::Gltf);
    }
}
