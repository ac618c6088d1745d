//! SVG markup to planar outlines.
//!
//! Every drawable path (text is converted to its glyph outlines) is
//! flattened in document coordinates with its full transform applied.
//! Curves become polylines whose deviation is at most
//! [`FLATTEN_TOLERANCE`] of the document's larger bounding-box side, so
//! the result does not depend on the document's units. Open sub-paths
//! are closed implicitly. Rings of the same path element are nested into
//! contours with holes.

pub mod rings;

use glam::DVec2;
use kurbo::{Affine, BezPath, PathEl, Point, Rect, Shape};
use tracing::{debug, instrument, warn};

use crate::errors::StudioError;
use rings::{clean_ring, nest_rings, Ring};

/// Maximum distance between a curve and its flattened polyline, as a
/// fraction of the larger side of the document's geometry bounds
pub const FLATTEN_TOLERANCE: f64 = 1.0e-3;

/// Floor for the absolute tolerance of degenerate documents
const MIN_FLATTEN_TOLERANCE: f64 = 1.0e-9;

/// A closed planar contour plus the holes cut into it
#[derive(Debug, Clone, PartialEq)]
pub struct Outline {
    /// Counter-clockwise in the document's coordinate system
    pub contour: Vec<DVec2>,
    /// Clockwise, each strictly inside `contour`
    pub holes: Vec<Vec<DVec2>>,
    /// Whether the source sub-path carried an explicit close
    pub closed: bool,
}

impl Outline {
    /// Contour points followed by every hole's points
    pub fn points(&self) -> impl Iterator<Item = &DVec2> {
        self.contour.iter().chain(self.holes.iter().flatten())
    }
}

/// Result of parsing one document
#[derive(Debug, Clone, Default)]
pub struct ParsedDocument {
    pub outlines: Vec<Outline>,
    /// Document viewport size
    pub width: f64,
    pub height: f64,
}

impl ParsedDocument {
    pub fn is_empty(&self) -> bool {
        self.outlines.is_empty()
    }
}

/// Parse SVG markup into outlines.
///
/// Malformed markup is an `InvalidInputFormat` error. A valid document
/// with no drawable geometry returns an empty outline list.
#[instrument(skip_all, fields(bytes = text.len()))]
pub fn parse_document(text: &str) -> Result<ParsedDocument, StudioError> {
    let opt = usvg::Options::default();
    let tree = usvg::Tree::from_str(text, &opt)
        .map_err(|e| StudioError::InvalidInputFormat(format!("Failed to parse SVG: {}", e)))?;

    let mut paths = Vec::new();
    collect_group(tree.root(), &mut paths);

    let tolerance = flatten_tolerance(&paths);
    let outlines: Vec<Outline> = paths
        .iter()
        .flat_map(|path| path_outlines(path, tolerance))
        .collect();

    debug!(outlines = outlines.len(), tolerance, "parsed vector document");

    Ok(ParsedDocument {
        outlines,
        width: tree.size().width() as f64,
        height: tree.size().height() as f64,
    })
}

/// A visible path in document coordinates
struct DocumentPath {
    id: String,
    bez: BezPath,
}

fn collect_group(group: &usvg::Group, paths: &mut Vec<DocumentPath>) {
    for child in group.children() {
        match child {
            usvg::Node::Group(g) => collect_group(g, paths),
            usvg::Node::Path(path) => {
                if path.is_visible() {
                    let mut bez = to_bez_path(path.data());
                    bez.apply_affine(to_affine(path.abs_transform()));
                    paths.push(DocumentPath {
                        id: path.id().to_string(),
                        bez,
                    });
                }
            }
            usvg::Node::Text(text) => collect_group(text.flattened(), paths),
            usvg::Node::Image(_) => {
                debug!("skipping embedded raster image");
            }
        }
    }
}

/// Absolute flattening tolerance for this set of paths
fn flatten_tolerance(paths: &[DocumentPath]) -> f64 {
    let bounds = paths
        .iter()
        .map(|p| p.bez.bounding_box())
        .reduce(|a, b| a.union(b))
        .unwrap_or(Rect::ZERO);
    let extent = bounds.width().max(bounds.height());
    (extent * FLATTEN_TOLERANCE).max(MIN_FLATTEN_TOLERANCE)
}

fn path_outlines(path: &DocumentPath, tolerance: f64) -> Vec<Outline> {
    let rings: Vec<Ring> = flatten_rings(&path.bez, tolerance)
        .into_iter()
        .filter_map(|ring| {
            let cleaned = clean_ring(ring);
            if cleaned.is_none() {
                debug!(path = %path.id, "dropping degenerate sub-path");
            }
            cleaned
        })
        .collect();

    if rings.is_empty() {
        if !path.id.is_empty() {
            warn!(path = %path.id, "path produced no usable geometry");
        }
        return Vec::new();
    }

    nest_rings(rings)
}

fn to_bez_path(data: &usvg::tiny_skia_path::Path) -> BezPath {
    use usvg::tiny_skia_path::PathSegment;

    let pt = |p: usvg::tiny_skia_path::Point| Point::new(p.x as f64, p.y as f64);
    let mut bez = BezPath::new();
    for seg in data.segments() {
        match seg {
            PathSegment::MoveTo(p) => bez.move_to(pt(p)),
            PathSegment::LineTo(p) => bez.line_to(pt(p)),
            PathSegment::QuadTo(p1, p2) => bez.quad_to(pt(p1), pt(p2)),
            PathSegment::CubicTo(p1, p2, p3) => bez.curve_to(pt(p1), pt(p2), pt(p3)),
            PathSegment::Close => bez.close_path(),
        }
    }
    bez
}

fn to_affine(ts: usvg::Transform) -> Affine {
    Affine::new([
        ts.sx as f64,
        ts.ky as f64,
        ts.kx as f64,
        ts.sy as f64,
        ts.tx as f64,
        ts.ty as f64,
    ])
}

/// Split a path into flattened sub-paths
fn flatten_rings(bez: &BezPath, tolerance: f64) -> Vec<Ring> {
    let mut rings = Vec::new();
    let mut current: Vec<DVec2> = Vec::new();

    fn finish(rings: &mut Vec<Ring>, current: &mut Vec<DVec2>, closed: bool) {
        if !current.is_empty() {
            rings.push(Ring {
                points: std::mem::take(current),
                closed,
            });
        }
    }

    bez.flatten(tolerance, |el| match el {
        PathEl::MoveTo(p) => {
            finish(&mut rings, &mut current, false);
            current.push(DVec2::new(p.x, p.y));
        }
        PathEl::LineTo(p) => current.push(DVec2::new(p.x, p.y)),
        PathEl::ClosePath => finish(&mut rings, &mut current, true),
        // flatten only emits move, line and close
        PathEl::QuadTo(..) | PathEl::CurveTo(..) => {}
    });
    finish(&mut rings, &mut current, false);

    rings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_square_parses_to_one_outline() {
        let doc = parse_document(fixtures::SQUARE_SVG).unwrap();
        assert_eq!(doc.outlines.len(), 1);
        let outline = &doc.outlines[0];
        assert_eq!(outline.contour.len(), 4);
        assert!(outline.holes.is_empty());
        assert!(outline.closed);
        assert_eq!(doc.width, 100.0);
    }

    #[test]
    fn test_ring_has_hole() {
        let doc = parse_document(fixtures::RING_SVG).unwrap();
        assert_eq!(doc.outlines.len(), 1);
        assert_eq!(doc.outlines[0].holes.len(), 1);
    }

    #[test]
    fn test_circle_flattened_within_tolerance() {
        let doc = parse_document(fixtures::CIRCLE_SVG).unwrap();
        assert_eq!(doc.outlines.len(), 1);
        let contour = &doc.outlines[0].contour;
        assert!(contour.len() >= 8);
        let center = DVec2::new(50.0, 50.0);
        for p in contour {
            let r = p.distance(center);
            assert!((r - 40.0).abs() < 0.5, "radius {} off circle", r);
        }
    }

    #[test]
    fn test_flattening_independent_of_units() {
        let circle = |size: f64| {
            let c = size / 2.0;
            let r = size * 0.4;
            format!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {size} {size}"><circle cx="{c}" cy="{c}" r="{r}"/></svg>"#
            )
        };
        let small = parse_document(&circle(1.0)).unwrap();
        let large = parse_document(&circle(1000.0)).unwrap();
        let small_len = small.outlines[0].contour.len();
        let large_len = large.outlines[0].contour.len();
        assert!(small_len >= 16, "unit-sized circle flattened to {} points", small_len);
        assert!(small_len.abs_diff(large_len) <= 2);

        let center = DVec2::splat(0.5);
        for p in &small.outlines[0].contour {
            assert!((p.distance(center) - 0.4).abs() < 0.4 * 2.0e-3);
        }
    }

    #[test]
    fn test_group_transform_applied() {
        let doc = parse_document(fixtures::TRANSFORMED_SVG).unwrap();
        let min_x = doc.outlines[0]
            .points()
            .map(|p| p.x)
            .fold(f64::INFINITY, f64::min);
        assert!((min_x - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_multiple_shapes() {
        let doc = parse_document(fixtures::TWO_SHAPES_SVG).unwrap();
        assert_eq!(doc.outlines.len(), 2);
    }

    #[test]
    fn test_open_path_closed_implicitly() {
        let doc = parse_document(fixtures::OPEN_TRIANGLE_SVG).unwrap();
        assert_eq!(doc.outlines.len(), 1);
        assert_eq!(doc.outlines[0].contour.len(), 3);
        assert!(!doc.outlines[0].closed);
    }

    #[test]
    fn test_degenerate_and_empty_documents() {
        assert!(parse_document(fixtures::DEGENERATE_SVG).unwrap().is_empty());
        assert!(parse_document(fixtures::EMPTY_SVG).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_markup_rejected() {
        let err = parse_document(fixtures::MALFORMED_SVG).unwrap_err();
        assert!(matches!(err, StudioError::InvalidInputFormat(_)));
    }
}
