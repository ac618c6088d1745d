//! Factory functions and sample documents for tests and the command interface.

use glam::DVec2;

use crate::vector::Outline;

// ── Sample documents ────────────────────────────────────────────

/// One 80×80 square in a 100×100 viewport
pub const SQUARE_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100" viewBox="0 0 100 100">
  <rect x="10" y="10" width="80" height="80" fill="black"/>
</svg>"#;

/// A square frame: outer contour with one square hole
pub const RING_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100" viewBox="0 0 100 100">
  <path fill-rule="evenodd" fill="black" d="M10 10 H90 V90 H10 Z M30 30 H70 V70 H30 Z"/>
</svg>"#;

pub const CIRCLE_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100" viewBox="0 0 100 100">
  <circle cx="50" cy="50" r="40" fill="black"/>
</svg>"#;

/// Two disjoint shapes of different sizes
pub const TWO_SHAPES_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="100" viewBox="0 0 200 100">
  <rect x="0" y="0" width="100" height="100" fill="black"/>
  <rect x="150" y="25" width="50" height="50" fill="black"/>
</svg>"#;

/// A square moved by a group transform
pub const TRANSFORMED_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="100" viewBox="0 0 200 100">
  <g transform="translate(40 0)">
    <rect x="10" y="10" width="50" height="50" fill="black"/>
  </g>
</svg>"#;

/// Filled triangle without a closing command
pub const OPEN_TRIANGLE_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100" viewBox="0 0 100 100">
  <path fill="black" d="M10 10 L90 10 L50 80"/>
</svg>"#;

/// Only zero-area geometry
pub const DEGENERATE_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100" viewBox="0 0 100 100">
  <path fill="black" d="M10 10 L50 10 L90 10 Z"/>
</svg>"#;

/// Valid document without any shapes
pub const EMPTY_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100" viewBox="0 0 100 100"></svg>"#;

/// Not well-formed XML
pub const MALFORMED_SVG: &str = "<svg xmlns=\"http://www.w3.org/2000/svg\"><rect";

// ── Builders ────────────────────────────────────────────────────

/// Document with a single axis-aligned rectangle
pub fn rect_svg(x: f64, y: f64, w: f64, h: f64) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{vw}" height="{vh}" viewBox="0 0 {vw} {vh}"><rect x="{x}" y="{y}" width="{w}" height="{h}" fill="black"/></svg>"#,
        vw = x + w + 10.0,
        vh = y + h + 10.0,
    )
}

/// Document with one closed polygon
pub fn polygon_svg(points: &[(f64, f64)]) -> String {
    let coords: Vec<String> = points.iter().map(|(x, y)| format!("{},{}", x, y)).collect();
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="1000" height="1000" viewBox="0 0 1000 1000"><polygon points="{}" fill="black"/></svg>"#,
        coords.join(" ")
    )
}

/// Counter-clockwise square outline without holes
pub fn square_outline(x: f64, y: f64, size: f64) -> Outline {
    Outline {
        contour: vec![
            DVec2::new(x, y),
            DVec2::new(x + size, y),
            DVec2::new(x + size, y + size),
            DVec2::new(x, y + size),
        ],
        holes: Vec::new(),
        closed: true,
    }
}

/// Square outline with a centred square hole of `hole` side length
pub fn square_frame_outline(size: f64, hole: f64) -> Outline {
    let mut outline = square_outline(0.0, 0.0, size);
    let lo = (size - hole) * 0.5;
    let hi = lo + hole;
    outline.holes.push(vec![
        DVec2::new(lo, lo),
        DVec2::new(lo, hi),
        DVec2::new(hi, hi),
        DVec2::new(hi, lo),
    ]);
    outline
}
