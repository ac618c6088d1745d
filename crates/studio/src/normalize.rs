//! Fit a document's outlines into the canonical extent centred on the origin.

use glam::DVec2;
use serde::Serialize;

use crate::vector::Outline;

/// Side length of the box the largest document dimension is scaled to
pub const CANONICAL_EXTENT: f64 = 2.0;

/// Centre and uniform scale shared by every outline of a document
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizationFrame {
    pub center_x: f64,
    pub center_y: f64,
    pub scale: f64,
}

impl Default for NormalizationFrame {
    fn default() -> Self {
        Self {
            center_x: 0.0,
            center_y: 0.0,
            scale: 1.0,
        }
    }
}

impl NormalizationFrame {
    /// Bounding box over every contour and hole point.
    ///
    /// A zero-size box (or no points at all) keeps scale 1.
    pub fn compute(outlines: &[Outline]) -> Self {
        let Some((min, max)) = bounds(outlines) else {
            return Self::default();
        };
        let center = (min + max) * 0.5;
        let size = max - min;
        let max_extent = size.x.max(size.y);
        let scale = if max_extent > 0.0 {
            CANONICAL_EXTENT / max_extent
        } else {
            1.0
        };
        Self {
            center_x: center.x,
            center_y: center.y,
            scale,
        }
    }

    /// Document point to canonical plane coordinates (y flipped to point up)
    pub fn apply(&self, p: DVec2) -> DVec2 {
        DVec2::new(
            (p.x - self.center_x) * self.scale,
            -(p.y - self.center_y) * self.scale,
        )
    }
}

/// Union bounding box of all outline points
pub fn bounds(outlines: &[Outline]) -> Option<(DVec2, DVec2)> {
    outlines
        .iter()
        .flat_map(|o| o.points())
        .fold(None, |acc, &p| match acc {
            None => Some((p, p)),
            Some((min, max)) => Some((min.min(p), max.max(p))),
        })
}
