//! Course grid extents and snap markers
//!
//! Both are derived data handed to the renderer. Grid extents cover the whole
//! scene footprint and are recomputed lazily (dirty flag, flushed by the
//! host's tick). Snap markers sit on the top faces of the course below the
//! active one.

use crate::{Element, ElementId};
use glam::{DVec2, DVec3};

/// Square horizontal extent of a course grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridExtents {
    pub center: DVec2,
    /// Edge length of the square (cm)
    pub size: f64,
}

impl GridExtents {
    /// Extent of an empty scene
    pub fn empty(margin: f64, step: f64) -> Self {
        GridExtents {
            center: DVec2::ZERO,
            size: round_up(2.0 * margin, step),
        }
    }

    /// Smallest step-aligned square covering every footprint plus a margin
    pub fn covering<'a>(
        elements: impl IntoIterator<Item = &'a Element>,
        margin: f64,
        step: f64,
    ) -> Self {
        let mut min = DVec2::splat(f64::INFINITY);
        let mut max = DVec2::splat(f64::NEG_INFINITY);
        for element in elements {
            for corner in element.top_corners() {
                let p = DVec2::new(corner.x, corner.z);
                min = min.min(p);
                max = max.max(p);
            }
        }
        if !min.is_finite() || !max.is_finite() {
            return Self::empty(margin, step);
        }
        let span = (max - min).max_element() + 2.0 * margin;
        GridExtents {
            center: (min + max) / 2.0,
            size: round_up(span, step),
        }
    }
}

fn round_up(value: f64, step: f64) -> f64 {
    if step > 0.0 {
        (value / step).ceil() * step
    } else {
        value
    }
}

/// Grid drawn at a course's height
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridHelper {
    pub height: f64,
    pub extents: GridExtents,
}

/// Attachment point offered to the placement tool
#[derive(Debug, Clone, PartialEq)]
pub struct SnapMarker {
    pub position: DVec3,
    /// Element whose top face carries the marker
    pub source: ElementId,
}

/// Markers on the top faces of `elements`: centre then corners
///
/// A candidate closer than `merge_distance` to an accepted marker is dropped,
/// so adjoining elements share one marker at their common corner.
pub fn build_markers<'a>(
    elements: impl IntoIterator<Item = &'a Element>,
    merge_distance: f64,
) -> Vec<SnapMarker> {
    let mut markers: Vec<SnapMarker> = Vec::new();
    for element in elements {
        let centre = DVec3::new(element.position.x, element.top(), element.position.z);
        for position in std::iter::once(centre).chain(element.top_corners()) {
            let conflict = markers
                .iter()
                .any(|m| m.position.distance(position) < merge_distance);
            if !conflict {
                markers.push(SnapMarker {
                    position,
                    source: element.id.clone(),
                });
            }
        }
    }
    markers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Dimensions, ElementKind};

    fn brick(id: &str, x: f64) -> Element {
        Element::new(id, ElementKind::Brick, Dimensions::new(20.0, 10.0, 5.0))
            .with_position(DVec3::new(x, 2.5, 0.0))
    }

    #[test]
    fn test_empty_extents() {
        let extents = GridExtents::covering(std::iter::empty(), 50.0, 10.0);
        assert_eq!(extents, GridExtents::empty(50.0, 10.0));
        assert_eq!(extents.size, 100.0);
    }

    #[test]
    fn test_extents_cover_footprint() {
        let elements = [brick("a", 0.0), brick("b", 100.0)];
        let extents = GridExtents::covering(&elements, 5.0, 10.0);
        // Footprint spans x in [-10, 110]: 120 + 2 * 5 margin
        assert_eq!(extents.size, 130.0);
        assert!((extents.center.x - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_markers_merge_shared_corners() {
        let elements = [brick("a", 0.0), brick("b", 20.0)];
        let markers = build_markers(&elements, 1.0);
        // 5 per brick, minus the two shared corners
        assert_eq!(markers.len(), 8);
        assert!(markers.iter().all(|m| (m.position.y - 5.0).abs() < 1e-9));
        assert_eq!(markers.iter().filter(|m| m.source == "b").count(), 3);
    }

    #[test]
    fn test_markers_keep_distinct_points() {
        let elements = [brick("a", 0.0), brick("b", 50.0)];
        assert_eq!(build_markers(&elements, 1.0).len(), 10);
    }
}
