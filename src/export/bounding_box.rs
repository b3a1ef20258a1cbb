//! Aggregate bounding box of everything exported into one MOD file.

use crate::scene::SceneNode;

/// Scene units to MOD units.
pub const EXPORT_SCALE: f64 = 100.0;

/// Axis-aligned box in scene space (Z up).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundingBox {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl BoundingBox {
    /// Box around `points`. No points gives the zero-sized box at the origin.
    pub fn from_points(points: impl IntoIterator<Item = [f32; 3]>) -> Self {
        let mut points = points.into_iter();
        let Some(first) = points.next() else {
            return Self::default();
        };

        points.fold(
            Self {
                min: first,
                max: first,
            },
            |mut bbox, point| {
                for axis in 0..3 {
                    bbox.min[axis] = bbox.min[axis].min(point[axis]);
                    bbox.max[axis] = bbox.max[axis].max(point[axis]);
                }
                bbox
            },
        )
    }

    /// Box around every mesh vertex and every placeholder location.
    pub fn from_nodes(nodes: &[SceneNode]) -> Self {
        Self::from_points(nodes.iter().flat_map(|node| -> Box<dyn Iterator<Item = [f32; 3]> + '_> {
            match node {
                SceneNode::Mesh(mesh) => Box::new(mesh.positions.iter().copied()),
                SceneNode::Empty { location, .. } => Box::new(std::iter::once(*location)),
            }
        }))
    }

    /// Per-axis extent in MOD units, `|min * 100| + |max * 100|`.
    ///
    /// This is not `max - min` when the box does not straddle the origin; the
    /// skinned position transform depends on this exact value.
    pub fn scaled_extents(&self) -> [f64; 3] {
        std::array::from_fn(|axis| {
            (f64::from(self.min[axis]) * EXPORT_SCALE).abs()
                + (f64::from(self.max[axis]) * EXPORT_SCALE).abs()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneMesh;

    #[test]
    fn empty_input_is_degenerate() {
        let bbox = BoundingBox::from_points(std::iter::empty());
        assert_eq!(bbox, BoundingBox::default());
        assert_eq!(bbox.scaled_extents(), [0.0; 3]);
    }

    #[test]
    fn covers_meshes_and_placeholders() {
        let nodes = vec![
            SceneNode::Mesh(
                SceneMesh::builder()
                    .name("a")
                    .positions(vec![[-1.0, 0.0, 2.0], [1.0, 0.5, 0.0]])
                    .build(),
            ),
            SceneNode::Empty {
                name: "failed".to_string(),
                location: [0.0, -3.0, 0.0],
            },
        ];
        let bbox = BoundingBox::from_nodes(&nodes);
        assert_eq!(bbox.min, [-1.0, -3.0, 0.0]);
        assert_eq!(bbox.max, [1.0, 0.5, 2.0]);
    }

    #[test]
    fn extents_sum_absolute_bounds() {
        let bbox = BoundingBox {
            min: [1.0, -0.5, 0.0],
            max: [2.0, 0.5, 1.0],
        };
        assert_eq!(bbox.scaled_extents(), [300.0, 100.0, 100.0]);
    }
}
