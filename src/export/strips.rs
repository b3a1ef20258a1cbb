//! Triangle strip generation for the shared index buffer.
//!
//! Strip triangle `i` is `(s[i], s[i+1], s[i+2])` for even `i` and
//! `(s[i+1], s[i], s[i+2])` for odd `i`, so every emitted triangle keeps the
//! winding of the polygon it came from. Strips are joined with degenerate
//! triangles instead of restart markers.

use tracing::debug;

use crate::error::{ExportError, ExportResult};
use crate::scene::SceneMesh;

/// Number of distinct vertices a 16-bit index can address.
pub const MAX_VERTICES: usize = u16::MAX as usize + 1;

pub type Triangle = [u32; 3];

/// Fail unless `count` vertices can all be addressed by the index buffer.
pub fn check_vertex_count(count: usize) -> ExportResult<()> {
    if count > MAX_VERTICES {
        return Err(ExportError::TooManyVertices { count });
    }
    Ok(())
}

/// Fail if any polygon of `mesh` uses a vertex the mesh does not have.
pub fn check_polygon_indices(mesh: &SceneMesh) -> ExportResult<()> {
    let vertex_count = mesh.positions.len();
    match mesh
        .polygons
        .iter()
        .flatten()
        .find(|&&index| index as usize >= vertex_count)
    {
        Some(&index) => Err(ExportError::InvalidPolygonIndex {
            mesh: mesh.name.clone(),
            index,
            vertex_count,
        }),
        None => Ok(()),
    }
}

/// Fan-triangulate every polygon, skipping polygons with fewer than 3 vertices.
pub fn triangulate(polygons: &[Vec<u32>]) -> Vec<Triangle> {
    polygons
        .iter()
        .filter(|polygon| polygon.len() >= 3)
        .flat_map(|polygon| {
            let first = polygon[0];
            polygon[1..]
                .windows(2)
                .map(move |edge| [first, edge[0], edge[1]])
        })
        .collect()
}

fn rotations([a, b, c]: Triangle) -> [Triangle; 3] {
    [[a, b, c], [b, c, a], [c, a, b]]
}

/// Greedily chain `triangles` into a single strip.
///
/// A triangle extends the strip when one of its rotations starts with the
/// strip's tail edge in the orientation the next strip position expects.
/// Otherwise the strip is bridged to the triangle through degenerate
/// triangles.
pub fn triangles_to_strip(triangles: &[Triangle]) -> Vec<u32> {
    let mut strip: Vec<u32> = Vec::with_capacity(triangles.len() * 3);

    for &triangle in triangles {
        let len = strip.len();
        if len < 2 {
            strip.extend(triangle);
            continue;
        }

        let k = len - 2;
        let edge = if k % 2 == 0 {
            [strip[k], strip[k + 1]]
        } else {
            [strip[k + 1], strip[k]]
        };
        if let Some([_, _, next]) = rotations(triangle)
            .into_iter()
            .find(|[u, v, _]| [*u, *v] == edge)
        {
            strip.push(next);
            continue;
        }

        let [a, b, c] = triangle;
        let last = strip[len - 1];
        strip.extend([last, a]);
        if len % 2 == 0 {
            strip.extend([a, b, c]);
        } else {
            strip.extend([a, c, b]);
        }
    }

    strip
}

/// Strip indices of `mesh`, shifted to start at `vertex_position` in the
/// shared vertex buffer.
pub fn mesh_strip(mesh: &SceneMesh, vertex_position: usize) -> ExportResult<Vec<u16>> {
    check_vertex_count(vertex_position + mesh.positions.len())?;
    check_polygon_indices(mesh)?;

    let triangles = triangulate(&mesh.polygons);
    let strip = triangles_to_strip(&triangles);
    debug!(
        mesh = %mesh.name,
        triangles = triangles.len(),
        indices = strip.len(),
        "built triangle strip"
    );

    strip
        .into_iter()
        .map(|index| {
            let global = vertex_position + index as usize;
            u16::try_from(global).map_err(|_| ExportError::TooManyVertices { count: global + 1 })
        })
        .collect()
}
