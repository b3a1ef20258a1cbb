//! Per-vertex encoding of scene meshes.

use half::f16;
use itertools::Itertools;
use tracing::{error, warn};

use crate::error::{ExportError, ExportResult, InternalError};
use crate::export::bone_palette::BonePalette;
use crate::export::bounding_box::{BoundingBox, EXPORT_SCALE};
use crate::models::vertex_format::{VertexFormat, VertexPosition, VertexRecord};
use crate::scene::{BoneInfluence, SceneMesh};

/// Sum of the quantized weights of every influenced vertex.
pub const WEIGHT_TOTAL: u32 = 255;
/// Magnitude of the signed 16-bit position domain used by skinned formats.
const POSITION_RANGE: f64 = 32767.0;

/// Vertices of one mesh, ready to be appended to the global vertex buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedVertices {
    pub format: VertexFormat,
    pub vertices: Vec<VertexRecord>,
}

impl EncodedVertices {
    pub fn write(&self, out: &mut Vec<u8>) {
        for vertex in &self.vertices {
            vertex.write(self.format, out);
        }
    }
}

/// Largest number of bones influencing a single vertex of `mesh`. Influence
/// lists past the last vertex are ignored.
pub fn max_influences(mesh: &SceneMesh) -> usize {
    mesh.influences
        .iter()
        .take(mesh.positions.len())
        .map(Vec::len)
        .max()
        .unwrap_or(0)
}

/// Smallest vertex format able to hold every vertex of `mesh`.
pub fn select_format(mesh: &SceneMesh) -> ExportResult<VertexFormat> {
    let count = max_influences(mesh);
    VertexFormat::for_influences(count).ok_or_else(|| ExportError::TooManyInfluences {
        mesh: mesh.name.clone(),
        count,
        max: VertexFormat::MAX_INFLUENCES,
    })
}

/// Quantize fractional weights to integers summing to exactly 255.
///
/// Weights are normalized, scaled to 255 and floored; the units lost to
/// flooring go one each to the largest fractional remainders, earlier
/// influences first on ties. Negative and non-finite weights count as zero,
/// and a vertex whose weights are all zero is split evenly.
pub fn quantize_weights(weights: &[f32]) -> Vec<u8> {
    if weights.is_empty() {
        return Vec::new();
    }

    let weights: Vec<f64> = weights
        .iter()
        .map(|&w| if w.is_finite() { f64::from(w).max(0.0) } else { 0.0 })
        .collect();
    let total: f64 = weights.iter().sum();
    let scale = f64::from(WEIGHT_TOTAL);
    let shares: Vec<f64> = if total > 0.0 {
        weights.iter().map(|w| w / total * scale).collect()
    } else {
        vec![scale / weights.len() as f64; weights.len()]
    };

    let mut quantized: Vec<u32> = shares.iter().map(|s| s.floor() as u32).collect();
    let assigned: u32 = quantized.iter().sum();
    let remainder = WEIGHT_TOTAL.saturating_sub(assigned) as usize;

    let by_remainder = (0..shares.len())
        .sorted_by(|&a, &b| {
            let frac_a = shares[a] - shares[a].floor();
            let frac_b = shares[b] - shares[b].floor();
            frac_b.total_cmp(&frac_a).then(a.cmp(&b))
        })
        .collect_vec();
    for &index in by_remainder.iter().cycle().take(remainder) {
        quantized[index] += 1;
    }

    quantized.into_iter().map(|q| q.min(255) as u8).collect()
}

/// Scene (Z up) to MOD (Y up) axes.
pub fn z_up_to_y_up([x, y, z]: [f64; 3]) -> [f64; 3] {
    [x, z, -y]
}

/// Map a scaled, Y-up position into the signed 16-bit domain of skinned formats.
///
/// `extents` are the scene-space box extents from
/// [`BoundingBox::scaled_extents`], paired axis by axis with the Y-up position
/// (`x` with the scene X extent, `y` with the scene Y extent, `z` with the
/// scene Z extent). Rounds half to even and saturates; a zero extent maps
/// the coordinate to 0.
pub fn quantize_position(xyz: [f64; 3], extents: [f64; 3]) -> [i16; 3] {
    std::array::from_fn(|axis| {
        if extents[axis] == 0.0 {
            return 0;
        }
        let value = (xyz[axis] * POSITION_RANGE / extents[axis]).round_ties_even();
        value.clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
    })
}

/// First-layer UVs of every vertex, V flipped, as half floats.
///
/// Vertices without a UV get the zero UV. Partial coverage is logged but not
/// an error.
pub fn encode_uvs(mesh: &SceneMesh) -> Vec<[f16; 2]> {
    let vertex_count = mesh.positions.len();
    let covered = mesh
        .uvs
        .iter()
        .take(vertex_count)
        .filter(|uv| uv.is_some())
        .count();
    if covered > 0 && covered != vertex_count {
        warn!(
            mesh = %mesh.name,
            vertex_count,
            uv_count = covered,
            "some vertices have no UVs, using the origin for them"
        );
    }

    (0..vertex_count)
        .map(|index| match mesh.uvs.get(index).copied().flatten() {
            Some([u, v]) => [f16::from_f64(f64::from(u)), f16::from_f64(-f64::from(v))],
            None => [f16::ZERO, f16::ZERO],
        })
        .collect()
}

/// Encode every vertex of `mesh` with the format its influences require.
///
/// `mesh_index` and `palette_index` only serve error reporting.
pub fn encode_vertices(
    mesh: &SceneMesh,
    mesh_index: usize,
    bbox: &BoundingBox,
    palette_index: usize,
    palette: &BonePalette,
) -> ExportResult<EncodedVertices> {
    let format = select_format(mesh)?;
    let extents = bbox.scaled_extents();
    let uvs = encode_uvs(mesh);
    let no_influences: &[BoneInfluence] = &[];

    let mut vertices = Vec::with_capacity(mesh.positions.len());
    for (index, (position, uv)) in mesh.positions.iter().zip(uvs).enumerate() {
        let scaled = position.map(|c| f64::from(c) * EXPORT_SCALE);
        let xyz = z_up_to_y_up(scaled);
        let position = if format.is_skinned() {
            VertexPosition::Quantized(quantize_position(xyz, extents))
        } else {
            VertexPosition::Scaled(xyz.map(|c| c as f32))
        };

        let mut bone_indices = [0u8; VertexFormat::MAX_INFLUENCES];
        let mut bone_weights = [0u8; VertexFormat::MAX_INFLUENCES];
        if format.is_skinned() {
            let influences = mesh
                .influences
                .get(index)
                .map_or(no_influences, Vec::as_slice);
            for (slot, influence) in influences.iter().enumerate() {
                bone_indices[slot] = palette.local_index(influence.bone).ok_or_else(|| {
                    error!(
                        mesh = %mesh.name,
                        mesh_index,
                        vertex = index,
                        bone = influence.bone,
                        palette_index,
                        palette = ?palette.bones,
                        "bone missing from the mesh's palette"
                    );
                    ExportError::from(InternalError::BoneNotInPalette {
                        mesh: mesh_index,
                        bone: influence.bone,
                        palette: palette_index,
                    })
                })?;
            }
            let weights = influences.iter().map(|i| i.weight).collect_vec();
            for (slot, weight) in quantize_weights(&weights).into_iter().enumerate() {
                bone_weights[slot] = weight;
            }
        }

        vertices.push(VertexRecord {
            position,
            bone_indices,
            bone_weights,
            uv,
        });
    }

    Ok(EncodedVertices { format, vertices })
}
