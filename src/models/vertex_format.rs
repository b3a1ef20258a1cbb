//! Vertex formats of MOD v156 meshes.
//!
//! A mesh picks one format for all of its vertices based on the largest number
//! of bones influencing any single vertex. Every format is padded to the same
//! 32-byte stride; formats differ in which attributes they carry and where.

use half::f16;

use super::mod156::{LeWriter, VERTEX_STRIDE};

/// Placeholder normal written for every vertex (`x, y, z, w` as signed bytes).
///
/// Most common value across the vertices of shipped RE5 models; real normals
/// are not computed yet.
pub const NORMAL_PLACEHOLDER: [i8; 4] = [127, 127, 0, -1];
/// Placeholder tangent written for formats that carry one.
pub const TANGENT_PLACEHOLDER: [i8; 4] = [53, 53, 53, -1];
/// Constant `w` component of every position.
pub const POSITION_W: i16 = 32767;

/// Semantic meaning of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeSemantic {
    Position,
    Normal,
    Tangent,
    BoneIndices,
    BoneWeights,
    TexCoord0,
    TexCoord1,
}

/// How an attribute is stored in the vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeFormat {
    /// 4 x f32 = 16 bytes (unskinned position)
    Float32x4,
    /// 4 x i16 = 8 bytes (bounding-box relative position)
    Sint16x4,
    /// 4 x i8 = 4 bytes (normal / tangent)
    PackedNormal,
    /// N x u8 (bone indices or quantized weights)
    Uint8(usize),
    /// 2 x float16 = 4 bytes (UV coordinates)
    PackedUV,
}

impl AttributeFormat {
    pub fn size(&self) -> usize {
        match self {
            AttributeFormat::Float32x4 => 16,
            AttributeFormat::Sint16x4 => 8,
            AttributeFormat::PackedNormal | AttributeFormat::PackedUV => 4,
            AttributeFormat::Uint8(count) => *count,
        }
    }
}

/// A single vertex attribute descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub semantic: AttributeSemantic,
    pub format: AttributeFormat,
    pub offset: usize,
}

/// Vertex record variant, chosen once per mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    /// No skinning. Float position, tangent and two UV sets.
    Static,
    /// Up to 4 influences per vertex. The format id equals `influences`.
    Skinned4 { influences: u8 },
    /// 5 to 8 influences per vertex. No tangent and a single UV set.
    Skinned8,
}

impl VertexFormat {
    /// Largest influence count any format supports.
    pub const MAX_INFLUENCES: usize = 8;

    /// Smallest format able to hold `influences` bones per vertex.
    pub fn for_influences(influences: usize) -> Option<Self> {
        match influences {
            0 => Some(VertexFormat::Static),
            1..=4 => Some(VertexFormat::Skinned4 {
                influences: influences as u8,
            }),
            5..=8 => Some(VertexFormat::Skinned8),
            _ => None,
        }
    }

    /// Format id stored in the mesh record.
    pub fn id(&self) -> u8 {
        match self {
            VertexFormat::Static => 0,
            VertexFormat::Skinned4 { influences } => *influences,
            VertexFormat::Skinned8 => 5,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(VertexFormat::Static),
            1..=4 => Some(VertexFormat::Skinned4 { influences: id }),
            5 => Some(VertexFormat::Skinned8),
            _ => None,
        }
    }

    /// Width of the bone index and weight arrays.
    pub fn bone_slots(&self) -> usize {
        match self {
            VertexFormat::Static => 0,
            VertexFormat::Skinned4 { .. } => 4,
            VertexFormat::Skinned8 => 8,
        }
    }

    pub fn is_skinned(&self) -> bool {
        self.bone_slots() > 0
    }

    pub fn has_tangent(&self) -> bool {
        !matches!(self, VertexFormat::Skinned8)
    }

    pub fn has_second_uv(&self) -> bool {
        !matches!(self, VertexFormat::Skinned8)
    }

    /// Attributes in storage order.
    pub fn attributes(&self) -> Vec<VertexAttribute> {
        let mut attrs = Vec::new();
        let mut offset = 0usize;
        let mut push = |semantic, format: AttributeFormat| {
            attrs.push(VertexAttribute {
                semantic,
                format,
                offset,
            });
            offset += format.size();
        };

        let position = if self.is_skinned() {
            AttributeFormat::Sint16x4
        } else {
            AttributeFormat::Float32x4
        };
        push(AttributeSemantic::Position, position);
        push(AttributeSemantic::Normal, AttributeFormat::PackedNormal);
        if self.has_tangent() {
            push(AttributeSemantic::Tangent, AttributeFormat::PackedNormal);
        }
        if self.is_skinned() {
            let slots = self.bone_slots();
            push(AttributeSemantic::BoneIndices, AttributeFormat::Uint8(slots));
            push(AttributeSemantic::BoneWeights, AttributeFormat::Uint8(slots));
        }
        push(AttributeSemantic::TexCoord0, AttributeFormat::PackedUV);
        if self.has_second_uv() {
            push(AttributeSemantic::TexCoord1, AttributeFormat::PackedUV);
        }

        attrs
    }

    /// Serialized width of one vertex. Always [`VERTEX_STRIDE`].
    pub fn stride(&self) -> usize {
        self.attributes()
            .last()
            .map_or(0, |attr| attr.offset + attr.format.size())
    }
}

/// Position of an encoded vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VertexPosition {
    /// Scaled, Y-up coordinates for [`VertexFormat::Static`].
    Scaled([f32; 3]),
    /// Bounding-box relative coordinates for skinned formats.
    Quantized([i16; 3]),
}

/// One encoded vertex, independent of the format it is written with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexRecord {
    pub position: VertexPosition,
    /// Palette-local bone indices, zero past the vertex's influence count.
    pub bone_indices: [u8; VertexFormat::MAX_INFLUENCES],
    /// Quantized weights parallel to `bone_indices`.
    pub bone_weights: [u8; VertexFormat::MAX_INFLUENCES],
    pub uv: [f16; 2],
}

impl VertexRecord {
    /// Append this vertex to `out` using the layout of `format`.
    pub fn write(&self, format: VertexFormat, out: &mut Vec<u8>) {
        let start = out.len();
        for attr in format.attributes() {
            match (attr.semantic, attr.format) {
                (AttributeSemantic::Position, AttributeFormat::Float32x4) => {
                    let xyz = match self.position {
                        VertexPosition::Scaled(xyz) => xyz,
                        VertexPosition::Quantized(xyz) => xyz.map(f32::from),
                    };
                    out.put_f32s(&xyz);
                    out.put_f32(f32::from(POSITION_W));
                }
                (AttributeSemantic::Position, _) => {
                    let xyz = match self.position {
                        VertexPosition::Quantized(xyz) => xyz,
                        VertexPosition::Scaled(xyz) => xyz.map(|c| c as i16),
                    };
                    for c in xyz {
                        out.put_i16(c);
                    }
                    out.put_i16(POSITION_W);
                }
                (AttributeSemantic::Normal, _) => {
                    NORMAL_PLACEHOLDER.iter().for_each(|&c| out.put_i8(c));
                }
                (AttributeSemantic::Tangent, _) => {
                    TANGENT_PLACEHOLDER.iter().for_each(|&c| out.put_i8(c));
                }
                (AttributeSemantic::BoneIndices, format) => {
                    out.extend_from_slice(&self.bone_indices[..format.size()]);
                }
                (AttributeSemantic::BoneWeights, format) => {
                    out.extend_from_slice(&self.bone_weights[..format.size()]);
                }
                (AttributeSemantic::TexCoord0, _) => {
                    out.put_u16(self.uv[0].to_bits());
                    out.put_u16(self.uv[1].to_bits());
                }
                (AttributeSemantic::TexCoord1, _) => {
                    out.put_u16(0);
                    out.put_u16(0);
                }
            }
        }
        debug_assert_eq!(out.len() - start, VERTEX_STRIDE);
    }
}

/// Unpack a 4-byte packed UV into `[f32; 2]`.
///
/// The packed format is 2 x float16 (IEEE 754 half-precision), stored as
/// `[u_half, v_half]` in little-endian order.
pub fn unpack_uv(packed: u32) -> [f32; 2] {
    let bytes = packed.to_le_bytes();
    let u_bits = u16::from_le_bytes([bytes[0], bytes[1]]);
    let v_bits = u16::from_le_bytes([bytes[2], bytes[3]]);
    [
        f16::from_bits(u_bits).to_f32(),
        f16::from_bits(v_bits).to_f32(),
    ]
}
