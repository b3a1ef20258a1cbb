//! Record schemas for MT Framework MOD files, version 156.
//!
//! Every record declares its field order and serialized width here; [`Record::write`]
//! and [`Record::parse`] walk the fields in the same order. All values are
//! little-endian and records are tightly packed.
//!
//! File layout, in order:
//!
//! | Section | Record | Count |
//! |---|---|---|
//! | header | [`Header`] | 1 |
//! | header extension | 64 bytes | 1 if `unknowns[7] != 0` |
//! | bones | [`Bone`] | `bone_count` |
//! | bone matrices | `[f32; 16]` | `bone_count` |
//! | bone world matrices | `[f32; 16]` | `bone_count` |
//! | bone trailer | 256 bytes | 1 if `bone_count > 0` |
//! | bone palettes | [`BonePaletteRecord`] | `bone_palette_count` |
//! | groups | [`GroupData`] | `group_count` |
//! | textures | [`TextureName`] | `texture_count` |
//! | materials | [`MaterialRecord`] | `material_count` |
//! | meshes | [`MeshRecord`] | `mesh_count` |
//! | mesh helpers | `f32` | `36 * mesh_count + 1` |
//! | vertex buffer | bytes | `vertex_buffer_size` |
//! | secondary vertex buffer | bytes | `vertex_buffer_2_size` |
//! | index buffer | `u16` | `face_count - 1` |

use winnow::Parser;
use winnow::binary::{le_f32, le_i8, le_u8, le_u16, le_u32};

use crate::data::parser_utils::{WResult, parse_byte_array, parse_f32_array, read_fixed_string};

pub const MAGIC: [u8; 4] = *b"MOD\0";
pub const VERSION: u8 = 156;
pub const REVISION: i8 = 1;

pub const HEADER_SIZE: usize = 176;
pub const HEADER_EXTENSION_SIZE: usize = 64;
pub const BONE_TRAILER_SIZE: usize = 256;
pub const MATRIX_SIZE: usize = 64;

/// Every vertex format is padded to this stride.
pub const VERTEX_STRIDE: usize = 32;
/// Maximum number of distinct bones one bone palette can hold.
pub const MAX_PALETTE_BONES: usize = 32;
pub const TEXTURE_SLOTS: usize = 8;
pub const TEXTURE_NAME_LEN: usize = 64;
/// Floats per mesh in the mesh helper array.
pub const MESH_HELPER_FLOATS: usize = 36;

/// Per-mesh helper shape.
///
/// Lifted from `pawn/om/om0000/model/om0000.mod` (RE5, `uOm0000Damage.arc`). Its
/// meaning is unknown; the engine accepts it for every model tried so far.
pub const MESH_HELPER_SHAPE: [f32; MESH_HELPER_FLOATS] = [
    0.0, 0.0, 0.0, 0.0, //
    0.0, 50.0, 0.0, 86.6025390625, //
    -50.0, 0.0, -50.0, 0.0, //
    50.0, 100.0, 50.0, 0.0, //
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 50.0, 0.0, 1.0, //
    50.0, 50.0, 50.0, 0.0,
];

/// Opaque integer words of a material record.
///
/// Lifted from `pawn/pl/pl00/model/pl0000.mod` (RE5, `uPlChrisNormal.arc`), material 16.
pub const DEFAULT_MATERIAL_WORDS: [u32; 6] =
    [2168619075, 18563, 2267538950, 451, 179374192, 0];

/// Opaque float block of a material record, same source as [`DEFAULT_MATERIAL_WORDS`].
pub const DEFAULT_MATERIAL_FLOATS: [f32; 26] = [
    0.0, 1.0, 0.04, 0.0, //
    1.0, 0.3, 1.0, 1.0, //
    1.0, 0.0, 0.25, 36.0, //
    0.0, 0.5, 0.0, 0.0, //
    0.0, 0.0, 0.0, 0.0, //
    1.0, 0.2, 0.0, 0.0, //
    0.0, 0.0,
];

/// Little-endian field writers.
pub(crate) trait LeWriter {
    fn put_u8(&mut self, value: u8);
    fn put_i8(&mut self, value: i8);
    fn put_u16(&mut self, value: u16);
    fn put_i16(&mut self, value: i16);
    fn put_u32(&mut self, value: u32);
    fn put_f32(&mut self, value: f32);
    fn put_f32s(&mut self, values: &[f32]);
}

impl LeWriter for Vec<u8> {
    fn put_u8(&mut self, value: u8) {
        self.push(value);
    }

    fn put_i8(&mut self, value: i8) {
        self.push(value as u8);
    }

    fn put_u16(&mut self, value: u16) {
        self.extend_from_slice(&value.to_le_bytes());
    }

    fn put_i16(&mut self, value: i16) {
        self.extend_from_slice(&value.to_le_bytes());
    }

    fn put_u32(&mut self, value: u32) {
        self.extend_from_slice(&value.to_le_bytes());
    }

    fn put_f32(&mut self, value: f32) {
        self.extend_from_slice(&value.to_le_bytes());
    }

    fn put_f32s(&mut self, values: &[f32]) {
        for value in values {
            self.put_f32(*value);
        }
    }
}

/// A fixed-width record of the MOD file.
pub trait Record: Sized {
    /// Serialized width in bytes.
    const SIZE: usize;

    fn write(&self, out: &mut Vec<u8>);

    fn parse(input: &mut &[u8]) -> WResult<Self>;
}

/// The 176-byte file header.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub magic: [u8; 4],
    pub version: u8,
    pub revision: i8,
    pub bone_count: u16,
    pub mesh_count: u16,
    pub material_count: u16,
    pub vertex_count: u32,
    /// Number of index buffer entries plus one.
    pub face_count: u32,
    pub edge_count: u32,
    pub vertex_buffer_size: u32,
    pub vertex_buffer_2_size: u32,
    pub texture_count: u32,
    pub group_count: u32,
    pub bone_palette_count: u32,
    pub bones_offset: u32,
    pub groups_offset: u32,
    pub textures_offset: u32,
    pub meshes_offset: u32,
    pub vertex_buffer_offset: u32,
    pub vertex_buffer_2_offset: u32,
    pub index_buffer_offset: u32,
    pub reserved_01: u32,
    pub reserved_02: u32,
    pub sphere: [f32; 4],
    pub box_min: [f32; 4],
    pub box_max: [f32; 4],
    /// Unknown scalars. A non-zero `unknowns[7]` signals the header extension.
    pub unknowns: [u32; 11],
    pub reserved_03: u32,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            revision: REVISION,
            bone_count: 0,
            mesh_count: 0,
            material_count: 0,
            vertex_count: 0,
            face_count: 0,
            edge_count: 0,
            vertex_buffer_size: 0,
            vertex_buffer_2_size: 0,
            texture_count: 0,
            group_count: 0,
            bone_palette_count: 0,
            bones_offset: 0,
            groups_offset: 0,
            textures_offset: 0,
            meshes_offset: 0,
            vertex_buffer_offset: 0,
            vertex_buffer_2_offset: 0,
            index_buffer_offset: 0,
            reserved_01: 0,
            reserved_02: 0,
            sphere: [0.0; 4],
            box_min: [0.0; 4],
            box_max: [0.0; 4],
            unknowns: [0; 11],
            reserved_03: 0,
        }
    }
}

impl Header {
    pub fn has_extension(&self) -> bool {
        self.unknowns[7] != 0
    }
}

impl Record for Header {
    const SIZE: usize = HEADER_SIZE;

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.magic);
        out.put_u8(self.version);
        out.put_i8(self.revision);
        out.put_u16(self.bone_count);
        out.put_u16(self.mesh_count);
        out.put_u16(self.material_count);
        for value in [
            self.vertex_count,
            self.face_count,
            self.edge_count,
            self.vertex_buffer_size,
            self.vertex_buffer_2_size,
            self.texture_count,
            self.group_count,
            self.bone_palette_count,
            self.bones_offset,
            self.groups_offset,
            self.textures_offset,
            self.meshes_offset,
            self.vertex_buffer_offset,
            self.vertex_buffer_2_offset,
            self.index_buffer_offset,
            self.reserved_01,
            self.reserved_02,
        ] {
            out.put_u32(value);
        }
        out.put_f32s(&self.sphere);
        out.put_f32s(&self.box_min);
        out.put_f32s(&self.box_max);
        for value in self.unknowns {
            out.put_u32(value);
        }
        out.put_u32(self.reserved_03);
    }

    fn parse(input: &mut &[u8]) -> WResult<Self> {
        let magic = parse_byte_array::<4>(input)?;
        let version = le_u8.parse_next(input)?;
        let revision = le_i8.parse_next(input)?;
        let bone_count = le_u16.parse_next(input)?;
        let mesh_count = le_u16.parse_next(input)?;
        let material_count = le_u16.parse_next(input)?;
        let vertex_count = le_u32.parse_next(input)?;
        let face_count = le_u32.parse_next(input)?;
        let edge_count = le_u32.parse_next(input)?;
        let vertex_buffer_size = le_u32.parse_next(input)?;
        let vertex_buffer_2_size = le_u32.parse_next(input)?;
        let texture_count = le_u32.parse_next(input)?;
        let group_count = le_u32.parse_next(input)?;
        let bone_palette_count = le_u32.parse_next(input)?;
        let bones_offset = le_u32.parse_next(input)?;
        let groups_offset = le_u32.parse_next(input)?;
        let textures_offset = le_u32.parse_next(input)?;
        let meshes_offset = le_u32.parse_next(input)?;
        let vertex_buffer_offset = le_u32.parse_next(input)?;
        let vertex_buffer_2_offset = le_u32.parse_next(input)?;
        let index_buffer_offset = le_u32.parse_next(input)?;
        let reserved_01 = le_u32.parse_next(input)?;
        let reserved_02 = le_u32.parse_next(input)?;
        let sphere = parse_f32_array::<4>(input)?;
        let box_min = parse_f32_array::<4>(input)?;
        let box_max = parse_f32_array::<4>(input)?;
        let mut unknowns = [0u32; 11];
        for value in unknowns.iter_mut() {
            *value = le_u32.parse_next(input)?;
        }
        let reserved_03 = le_u32.parse_next(input)?;
        Ok(Self {
            magic,
            version,
            revision,
            bone_count,
            mesh_count,
            material_count,
            vertex_count,
            face_count,
            edge_count,
            vertex_buffer_size,
            vertex_buffer_2_size,
            texture_count,
            group_count,
            bone_palette_count,
            bones_offset,
            groups_offset,
            textures_offset,
            meshes_offset,
            vertex_buffer_offset,
            vertex_buffer_2_offset,
            index_buffer_offset,
            reserved_01,
            reserved_02,
            sphere,
            box_min,
            box_max,
            unknowns,
            reserved_03,
        })
    }
}

/// Skeleton bone. Carried over from the original file unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bone {
    pub anim_map_index: u8,
    pub parent_index: u8,
    pub mirror_index: u8,
    pub palette_index: u8,
    pub unk_01: f32,
    pub parent_distance: f32,
    pub location: [f32; 3],
}

impl Record for Bone {
    const SIZE: usize = 24;

    fn write(&self, out: &mut Vec<u8>) {
        out.put_u8(self.anim_map_index);
        out.put_u8(self.parent_index);
        out.put_u8(self.mirror_index);
        out.put_u8(self.palette_index);
        out.put_f32(self.unk_01);
        out.put_f32(self.parent_distance);
        out.put_f32s(&self.location);
    }

    fn parse(input: &mut &[u8]) -> WResult<Self> {
        Ok(Self {
            anim_map_index: le_u8.parse_next(input)?,
            parent_index: le_u8.parse_next(input)?,
            mirror_index: le_u8.parse_next(input)?,
            palette_index: le_u8.parse_next(input)?,
            unk_01: le_f32.parse_next(input)?,
            parent_distance: le_f32.parse_next(input)?,
            location: parse_f32_array::<3>(input)?,
        })
    }
}

/// 4x4 float matrix, stored as 16 consecutive floats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix(pub [f32; 16]);

impl Record for Matrix {
    const SIZE: usize = MATRIX_SIZE;

    fn write(&self, out: &mut Vec<u8>) {
        out.put_f32s(&self.0);
    }

    fn parse(input: &mut &[u8]) -> WResult<Self> {
        Ok(Self(parse_f32_array::<16>(input)?))
    }
}

/// Up to 32 global bone indices shared by the meshes that use the palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BonePaletteRecord {
    /// Number of used entries in `bones`.
    pub count: u32,
    /// Global bone indices, zero padded past `count`.
    pub bones: [u8; MAX_PALETTE_BONES],
}

impl BonePaletteRecord {
    pub fn used(&self) -> &[u8] {
        let count = (self.count as usize).min(MAX_PALETTE_BONES);
        &self.bones[..count]
    }
}

impl Record for BonePaletteRecord {
    const SIZE: usize = 4 + MAX_PALETTE_BONES;

    fn write(&self, out: &mut Vec<u8>) {
        out.put_u32(self.count);
        out.extend_from_slice(&self.bones);
    }

    fn parse(input: &mut &[u8]) -> WResult<Self> {
        Ok(Self {
            count: le_u32.parse_next(input)?,
            bones: parse_byte_array::<MAX_PALETTE_BONES>(input)?,
        })
    }
}

/// Mesh group descriptor. Carried over from the original file unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupData {
    pub group_index: u32,
    pub values: [f32; 7],
}

impl Record for GroupData {
    const SIZE: usize = 32;

    fn write(&self, out: &mut Vec<u8>) {
        out.put_u32(self.group_index);
        out.put_f32s(&self.values);
    }

    fn parse(input: &mut &[u8]) -> WResult<Self> {
        Ok(Self {
            group_index: le_u32.parse_next(input)?,
            values: parse_f32_array::<7>(input)?,
        })
    }
}

/// A texture path without extension, NUL padded to 64 bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TextureName(pub [u8; TEXTURE_NAME_LEN]);

impl TextureName {
    pub fn as_string(&self) -> String {
        read_fixed_string(&self.0)
    }
}

impl std::fmt::Debug for TextureName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TextureName").field(&self.as_string()).finish()
    }
}

impl Record for TextureName {
    const SIZE: usize = TEXTURE_NAME_LEN;

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0);
    }

    fn parse(input: &mut &[u8]) -> WResult<Self> {
        Ok(Self(parse_byte_array::<TEXTURE_NAME_LEN>(input)?))
    }
}

/// Material record. Only the texture slot table is understood.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialRecord {
    pub words: [u32; 6],
    /// 1-based indices into the texture table, 0 for an unused slot.
    pub texture_indices: [u32; TEXTURE_SLOTS],
    pub floats: [f32; 26],
}

impl Default for MaterialRecord {
    fn default() -> Self {
        Self {
            words: DEFAULT_MATERIAL_WORDS,
            texture_indices: [0; TEXTURE_SLOTS],
            floats: DEFAULT_MATERIAL_FLOATS,
        }
    }
}

impl Record for MaterialRecord {
    const SIZE: usize = 160;

    fn write(&self, out: &mut Vec<u8>) {
        for word in self.words {
            out.put_u32(word);
        }
        for index in self.texture_indices {
            out.put_u32(index);
        }
        out.put_f32s(&self.floats);
    }

    fn parse(input: &mut &[u8]) -> WResult<Self> {
        let mut words = [0u32; 6];
        for word in words.iter_mut() {
            *word = le_u32.parse_next(input)?;
        }
        let mut texture_indices = [0u32; TEXTURE_SLOTS];
        for index in texture_indices.iter_mut() {
            *index = le_u32.parse_next(input)?;
        }
        let floats = parse_f32_array::<26>(input)?;
        Ok(Self {
            words,
            texture_indices,
            floats,
        })
    }
}

/// Mesh descriptor.
///
/// The `unk_*` fields have not been reverse engineered; exported meshes keep
/// them at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshRecord {
    pub group_index: u16,
    pub material_index: u16,
    /// Always 1 in known files.
    pub constant: u8,
    pub level_of_detail: u8,
    pub unk_01: u8,
    pub vertex_format: u8,
    pub vertex_stride: u8,
    pub unk_02: u8,
    pub unk_03: u8,
    pub unk_04: u8,
    pub vertex_count: u16,
    pub vertex_index_end: u16,
    pub vertex_index_start_1: u32,
    pub vertex_offset: u32,
    pub unk_05: u32,
    pub face_position: u32,
    pub face_count: u32,
    pub face_offset: u32,
    pub unk_06: u8,
    pub unk_07: u8,
    pub vertex_index_start_2: u16,
    pub vertex_group_count: u8,
    pub bone_palette_index: u8,
    pub unk_08: u8,
    pub unk_09: u8,
    pub unk_10: u16,
    pub unk_11: u16,
}

impl Record for MeshRecord {
    const SIZE: usize = 52;

    fn write(&self, out: &mut Vec<u8>) {
        out.put_u16(self.group_index);
        out.put_u16(self.material_index);
        out.put_u8(self.constant);
        out.put_u8(self.level_of_detail);
        out.put_u8(self.unk_01);
        out.put_u8(self.vertex_format);
        out.put_u8(self.vertex_stride);
        out.put_u8(self.unk_02);
        out.put_u8(self.unk_03);
        out.put_u8(self.unk_04);
        out.put_u16(self.vertex_count);
        out.put_u16(self.vertex_index_end);
        out.put_u32(self.vertex_index_start_1);
        out.put_u32(self.vertex_offset);
        out.put_u32(self.unk_05);
        out.put_u32(self.face_position);
        out.put_u32(self.face_count);
        out.put_u32(self.face_offset);
        out.put_u8(self.unk_06);
        out.put_u8(self.unk_07);
        out.put_u16(self.vertex_index_start_2);
        out.put_u8(self.vertex_group_count);
        out.put_u8(self.bone_palette_index);
        out.put_u8(self.unk_08);
        out.put_u8(self.unk_09);
        out.put_u16(self.unk_10);
        out.put_u16(self.unk_11);
    }

    fn parse(input: &mut &[u8]) -> WResult<Self> {
        Ok(Self {
            group_index: le_u16.parse_next(input)?,
            material_index: le_u16.parse_next(input)?,
            constant: le_u8.parse_next(input)?,
            level_of_detail: le_u8.parse_next(input)?,
            unk_01: le_u8.parse_next(input)?,
            vertex_format: le_u8.parse_next(input)?,
            vertex_stride: le_u8.parse_next(input)?,
            unk_02: le_u8.parse_next(input)?,
            unk_03: le_u8.parse_next(input)?,
            unk_04: le_u8.parse_next(input)?,
            vertex_count: le_u16.parse_next(input)?,
            vertex_index_end: le_u16.parse_next(input)?,
            vertex_index_start_1: le_u32.parse_next(input)?,
            vertex_offset: le_u32.parse_next(input)?,
            unk_05: le_u32.parse_next(input)?,
            face_position: le_u32.parse_next(input)?,
            face_count: le_u32.parse_next(input)?,
            face_offset: le_u32.parse_next(input)?,
            unk_06: le_u8.parse_next(input)?,
            unk_07: le_u8.parse_next(input)?,
            vertex_index_start_2: le_u16.parse_next(input)?,
            vertex_group_count: le_u8.parse_next(input)?,
            bone_palette_index: le_u8.parse_next(input)?,
            unk_08: le_u8.parse_next(input)?,
            unk_09: le_u8.parse_next(input)?,
            unk_10: le_u16.parse_next(input)?,
            unk_11: le_u16.parse_next(input)?,
        })
    }
}

/// Absolute byte offset of every section, plus the total file size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionLayout {
    pub header_extension: usize,
    pub bones: usize,
    pub bone_matrices: usize,
    pub bone_world_matrices: usize,
    pub bone_trailer: usize,
    pub bone_palettes: usize,
    pub groups: usize,
    pub textures: usize,
    pub materials: usize,
    pub meshes: usize,
    pub mesh_helpers: usize,
    pub vertex_buffer: usize,
    pub vertex_buffer_2: usize,
    pub index_buffer: usize,
    pub end: usize,
}

/// A complete MOD v156 file.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFile {
    pub header: Header,
    pub header_extension: Option<[u8; HEADER_EXTENSION_SIZE]>,
    pub bones: Vec<Bone>,
    pub bone_matrices: Vec<Matrix>,
    pub bone_world_matrices: Vec<Matrix>,
    pub bone_trailer: Option<Vec<u8>>,
    pub bone_palettes: Vec<BonePaletteRecord>,
    pub groups: Vec<GroupData>,
    pub textures: Vec<TextureName>,
    pub materials: Vec<MaterialRecord>,
    pub meshes: Vec<MeshRecord>,
    /// Count word followed by [`MESH_HELPER_SHAPE`] once per mesh.
    pub mesh_helpers: Vec<f32>,
    pub vertex_buffer: Vec<u8>,
    pub vertex_buffer_2: Vec<u8>,
    pub index_buffer: Vec<u16>,
}

impl ModelFile {
    /// Offsets of each section when the file is laid out in format order.
    pub fn layout(&self) -> SectionLayout {
        let mut cursor = HEADER_SIZE;
        let mut next = |size: usize| {
            let start = cursor;
            cursor += size;
            start
        };

        let header_extension = next(self.header_extension.map_or(0, |_| HEADER_EXTENSION_SIZE));
        let bones = next(self.bones.len() * Bone::SIZE);
        let bone_matrices = next(self.bone_matrices.len() * Matrix::SIZE);
        let bone_world_matrices = next(self.bone_world_matrices.len() * Matrix::SIZE);
        let bone_trailer = next(self.bone_trailer.as_ref().map_or(0, Vec::len));
        let bone_palettes = next(self.bone_palettes.len() * BonePaletteRecord::SIZE);
        let groups = next(self.groups.len() * GroupData::SIZE);
        let textures = next(self.textures.len() * TextureName::SIZE);
        let materials = next(self.materials.len() * MaterialRecord::SIZE);
        let meshes = next(self.meshes.len() * MeshRecord::SIZE);
        let mesh_helpers = next(self.mesh_helpers.len() * 4);
        let vertex_buffer = next(self.vertex_buffer.len());
        let vertex_buffer_2 = next(self.vertex_buffer_2.len());
        let index_buffer = next(self.index_buffer.len() * 2);
        let end = next(0);

        SectionLayout {
            header_extension,
            bones,
            bone_matrices,
            bone_world_matrices,
            bone_trailer,
            bone_palettes,
            groups,
            textures,
            materials,
            meshes,
            mesh_helpers,
            vertex_buffer,
            vertex_buffer_2,
            index_buffer,
            end,
        }
    }

    /// Serialize every section in format order.
    ///
    /// The header is written as stored; counts and offsets are expected to
    /// have been filled in by the assembler.
    pub fn to_bytes(&self) -> Vec<u8> {
        let layout = self.layout();
        let mut out = Vec::with_capacity(layout.end);

        self.header.write(&mut out);
        if let Some(extension) = &self.header_extension {
            out.extend_from_slice(extension);
        }
        write_records(&mut out, &self.bones);
        write_records(&mut out, &self.bone_matrices);
        write_records(&mut out, &self.bone_world_matrices);
        if let Some(trailer) = &self.bone_trailer {
            out.extend_from_slice(trailer);
        }
        write_records(&mut out, &self.bone_palettes);
        write_records(&mut out, &self.groups);
        write_records(&mut out, &self.textures);
        write_records(&mut out, &self.materials);
        write_records(&mut out, &self.meshes);
        out.put_f32s(&self.mesh_helpers);
        out.extend_from_slice(&self.vertex_buffer);
        out.extend_from_slice(&self.vertex_buffer_2);
        for index in &self.index_buffer {
            out.put_u16(*index);
        }

        debug_assert_eq!(out.len(), layout.end);
        out
    }
}

fn write_records<R: Record>(out: &mut Vec<u8>, records: &[R]) {
    for record in records {
        let start = out.len();
        record.write(out);
        debug_assert_eq!(out.len() - start, R::SIZE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written<R: Record>(record: &R) -> Vec<u8> {
        let mut out = Vec::new();
        record.write(&mut out);
        out
    }

    #[test]
    fn record_widths_match_declared_sizes() {
        assert_eq!(written(&Header::default()).len(), Header::SIZE);
        assert_eq!(written(&MeshRecord::default()).len(), MeshRecord::SIZE);
        assert_eq!(written(&MaterialRecord::default()).len(), MaterialRecord::SIZE);
        let palette = BonePaletteRecord {
            count: 0,
            bones: [0; MAX_PALETTE_BONES],
        };
        assert_eq!(written(&palette).len(), BonePaletteRecord::SIZE);
        let group = GroupData {
            group_index: 3,
            values: [0.0; 7],
        };
        assert_eq!(written(&group).len(), GroupData::SIZE);
    }

    #[test]
    fn header_field_positions() {
        let header = Header {
            bone_count: 0x0102,
            vertex_count: 7,
            index_buffer_offset: 0xAABBCCDD,
            sphere: [1.0, 0.0, 0.0, 0.0],
            reserved_03: 9,
            ..Header::default()
        };
        let bytes = written(&header);
        assert_eq!(&bytes[0..4], b"MOD\0");
        assert_eq!(bytes[4], 156);
        assert_eq!(bytes[5], 1);
        assert_eq!(&bytes[6..8], &[0x02, 0x01]);
        assert_eq!(&bytes[12..16], &7u32.to_le_bytes());
        assert_eq!(&bytes[68..72], &0xAABBCCDDu32.to_le_bytes());
        assert_eq!(&bytes[80..84], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[172..176], &9u32.to_le_bytes());
    }

    #[test]
    fn mesh_record_field_positions() {
        let mesh = MeshRecord {
            material_index: 4,
            vertex_format: 5,
            vertex_stride: 32,
            vertex_count: 10,
            face_position: 0x11223344,
            bone_palette_index: 2,
            ..MeshRecord::default()
        };
        let bytes = written(&mesh);
        assert_eq!(&bytes[2..4], &[4, 0]);
        assert_eq!(bytes[7], 5);
        assert_eq!(bytes[8], 32);
        assert_eq!(&bytes[12..14], &[10, 0]);
        assert_eq!(&bytes[28..32], &0x11223344u32.to_le_bytes());
        assert_eq!(bytes[45], 2);
    }

    #[test]
    fn material_defaults_match_reference_values() {
        let bytes = written(&MaterialRecord::default());
        assert_eq!(&bytes[0..4], &2168619075u32.to_le_bytes());
        assert_eq!(&bytes[56..60], &0.0f32.to_le_bytes());
        assert_eq!(&bytes[100..104], &36.0f32.to_le_bytes());
    }

    #[test]
    fn texture_name_reads_until_padding() {
        let mut raw = [0u8; TEXTURE_NAME_LEN];
        raw[..9].copy_from_slice(b"pl\\pl0000");
        assert_eq!(TextureName(raw).as_string(), "pl\\pl0000");
    }
}
