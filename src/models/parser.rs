//! Parser for MOD v156 files.
//!
//! Sections are read sequentially in format order; their sizes follow from the
//! header counts, so the header offsets are not consulted. Sections this crate
//! cannot regenerate (bones, groups, the secondary vertex buffer, ...) are kept
//! so they can be written back unchanged.

use rootcause::Report;
use tracing::debug;
use winnow::Parser;
use winnow::binary::{le_f32, le_u16};

use crate::data::parser_utils::{
    ParseError, parse_byte_array, parse_bytes, parse_records, parse_section,
};

use super::mod156::{
    BONE_TRAILER_SIZE, BonePaletteRecord, Bone, GroupData, HEADER_EXTENSION_SIZE, Header, MAGIC,
    MESH_HELPER_FLOATS, MaterialRecord, Matrix, MeshRecord, ModelFile, Record, TextureName,
    VERSION,
};

/// Parse a complete MOD v156 file.
pub fn parse_mod156(file_data: &[u8]) -> Result<ModelFile, Report<ParseError>> {
    parse_model_file(file_data).map_err(Report::new)
}

fn parse_model_file(file_data: &[u8]) -> Result<ModelFile, ParseError> {
    let input = &mut &file_data[..];

    let header = parse_section(file_data, input, "header", Header::parse)?;
    if header.magic != MAGIC {
        return Err(ParseError::BadMagic {
            found: header.magic,
        });
    }
    if header.version != VERSION {
        return Err(ParseError::UnsupportedVersion {
            version: header.version,
        });
    }

    let bone_count = header.bone_count as usize;
    let mesh_count = header.mesh_count as usize;

    let header_extension = if header.has_extension() {
        Some(parse_section(
            file_data,
            input,
            "header extension",
            parse_byte_array::<HEADER_EXTENSION_SIZE>,
        )?)
    } else {
        None
    };

    let bones = parse_section(
        file_data,
        input,
        "bones",
        parse_records(bone_count, Bone::parse),
    )?;
    let bone_matrices = parse_section(
        file_data,
        input,
        "bone matrices",
        parse_records(bone_count, Matrix::parse),
    )?;
    let bone_world_matrices = parse_section(
        file_data,
        input,
        "bone world matrices",
        parse_records(bone_count, Matrix::parse),
    )?;
    let bone_trailer = if bone_count > 0 {
        Some(parse_section(
            file_data,
            input,
            "bone trailer",
            parse_bytes(BONE_TRAILER_SIZE),
        )?)
    } else {
        None
    };

    let bone_palettes = parse_section(
        file_data,
        input,
        "bone palettes",
        parse_records(header.bone_palette_count as usize, BonePaletteRecord::parse),
    )?;
    let groups = parse_section(
        file_data,
        input,
        "groups",
        parse_records(header.group_count as usize, GroupData::parse),
    )?;
    let textures = parse_section(
        file_data,
        input,
        "textures",
        parse_records(header.texture_count as usize, TextureName::parse),
    )?;
    let materials = parse_section(
        file_data,
        input,
        "materials",
        parse_records(header.material_count as usize, MaterialRecord::parse),
    )?;
    let meshes = parse_section(
        file_data,
        input,
        "meshes",
        parse_records(mesh_count, MeshRecord::parse),
    )?;
    let mesh_helpers = parse_section(
        file_data,
        input,
        "mesh helpers",
        parse_records(mesh_count * MESH_HELPER_FLOATS + 1, |i: &mut &[u8]| {
            le_f32.parse_next(i)
        }),
    )?;
    let vertex_buffer = parse_section(
        file_data,
        input,
        "vertex buffer",
        parse_bytes(header.vertex_buffer_size as usize),
    )?;
    let vertex_buffer_2 = parse_section(
        file_data,
        input,
        "secondary vertex buffer",
        parse_bytes(header.vertex_buffer_2_size as usize),
    )?;
    let index_count = header.face_count.saturating_sub(1) as usize;
    let index_buffer = parse_section(
        file_data,
        input,
        "index buffer",
        parse_records(index_count, |i: &mut &[u8]| le_u16.parse_next(i)),
    )?;

    if !input.is_empty() {
        debug!(
            trailing = input.len(),
            "ignoring bytes after the index buffer"
        );
    }

    Ok(ModelFile {
        header,
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
    })
}
