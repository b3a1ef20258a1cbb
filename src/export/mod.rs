//! Conversion of scene objects into MOD v156 files.
//!
//! [`export_mod156`] drives the whole pipeline for one object. The object must
//! come from an imported MOD file: bones, groups, the secondary vertex buffer
//! and a handful of unknown header fields are copied from that file, while
//! everything derived from the meshes is rebuilt.

pub mod archive;
pub mod bone_palette;
pub mod bounding_box;
pub mod materials;
pub mod strips;
pub mod texture;
pub mod vertices;

use std::sync::LazyLock;

use regex::Regex;
use rootcause::Report;
use tracing::{debug, warn};

use crate::error::{ExportError, ExportResult};
use crate::models::mod156::{
    MAGIC, MESH_HELPER_FLOATS, MESH_HELPER_SHAPE, MeshRecord, ModelFile, REVISION, VERSION,
    VERTEX_STRIDE,
};
use crate::models::parser::parse_mod156;
use crate::scene::{SceneMesh, SceneNode, SceneObject};

use bone_palette::{build_bone_palettes, palette_for_mesh};
use bounding_box::BoundingBox;
use materials::build_material_table;
use strips::{check_vertex_count, mesh_strip};
use texture::{TextureExport, texture_exports};
use vertices::encode_vertices;

/// Importer tag of objects that come from a MOD file.
pub const MOD_FILE_TYPE: &str = "mtframework.mod";
/// Level of detail of meshes whose name has no `LOD_<n>` suffix.
pub const DEFAULT_LEVEL_OF_DETAIL: u8 = 1;

static LEVEL_OF_DETAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r".*LOD_(\d+)$").expect("level of detail pattern is valid"));

/// A serialized model and the texture files it references.
#[derive(Debug, Clone)]
pub struct ExportedModel {
    pub bytes: Vec<u8>,
    pub model: ModelFile,
    pub textures: Vec<TextureExport>,
}

/// Export `object` and its children to a MOD v156 file.
///
/// Nothing is returned unless every mesh was encoded successfully.
pub fn export_mod156(object: &SceneObject) -> Result<ExportedModel, Report<ExportError>> {
    export_object(object).map_err(Report::new)
}

pub(crate) fn export_object(object: &SceneObject) -> ExportResult<ExportedModel> {
    let provenance = object
        .provenance
        .as_ref()
        .ok_or_else(|| ExportError::MissingProvenance(object.name.clone()))?;
    let donor = parse_mod156(&provenance.data).map_err(|report| ExportError::DonorParse {
        object: object.name.clone(),
        detail: report.to_string(),
    })?;

    let (model, textures) = assemble_model(&object.children, &donor)?;
    let bytes = model.to_bytes();
    debug!(
        object = %object.name,
        size = bytes.len(),
        meshes = model.meshes.len(),
        "exported model"
    );

    Ok(ExportedModel {
        bytes,
        model,
        textures,
    })
}

/// Level of detail encoded in a mesh name, e.g. `pl0000_LOD_2`.
pub fn infer_level_of_detail(name: &str) -> u8 {
    let Some(digits) = LEVEL_OF_DETAIL.captures(name).and_then(|c| c.get(1)) else {
        return DEFAULT_LEVEL_OF_DETAIL;
    };
    digits.as_str().parse().unwrap_or_else(|_| {
        warn!(name, "level of detail does not fit a byte, using the default");
        DEFAULT_LEVEL_OF_DETAIL
    })
}

fn to_u16(value: usize) -> ExportResult<u16> {
    u16::try_from(value).map_err(|_| ExportError::TooManyVertices { count: value })
}

/// Mesh helper array: a count word holding the mesh count in its low byte(s),
/// then one copy of [`MESH_HELPER_SHAPE`] per mesh.
pub fn mesh_helpers(mesh_count: usize) -> Vec<f32> {
    let mut helpers = Vec::with_capacity(1 + mesh_count * MESH_HELPER_FLOATS);
    helpers.push(f32::from_bits(mesh_count as u32));
    for _ in 0..mesh_count {
        helpers.extend_from_slice(&MESH_HELPER_SHAPE);
    }
    helpers
}

/// Build a complete model from `children`, copying what cannot be rebuilt
/// from `donor`.
pub fn assemble_model(
    children: &[SceneNode],
    donor: &ModelFile,
) -> ExportResult<(ModelFile, Vec<TextureExport>)> {
    let meshes: Vec<&SceneMesh> = children.iter().filter_map(SceneNode::as_mesh).collect();
    let mesh_count = u16::try_from(meshes.len()).map_err(|_| ExportError::TooManyMeshes {
        count: meshes.len(),
    })?;
    let bbox = BoundingBox::from_nodes(children);
    let vertex_count: usize = meshes.iter().map(|mesh| mesh.positions.len()).sum();
    check_vertex_count(vertex_count)?;

    let material_table = build_material_table(&meshes)?;
    let palettes = build_bone_palettes(&meshes)?;

    let mut records = Vec::with_capacity(meshes.len());
    let mut vertex_buffer = Vec::with_capacity(vertex_count * VERTEX_STRIDE);
    let mut index_buffer: Vec<u16> = Vec::new();
    let mut vertex_position = 0usize;

    for (mesh_index, mesh) in meshes.iter().enumerate() {
        let (palette_index, palette) = palette_for_mesh(&palettes, mesh_index)?;
        let material_index = material_table.material_index(mesh)?;
        let encoded = encode_vertices(mesh, mesh_index, &bbox, palette_index, palette)?;
        let strip = mesh_strip(mesh, vertex_position)?;
        let count = mesh.positions.len();

        records.push(MeshRecord {
            material_index,
            constant: 1,
            level_of_detail: infer_level_of_detail(&mesh.name),
            vertex_format: encoded.format.id(),
            vertex_stride: VERTEX_STRIDE as u8,
            vertex_count: to_u16(count)?,
            vertex_index_end: to_u16((vertex_position + count).saturating_sub(1))?,
            vertex_index_start_1: vertex_position as u32,
            face_position: index_buffer.len() as u32,
            face_count: strip.len() as u32,
            vertex_index_start_2: to_u16(vertex_position)?,
            vertex_group_count: 1,
            bone_palette_index: palette_index as u8,
            ..MeshRecord::default()
        });
        debug!(
            mesh = %mesh.name,
            mesh_index,
            format = ?encoded.format,
            vertices = count,
            indices = strip.len(),
            palette = palette_index,
            "encoded mesh"
        );

        encoded.write(&mut vertex_buffer);
        index_buffer.extend(strip);
        vertex_position += count;
    }

    let mut header = donor.header.clone();
    header.magic = MAGIC;
    header.version = VERSION;
    header.revision = REVISION;
    header.mesh_count = mesh_count;
    header.material_count = material_table.material_count()?;
    header.vertex_count = vertex_count as u32;
    header.face_count = index_buffer.len() as u32 + 1;
    header.edge_count = 0;
    header.vertex_buffer_size = vertex_buffer.len() as u32;
    header.vertex_buffer_2_size = donor.vertex_buffer_2.len() as u32;
    header.texture_count = material_table.texture_names.len() as u32;
    header.bone_palette_count = palettes.len() as u32;

    let mut model = ModelFile {
        header,
        header_extension: donor.header_extension,
        bones: donor.bones.clone(),
        bone_matrices: donor.bone_matrices.clone(),
        bone_world_matrices: donor.bone_world_matrices.clone(),
        bone_trailer: donor.bone_trailer.clone(),
        bone_palettes: palettes.iter().map(|palette| palette.to_record()).collect(),
        groups: donor.groups.clone(),
        textures: material_table.texture_names.clone(),
        materials: material_table.materials.clone(),
        meshes: records,
        mesh_helpers: mesh_helpers(meshes.len()),
        vertex_buffer,
        vertex_buffer_2: donor.vertex_buffer_2.clone(),
        index_buffer,
    };

    let layout = model.layout();
    let header = &mut model.header;
    header.bones_offset = if model.bones.is_empty() {
        0
    } else {
        layout.bones as u32
    };
    header.groups_offset = layout.groups as u32;
    header.textures_offset = layout.textures as u32;
    header.meshes_offset = layout.meshes as u32;
    header.vertex_buffer_offset = layout.vertex_buffer as u32;
    header.vertex_buffer_2_offset = layout.vertex_buffer_2 as u32;
    header.index_buffer_offset = layout.index_buffer as u32;

    Ok((model, texture_exports(&material_table.textures)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::mod156::{
        BONE_TRAILER_SIZE, Bone, GroupData, HEADER_EXTENSION_SIZE, Header, Matrix,
    };
    use crate::models::vertex_format::VertexFormat;
    use crate::scene::{
        BoneInfluence, Provenance, SceneMaterial, SceneTexture, TextureProvenance,
    };

    /// A previously imported model with two bones and every optional section.
    pub(crate) fn donor_model() -> ModelFile {
        let bone = |parent| Bone {
            anim_map_index: 0,
            parent_index: parent,
            mirror_index: 0,
            palette_index: 0,
            unk_01: 0.5,
            parent_distance: 1.0,
            location: [0.0, 1.0, 0.0],
        };
        let mut header = Header {
            bone_count: 2,
            group_count: 1,
            vertex_buffer_2_size: 8,
            reserved_01: 11,
            reserved_02: 22,
            reserved_03: 33,
            sphere: [0.0, 1.0, 0.0, 2.0],
            box_min: [-1.0, -1.0, -1.0, 0.0],
            box_max: [1.0, 1.0, 1.0, 0.0],
            ..Header::default()
        };
        header.unknowns[7] = 5;
        header.unknowns[0] = 0xCAFE;

        ModelFile {
            header,
            header_extension: Some([3u8; HEADER_EXTENSION_SIZE]),
            bones: vec![bone(255), bone(0)],
            bone_matrices: vec![Matrix([1.0; 16]), Matrix([2.0; 16])],
            bone_world_matrices: vec![Matrix([3.0; 16]), Matrix([4.0; 16])],
            bone_trailer: Some(vec![0x5A; BONE_TRAILER_SIZE]),
            bone_palettes: Vec::new(),
            groups: vec![GroupData {
                group_index: 7,
                values: [0.25; 7],
            }],
            textures: Vec::new(),
            materials: Vec::new(),
            meshes: Vec::new(),
            mesh_helpers: mesh_helpers(0),
            vertex_buffer: Vec::new(),
            vertex_buffer_2: vec![1, 2, 3, 4, 5, 6, 7, 8],
            index_buffer: Vec::new(),
        }
    }

    pub(crate) fn skin_material() -> SceneMaterial {
        let texture = SceneTexture::builder()
            .name("pl0000_BM")
            .image_path("//textures/pl0000_BM.dds")
            .provenance(
                TextureProvenance::builder()
                    .folder("pawn\\pl\\pl00\\model")
                    .slot(0)
                    .build(),
            )
            .build();
        SceneMaterial::builder()
            .name("skin")
            .textures(vec![Some(texture)])
            .build()
    }

    pub(crate) fn scene_children() -> Vec<SceneNode> {
        let body = SceneMesh::builder()
            .name("body")
            .positions(vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 0.0, 1.0],
                [0.0, 0.0, 1.0],
            ])
            .influences(vec![
                vec![BoneInfluence::new(0, 1.0)],
                vec![BoneInfluence::new(0, 0.5), BoneInfluence::new(1, 0.5)],
                vec![BoneInfluence::new(1, 1.0)],
                vec![BoneInfluence::new(1, 1.0)],
            ])
            .uvs(vec![Some([0.0, 0.0]); 4])
            .polygons(vec![vec![0, 1, 2, 3]])
            .material(skin_material())
            .build();
        let head = SceneMesh::builder()
            .name("head_LOD_2")
            .positions(vec![[0.0, 1.0, 2.0], [0.5, 1.0, 2.0], [0.0, 1.5, 2.0]])
            .polygons(vec![vec![0, 1, 2]])
            .material(skin_material())
            .build();
        vec![
            SceneNode::Mesh(body),
            SceneNode::Empty {
                name: "failed_import".to_string(),
                location: [0.0, -2.0, 0.0],
            },
            SceneNode::Mesh(head),
        ]
    }

    pub(crate) fn scene_object(donor: &ModelFile) -> SceneObject {
        SceneObject::builder()
            .name("pl0000")
            .provenance(
                Provenance::builder()
                    .folder("pawn\\pl\\pl00\\model")
                    .file_type(MOD_FILE_TYPE)
                    .data(donor.to_bytes())
                    .build(),
            )
            .children(scene_children())
            .build()
    }

    #[test]
    fn level_of_detail_suffix() {
        assert_eq!(infer_level_of_detail("head_LOD_2"), 2);
        assert_eq!(infer_level_of_detail("LOD_12"), 12);
        assert_eq!(infer_level_of_detail("body"), 1);
        assert_eq!(infer_level_of_detail("LOD_2_body"), 1);
        assert_eq!(infer_level_of_detail("body_LOD_999"), 1);
    }

    #[test]
    fn mesh_helper_count_word() {
        let helpers = mesh_helpers(3);
        assert_eq!(helpers.len(), 3 * MESH_HELPER_FLOATS + 1);
        assert_eq!(helpers[0].to_bits().to_le_bytes(), [3, 0, 0, 0]);
        assert_eq!(&helpers[1..1 + MESH_HELPER_FLOATS], &MESH_HELPER_SHAPE);
    }

    #[test]
    fn header_offsets_match_written_sections() {
        let exported = export_mod156(&scene_object(&donor_model())).unwrap();
        let parsed = parse_mod156(&exported.bytes).unwrap();
        let layout = parsed.layout();
        let header = &parsed.header;

        assert_eq!(exported.bytes.len(), layout.end);
        assert_eq!(header.bones_offset as usize, layout.bones);
        assert_eq!(header.groups_offset as usize, layout.groups);
        assert_eq!(header.textures_offset as usize, layout.textures);
        assert_eq!(header.meshes_offset as usize, layout.meshes);
        assert_eq!(header.vertex_buffer_offset as usize, layout.vertex_buffer);
        assert_eq!(header.vertex_buffer_2_offset as usize, layout.vertex_buffer_2);
        assert_eq!(header.index_buffer_offset as usize, layout.index_buffer);
        assert_eq!(parsed, exported.model);
    }

    #[test]
    fn passthrough_fields_survive() {
        let donor = donor_model();
        let exported = export_mod156(&scene_object(&donor)).unwrap();
        let parsed = parse_mod156(&exported.bytes).unwrap();

        assert_eq!(parsed.header_extension, donor.header_extension);
        assert_eq!(parsed.bones, donor.bones);
        assert_eq!(parsed.bone_matrices, donor.bone_matrices);
        assert_eq!(parsed.bone_world_matrices, donor.bone_world_matrices);
        assert_eq!(parsed.bone_trailer, donor.bone_trailer);
        assert_eq!(parsed.groups, donor.groups);
        assert_eq!(parsed.vertex_buffer_2, donor.vertex_buffer_2);
        assert_eq!(parsed.header.sphere, donor.header.sphere);
        assert_eq!(parsed.header.box_min, donor.header.box_min);
        assert_eq!(parsed.header.box_max, donor.header.box_max);
        assert_eq!(parsed.header.unknowns, donor.header.unknowns);
        assert_eq!(parsed.header.reserved_01, 11);
        assert_eq!(parsed.header.reserved_03, 33);
        assert_eq!(parsed.header.bone_count, 2);
        assert_eq!(parsed.header.group_count, 1);
    }

    #[test]
    fn built_sections() {
        let exported = export_mod156(&scene_object(&donor_model())).unwrap();
        let model = &exported.model;

        assert_eq!(model.header.mesh_count, 2);
        assert_eq!(model.header.vertex_count, 7);
        assert_eq!(model.vertex_buffer.len(), 7 * VERTEX_STRIDE);
        assert_eq!(model.header.face_count as usize, model.index_buffer.len() + 1);
        assert_eq!(model.header.material_count, 1);
        assert_eq!(model.header.texture_count, 1);
        assert_eq!(model.textures[0].as_string(), "pawn\\pl\\pl00\\model\\pl0000_BM");
        assert_eq!(model.materials[0].texture_indices[0], 1);
        assert_eq!(model.bone_palettes.len(), 1);
        assert_eq!(model.bone_palettes[0].used(), &[0, 1]);

        let [body, head] = [model.meshes[0], model.meshes[1]];
        assert_eq!(body.vertex_format, VertexFormat::Skinned4 { influences: 2 }.id());
        assert_eq!(body.level_of_detail, 1);
        assert_eq!(body.vertex_index_end, 3);
        assert_eq!(body.face_position, 0);
        assert_eq!(head.vertex_format, VertexFormat::Static.id());
        assert_eq!(head.level_of_detail, 2);
        assert_eq!(head.vertex_index_start_1, 4);
        assert_eq!(head.vertex_index_start_2, 4);
        assert_eq!(head.vertex_index_end, 6);
        assert_eq!(head.face_position, body.face_count);
        assert_eq!(head.constant, 1);
        assert_eq!(head.vertex_group_count, 1);

        let head_indices = &model.index_buffer[head.face_position as usize..];
        assert_eq!(head_indices, &[4, 5, 6]);

        assert_eq!(exported.textures.len(), 1);
        assert_eq!(exported.textures[0].file_name, "pl0000_BM.tex");
    }

    #[test]
    fn model_without_bones_has_no_bone_offset() {
        let mut donor = donor_model();
        donor.header.bone_count = 0;
        donor.bones.clear();
        donor.bone_matrices.clear();
        donor.bone_world_matrices.clear();
        donor.bone_trailer = None;

        let children = scene_children()
            .into_iter()
            .map(|node| match node {
                SceneNode::Mesh(mut mesh) => {
                    mesh.influences.clear();
                    SceneNode::Mesh(mesh)
                }
                other => other,
            })
            .collect::<Vec<_>>();
        let (model, _) = assemble_model(&children, &donor).unwrap();
        assert_eq!(model.header.bones_offset, 0);
        assert!(model.header.groups_offset > 0);
        assert_eq!(model.bone_palettes[0].count, 0);
    }

    #[test]
    fn missing_provenance_is_rejected() {
        let object = SceneObject::builder()
            .name("loose")
            .children(scene_children())
            .build();
        assert!(export_mod156(&object).is_err());
        assert!(matches!(
            export_object(&object),
            Err(ExportError::MissingProvenance(name)) if name == "loose"
        ));
    }

    #[test]
    fn corrupt_donor_is_rejected() {
        let mut object = scene_object(&donor_model());
        if let Some(provenance) = object.provenance.as_mut() {
            provenance.data.truncate(40);
        }
        assert!(matches!(
            export_object(&object),
            Err(ExportError::DonorParse { .. })
        ));
    }

    #[test]
    fn polygon_reaching_into_next_mesh_aborts_export() {
        let triangle = |name: &str, polygon: Vec<u32>| {
            SceneNode::Mesh(
                SceneMesh::builder()
                    .name(name)
                    .positions(vec![[0.0; 3]; 3])
                    .polygons(vec![polygon])
                    .material(skin_material())
                    .build(),
            )
        };
        let children = vec![triangle("a", vec![0, 1, 5]), triangle("b", vec![0, 1, 2])];
        let err = assemble_model(&children, &donor_model()).unwrap_err();
        assert!(matches!(
            err,
            ExportError::InvalidPolygonIndex { index: 5, vertex_count: 3, .. }
        ));
    }

    #[test]
    fn mesh_count_must_fit_the_header() {
        let children = (0..=u16::MAX as usize)
            .map(|_| SceneNode::Mesh(SceneMesh::builder().name("m").positions(Vec::new()).build()))
            .collect::<Vec<_>>();
        let err = assemble_model(&children, &donor_model()).unwrap_err();
        assert!(matches!(err, ExportError::TooManyMeshes { count: 65536 }));
    }

    #[test]
    fn mesh_without_material_aborts_export() {
        let mut children = scene_children();
        if let SceneNode::Mesh(mesh) = &mut children[2] {
            mesh.material = None;
        }
        let err = assemble_model(&children, &donor_model()).unwrap_err();
        assert!(matches!(err, ExportError::MissingMaterial(name) if name == "head_LOD_2"));
    }
}
