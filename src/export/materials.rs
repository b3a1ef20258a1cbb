//! Texture name table and material records.

use std::collections::HashMap;

use itertools::Itertools;
use tracing::{debug, error};

use crate::error::{ExportError, ExportResult, InternalError};
use crate::models::mod156::{MaterialRecord, TEXTURE_NAME_LEN, TEXTURE_SLOTS, TextureName};
use crate::scene::{SceneMaterial, SceneMesh, SceneTexture};

fn is_separator(c: char) -> bool {
    c == '\\' || c == '/'
}

/// Last path component, accepting both separators.
pub fn basename(path: &str) -> &str {
    path.rsplit(is_separator).next().unwrap_or(path)
}

/// Join two components the way Windows paths are joined: a backslash is
/// inserted unless `folder` is empty or already ends with a separator.
pub fn join_windows(folder: &str, file_name: &str) -> String {
    if folder.is_empty() || folder.ends_with(is_separator) {
        format!("{folder}{file_name}")
    } else {
        format!("{folder}\\{file_name}")
    }
}

/// `path` without the extension of its last component.
///
/// Leading dots of the last component do not start an extension, so
/// `textures\.hidden` is returned unchanged.
pub fn strip_extension(path: &str) -> &str {
    let name_start = path.rfind(is_separator).map_or(0, |i| i + 1);
    let name = &path[name_start..];
    let stem_start = name_start + (name.len() - name.trim_start_matches('.').len());
    match path[stem_start..].rfind('.') {
        Some(dot) => &path[..stem_start + dot],
        None => path,
    }
}

/// In-archive path of a texture, e.g. `pawn\pl\pl00\model\pl0000_BM`.
pub fn texture_path(folder: &str, image_path: &str) -> String {
    strip_extension(&join_windows(folder, basename(image_path))).to_string()
}

/// Encode the path of `texture` as a 64-byte, NUL padded ASCII entry.
pub fn encode_texture_name(texture: &SceneTexture) -> ExportResult<TextureName> {
    let provenance = texture
        .provenance
        .as_ref()
        .ok_or_else(|| ExportError::TextureMissingProvenance(texture.name.clone()))?;
    let path = texture_path(&provenance.folder, &texture.image_path);

    if !path.is_ascii() || path.contains('\0') {
        return Err(ExportError::TexturePathNotAscii(path));
    }
    if path.len() > TEXTURE_NAME_LEN {
        let len = path.len();
        return Err(ExportError::TexturePathTooLong { path, len });
    }

    let mut name = [0u8; TEXTURE_NAME_LEN];
    name[..path.len()].copy_from_slice(path.as_bytes());
    Ok(TextureName(name))
}

/// Texture and material tables of one model.
#[derive(Debug, Clone, Default)]
pub struct MaterialTable {
    /// Distinct scene textures, in table order.
    pub textures: Vec<SceneTexture>,
    pub texture_names: Vec<TextureName>,
    pub materials: Vec<MaterialRecord>,
    /// Material name to record index.
    pub material_indices: HashMap<String, u16>,
}

impl MaterialTable {
    /// Number of material records, as stored in the header.
    pub fn material_count(&self) -> ExportResult<u16> {
        material_slot(self.materials.len())
    }

    /// Index of the material record used by `mesh`.
    pub fn material_index(&self, mesh: &SceneMesh) -> ExportResult<u16> {
        let material = mesh
            .material
            .as_ref()
            .ok_or_else(|| ExportError::MissingMaterial(mesh.name.clone()))?;
        self.material_indices
            .get(&material.name)
            .copied()
            .ok_or_else(|| {
                error!(mesh = %mesh.name, material = %material.name, "material was not indexed");
                InternalError::MaterialNotIndexed(material.name.clone()).into()
            })
    }
}

/// Build the texture and material tables for `meshes`.
///
/// Materials are taken by name in order of first use across the meshes, and
/// textures by name in order of first use across those materials.
pub fn build_material_table(meshes: &[&SceneMesh]) -> ExportResult<MaterialTable> {
    let materials: Vec<&SceneMaterial> = meshes
        .iter()
        .filter_map(|mesh| mesh.material.as_ref())
        .unique_by(|material| material.name.clone())
        .collect();
    let textures: Vec<&SceneTexture> = materials
        .iter()
        .flat_map(|material| material.textures.iter().flatten())
        .unique_by(|texture| texture.name.clone())
        .collect();

    let texture_names = textures
        .iter()
        .map(|texture| encode_texture_name(texture))
        .collect::<ExportResult<Vec<_>>>()?;
    let texture_indices: HashMap<&str, usize> = textures
        .iter()
        .enumerate()
        .map(|(index, texture)| (texture.name.as_str(), index))
        .collect();

    let mut records = Vec::with_capacity(materials.len());
    let mut material_indices = HashMap::with_capacity(materials.len());
    for (index, material) in materials.iter().enumerate() {
        records.push(material_record(material, &texture_indices)?);
        material_indices.insert(material.name.clone(), material_slot(index)?);
    }

    debug!(
        textures = textures.len(),
        materials = records.len(),
        "built material table"
    );

    Ok(MaterialTable {
        textures: textures.into_iter().cloned().collect(),
        texture_names,
        materials: records,
        material_indices,
    })
}

fn material_slot(value: usize) -> ExportResult<u16> {
    u16::try_from(value).map_err(|_| ExportError::TooManyMaterials { count: value })
}

fn material_record(
    material: &SceneMaterial,
    texture_indices: &HashMap<&str, usize>,
) -> ExportResult<MaterialRecord> {
    let mut record = MaterialRecord::default();
    for texture in material.textures.iter().flatten() {
        let provenance = texture
            .provenance
            .as_ref()
            .ok_or_else(|| ExportError::TextureMissingProvenance(texture.name.clone()))?;
        let slot = usize::from(provenance.slot);
        if slot >= TEXTURE_SLOTS {
            return Err(ExportError::InvalidTextureSlot {
                texture: texture.name.clone(),
                slot: provenance.slot,
            });
        }
        let index = texture_indices
            .get(texture.name.as_str())
            .ok_or_else(|| {
                error!(
                    material = %material.name,
                    texture = %texture.name,
                    "texture missing from the texture table"
                );
                ExportError::from(InternalError::TextureNotIndexed(texture.name.clone()))
            })?;
        record.texture_indices[slot] = *index as u32 + 1;
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::TextureProvenance;

    fn texture(name: &str, image: &str, slot: u8) -> SceneTexture {
        SceneTexture::builder()
            .name(name)
            .image_path(image)
            .provenance(
                TextureProvenance::builder()
                    .folder("pawn\\pl\\pl00\\model")
                    .slot(slot)
                    .build(),
            )
            .build()
    }

    fn mesh(name: &str, material: Option<SceneMaterial>) -> SceneMesh {
        SceneMesh::builder()
            .name(name)
            .positions(vec![[0.0; 3]])
            .maybe_material(material)
            .build()
    }

    #[test]
    fn windows_path_helpers() {
        assert_eq!(basename("//textures/pl0000_BM.dds"), "pl0000_BM.dds");
        assert_eq!(basename("C:\\tex\\a.dds"), "a.dds");
        assert_eq!(join_windows("a\\b", "c"), "a\\b\\c");
        assert_eq!(join_windows("a\\b\\", "c"), "a\\b\\c");
        assert_eq!(join_windows("", "c"), "c");
        assert_eq!(strip_extension("a\\b.tar.dds"), "a\\b.tar");
        assert_eq!(strip_extension("a.b\\c"), "a.b\\c");
        assert_eq!(strip_extension("a\\.hidden"), "a\\.hidden");
    }

    #[test]
    fn texture_path_joins_folder_and_stem() {
        assert_eq!(
            texture_path("pawn\\pl\\pl00\\model", "//textures/pl0000_BM.dds"),
            "pawn\\pl\\pl00\\model\\pl0000_BM"
        );
    }

    #[test]
    fn encoded_name_decodes_back() {
        let name = encode_texture_name(&texture("bm", "//x/pl0000_BM.dds", 0)).unwrap();
        assert_eq!(name.as_string(), "pawn\\pl\\pl00\\model\\pl0000_BM");
        assert!(name.0[32..].iter().all(|&b| b == 0));
    }

    #[test]
    fn path_length_boundary() {
        let folder = "pawn\\pl\\pl00\\model";
        // folder + separator + stem, exactly 64 bytes.
        let stem = "a".repeat(TEXTURE_NAME_LEN - folder.len() - 1);
        let fits = texture("fits", &format!("{stem}.dds"), 0);
        let name = encode_texture_name(&fits).unwrap();
        assert_eq!(name.as_string().len(), TEXTURE_NAME_LEN);

        let too_long = texture("long", &format!("{stem}a.dds"), 0);
        let err = encode_texture_name(&too_long).unwrap_err();
        assert!(matches!(err, ExportError::TexturePathTooLong { len: 65, .. }));
    }

    #[test]
    fn rejects_non_ascii_path() {
        let err = encode_texture_name(&texture("t", "//tex/piel_ñ.dds", 0)).unwrap_err();
        assert!(matches!(err, ExportError::TexturePathNotAscii(_)));
    }

    #[test]
    fn rejects_texture_without_provenance() {
        let bare = SceneTexture::builder().name("t").image_path("a.dds").build();
        let material = SceneMaterial::builder()
            .name("m")
            .textures(vec![Some(bare)])
            .build();
        let body = mesh("body", Some(material));
        let err = build_material_table(&[&body]).unwrap_err();
        assert!(matches!(err, ExportError::TextureMissingProvenance(name) if name == "t"));
    }

    #[test]
    fn slot_table_is_one_based() {
        let shared = texture("bm", "bm.dds", 0);
        let first = SceneMaterial::builder()
            .name("skin")
            .textures(vec![Some(shared.clone()), None, Some(texture("nm", "nm.dds", 1))])
            .build();
        let second = SceneMaterial::builder()
            .name("cloth")
            .textures(vec![Some(texture("sm", "sm.dds", 2)), Some(shared)])
            .build();
        let meshes = [
            mesh("a", Some(first.clone())),
            mesh("b", Some(second)),
            mesh("c", Some(first)),
        ];
        let refs: Vec<&SceneMesh> = meshes.iter().collect();
        let table = build_material_table(&refs).unwrap();

        let names: Vec<_> = table.textures.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["bm", "nm", "sm"]);
        assert_eq!(table.materials.len(), 2);
        assert_eq!(&table.materials[0].texture_indices[..3], &[1, 2, 0]);
        assert_eq!(&table.materials[1].texture_indices[..3], &[1, 0, 3]);
        assert_eq!(table.material_index(&meshes[2]).unwrap(), 0);
        assert_eq!(table.material_index(&meshes[1]).unwrap(), 1);
    }

    #[test]
    fn rejects_slot_out_of_range() {
        let material = SceneMaterial::builder()
            .name("m")
            .textures(vec![Some(texture("t", "t.dds", 8))])
            .build();
        let body = mesh("body", Some(material));
        let err = build_material_table(&[&body]).unwrap_err();
        assert!(matches!(err, ExportError::InvalidTextureSlot { slot: 8, .. }));
    }

    #[test]
    fn material_indices_must_fit_16_bits() {
        assert_eq!(material_slot(65535).unwrap(), 65535);
        assert!(matches!(
            material_slot(65536),
            Err(ExportError::TooManyMaterials { count: 65536 })
        ));

        let table = MaterialTable {
            materials: vec![MaterialRecord::default(); 65536],
            ..MaterialTable::default()
        };
        assert!(matches!(
            table.material_count(),
            Err(ExportError::TooManyMaterials { count: 65536 })
        ));
    }

    #[test]
    fn mesh_without_material() {
        let body = mesh("body", None);
        let table = build_material_table(&[&body]).unwrap();
        assert!(table.materials.is_empty());
        let err = table.material_index(&body).unwrap_err();
        assert!(matches!(err, ExportError::MissingMaterial(name) if name == "body"));
    }
}
