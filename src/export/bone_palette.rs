//! Partitioning of meshes into bone palettes.
//!
//! Skinned vertices address bones through a palette of at most 32 entries, so
//! every mesh is assigned to one palette holding all the bones it uses. Meshes
//! are packed greedily in scene order: a mesh joins the current palette if the
//! union still fits, otherwise the palette is closed and a new one is started.
//! This is not an optimal packing and is not meant to be; the order of the
//! palettes is what mesh records refer to.

use std::collections::BTreeSet;

use tracing::{debug, error};

use crate::error::{ExportError, ExportResult, InternalError};
use crate::models::mod156::{BonePaletteRecord, MAX_PALETTE_BONES};
use crate::scene::SceneMesh;

/// Largest bone index a palette entry can store.
const MAX_BONE_INDEX: u32 = u8::MAX as u32;
/// Mesh records store the palette index in one byte.
const MAX_PALETTES: usize = u8::MAX as usize + 1;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BonePalette {
    /// Sorted global bone indices. The position of a bone is its local index.
    pub bones: Vec<u32>,
    /// Indices of the meshes using this palette.
    pub meshes: BTreeSet<usize>,
}

impl BonePalette {
    /// Local index of a global bone within this palette.
    pub fn local_index(&self, bone: u32) -> Option<u8> {
        self.bones
            .binary_search(&bone)
            .ok()
            .map(|index| index as u8)
    }

    pub fn to_record(&self) -> BonePaletteRecord {
        let mut bones = [0u8; MAX_PALETTE_BONES];
        for (slot, bone) in bones.iter_mut().zip(&self.bones) {
            *slot = *bone as u8;
        }
        BonePaletteRecord {
            count: self.bones.len() as u32,
            bones,
        }
    }
}

/// Distinct bones referenced by any vertex of `mesh`.
pub fn mesh_bones(mesh: &SceneMesh) -> BTreeSet<u32> {
    mesh.influences
        .iter()
        .take(mesh.positions.len())
        .flatten()
        .map(|influence| influence.bone)
        .collect()
}

/// Assign every mesh to exactly one palette, preserving mesh order.
pub fn build_bone_palettes(meshes: &[&SceneMesh]) -> ExportResult<Vec<BonePalette>> {
    let mut palettes = Vec::new();
    let mut current_meshes = BTreeSet::new();
    let mut current_bones = BTreeSet::new();

    for (mesh_index, mesh) in meshes.iter().enumerate() {
        let bones = mesh_bones(mesh);
        if bones.len() > MAX_PALETTE_BONES {
            return Err(ExportError::TooManyBones {
                mesh: mesh.name.clone(),
                count: bones.len(),
                max: MAX_PALETTE_BONES,
            });
        }
        if let Some(&bone) = bones.iter().find(|&&bone| bone > MAX_BONE_INDEX) {
            return Err(ExportError::BoneIndexOutOfRange {
                mesh: mesh.name.clone(),
                bone,
            });
        }

        let union_size = current_bones.union(&bones).count();
        if union_size > MAX_PALETTE_BONES {
            palettes.push(BonePalette {
                bones: std::mem::take(&mut current_bones).into_iter().collect(),
                meshes: std::mem::take(&mut current_meshes),
            });
            current_meshes.insert(mesh_index);
            current_bones = bones;
        } else {
            current_meshes.insert(mesh_index);
            current_bones.extend(bones);
        }
    }

    palettes.push(BonePalette {
        bones: current_bones.into_iter().collect(),
        meshes: current_meshes,
    });

    if palettes.len() > MAX_PALETTES {
        return Err(ExportError::TooManyBonePalettes {
            count: palettes.len(),
        });
    }

    debug!(
        palettes = palettes.len(),
        meshes = meshes.len(),
        "built bone palettes"
    );
    Ok(palettes)
}

/// Palette assigned to mesh `mesh_index`, with its position in the palette list.
pub fn palette_for_mesh(
    palettes: &[BonePalette],
    mesh_index: usize,
) -> ExportResult<(usize, &BonePalette)> {
    palettes
        .iter()
        .enumerate()
        .find(|(_, palette)| palette.meshes.contains(&mesh_index))
        .ok_or_else(|| {
            error!(mesh_index, "mesh missing from every bone palette");
            InternalError::MeshWithoutPalette { mesh: mesh_index }.into()
        })
}
