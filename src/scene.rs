//! Scene snapshot handed over by the host editor.
//!
//! These types are plain data: the editor integration fills them in from its
//! scene graph and the exporter never mutates them.

use bon::Builder;

/// Where an object was originally imported from.
///
/// Objects without provenance were not created by an import and cannot be
/// exported, since the original file supplies fields this crate cannot
/// regenerate.
#[derive(Builder, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Provenance {
    /// Folder of the file inside its archive, backslash separated.
    #[builder(into)]
    pub folder: String,
    /// Importer file type tag, e.g. `mtframework.mod`.
    #[builder(into)]
    pub file_type: String,
    /// Bytes of the original file.
    #[builder(default)]
    pub data: Vec<u8>,
}

/// Import metadata attached to a texture.
#[derive(Builder, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextureProvenance {
    /// Folder of the texture inside its archive, backslash separated.
    #[builder(into)]
    pub folder: String,
    /// Material slot the texture was imported into (0 = diffuse, 1 = normal, ...).
    pub slot: u8,
    /// Unknown scalars of the original TEX file, if they were kept.
    pub values: Option<[f32; 4]>,
}

#[derive(Builder, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SceneTexture {
    /// Unique name of the texture in the scene.
    #[builder(into)]
    pub name: String,
    /// Path of the image backing the texture, e.g. `//textures/pl0000_BM.dds`.
    #[builder(into)]
    pub image_path: String,
    pub provenance: Option<TextureProvenance>,
}

#[derive(Builder, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SceneMaterial {
    /// Unique name of the material in the scene.
    #[builder(into)]
    pub name: String,
    /// Texture slots in editor order. Empty slots are `None`.
    #[builder(default)]
    pub textures: Vec<Option<SceneTexture>>,
}

/// A single bone influence on a vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoneInfluence {
    /// Global bone index in the skeleton.
    pub bone: u32,
    pub weight: f32,
}

impl BoneInfluence {
    pub fn new(bone: u32, weight: f32) -> Self {
        Self { bone, weight }
    }
}

#[derive(Builder, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SceneMesh {
    /// Object name. A trailing `LOD_<n>` selects the level of detail.
    #[builder(into)]
    pub name: String,
    /// Vertex positions in scene space (Z up).
    pub positions: Vec<[f32; 3]>,
    /// Bone influences per vertex. Empty when the mesh is not skinned.
    #[builder(default)]
    pub influences: Vec<Vec<BoneInfluence>>,
    /// First UV layer, one entry per vertex. Empty when the mesh has no UVs.
    #[builder(default)]
    pub uvs: Vec<Option<[f32; 2]>>,
    /// Polygons as loops of vertex indices.
    #[builder(default)]
    pub polygons: Vec<Vec<u32>>,
    pub material: Option<SceneMaterial>,
}

/// Child of an exported object.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SceneNode {
    Mesh(SceneMesh),
    /// Placeholder left behind by a mesh that failed to import. Only
    /// contributes to the bounding box.
    Empty { name: String, location: [f32; 3] },
}

impl SceneNode {
    pub fn as_mesh(&self) -> Option<&SceneMesh> {
        match self {
            SceneNode::Mesh(mesh) => Some(mesh),
            SceneNode::Empty { .. } => None,
        }
    }
}

/// Object that becomes one MOD file.
#[derive(Builder, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SceneObject {
    #[builder(into)]
    pub name: String,
    pub provenance: Option<Provenance>,
    #[builder(default)]
    pub children: Vec<SceneNode>,
}

impl SceneObject {
    pub fn meshes(&self) -> impl Iterator<Item = &SceneMesh> {
        self.children.iter().filter_map(SceneNode::as_mesh)
    }

    #[cfg(feature = "json")]
    pub fn from_json(json: &str) -> Result<Self, crate::error::ExportError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Archive root whose children each become one MOD file.
#[derive(Builder, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SceneArchive {
    #[builder(into)]
    pub name: String,
    pub provenance: Option<Provenance>,
    #[builder(default)]
    pub models: Vec<SceneObject>,
}
