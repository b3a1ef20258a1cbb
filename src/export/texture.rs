//! Sibling texture files that must be written next to an exported model.
//!
//! Converting the source images to the engine's TEX format is left to the
//! archive packer; this module only says which files are needed and with
//! which extra values.

use crate::export::materials::basename;
use crate::scene::SceneTexture;

pub const TEX_EXTENSION: &str = "tex";

/// One TEX file to produce from a scene texture.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextureExport {
    /// File name of the TEX file, placed in the folder of the model.
    pub file_name: String,
    /// Image the TEX file is converted from.
    pub image_path: String,
    /// Unknown scalars to restore in the TEX header, when they were kept at import.
    pub values: Option<[f32; 4]>,
}

impl TextureExport {
    pub fn from_texture(texture: &SceneTexture) -> Self {
        Self {
            file_name: tex_file_name(&texture.image_path),
            image_path: texture.image_path.clone(),
            values: texture.provenance.as_ref().and_then(|p| p.values),
        }
    }
}

/// `pl0000_BM.dds` becomes `pl0000_BM.tex`.
pub fn tex_file_name(image_path: &str) -> String {
    let name = basename(image_path);
    let stem = match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    };
    format!("{stem}.{TEX_EXTENSION}")
}

/// One export request per texture, in texture table order.
pub fn texture_exports(textures: &[SceneTexture]) -> Vec<TextureExport> {
    textures.iter().map(TextureExport::from_texture).collect()
}
