use thiserror::Error;

/// Errors raised while turning a scene snapshot into a MOD file.
///
/// Everything except [`ExportError::Internal`] is caused by the input scene and
/// can be fixed by the user. Any error aborts the whole export of the object.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Object '{0}' did not come from an imported file")]
    MissingProvenance(String),
    #[error("Object '{object}' has file type '{found}', expected '{expected}'")]
    UnexpectedFileType {
        object: String,
        found: String,
        expected: &'static str,
    },
    #[error("Original file of object '{object}' could not be parsed: {detail}")]
    DonorParse { object: String, detail: String },
    #[error("Mesh '{0}' has no material")]
    MissingMaterial(String),
    #[error("Mesh '{mesh}' is influenced by {count} bones, at most {max} are supported")]
    TooManyBones {
        mesh: String,
        count: usize,
        max: usize,
    },
    #[error("Mesh '{mesh}' references bone {bone}, palettes can only address bones 0-255")]
    BoneIndexOutOfRange { mesh: String, bone: u32 },
    #[error("Model needs {count} bone palettes, meshes can only address 256")]
    TooManyBonePalettes { count: usize },
    #[error(
        "Mesh '{mesh}' contains a vertex weighted by {count} bones, at most {max} are supported"
    )]
    TooManyInfluences {
        mesh: String,
        count: usize,
        max: usize,
    },
    #[error("Model has {count} vertices, 16-bit indices can address at most 65536")]
    TooManyVertices { count: usize },
    #[error("Mesh '{mesh}' has a polygon using vertex {index}, but only {vertex_count} vertices")]
    InvalidPolygonIndex {
        mesh: String,
        index: u32,
        vertex_count: usize,
    },
    #[error("Model has {count} meshes, at most 65535 fit")]
    TooManyMeshes { count: usize },
    #[error("Model uses {count} materials, at most 65535 fit")]
    TooManyMaterials { count: usize },
    #[error("Texture '{0}' was not imported from an original file")]
    TextureMissingProvenance(String),
    #[error("Texture path '{0}' is not plain ASCII")]
    TexturePathNotAscii(String),
    #[error("Texture path '{path}' is {len} bytes long, at most 64 fit")]
    TexturePathTooLong { path: String, len: usize },
    #[error("Texture '{texture}' uses slot {slot}, materials only have 8 slots")]
    InvalidTextureSlot { texture: String, slot: u8 },
    #[cfg(feature = "json")]
    #[error("Error deserializing scene json: {err}")]
    SerdeJson {
        #[from]
        err: serde_json::Error,
    },
    #[error("Unexpected internal condition: {0}")]
    Internal(#[from] InternalError),
}

/// Invariant violations in data built by this crate, not in the input.
#[derive(Error, Debug)]
pub enum InternalError {
    #[error("bone {bone} of mesh {mesh} is missing from bone palette {palette}")]
    BoneNotInPalette {
        mesh: usize,
        bone: u32,
        palette: usize,
    },
    #[error("mesh {mesh} was not assigned to any bone palette")]
    MeshWithoutPalette { mesh: usize },
    #[error("texture '{0}' is missing from the resolved texture table")]
    TextureNotIndexed(String),
    #[error("material '{0}' is missing from the resolved material table")]
    MaterialNotIndexed(String),
}

impl ExportError {
    /// True when the failure comes from a defect in this crate rather than
    /// from invalid scene data.
    pub fn is_internal(&self) -> bool {
        matches!(self, ExportError::Internal(_))
    }
}

pub type ExportResult<T> = Result<T, ExportError>;
