/// Record schemas and writer for MOD v156 files
pub mod mod156;
/// Parser for MOD v156 files
pub mod parser;
/// Vertex record formats and their attribute layouts
pub mod vertex_format;
