//! Serializer for MT Framework MOD (v156) model files.
//!
//! The host editor hands over a [`scene::SceneObject`] snapshot; [`export::export_mod156`]
//! turns it into the bytes of a MOD file, reusing the file the object was
//! originally imported from for the sections that cannot be regenerated.

/// Shared binary parsing helpers
pub mod data;
/// Error definitions
pub mod error;
/// Scene to MOD conversion: bone palettes, vertex encoding, strips, materials and assembly
pub mod export;
/// MOD v156 record schemas, vertex formats and parser
pub mod models;
/// Editor scene snapshot consumed by the exporter
pub mod scene;
