//! Export of every model inside an imported archive.
//!
//! Packing the members back into the archive container is done by the
//! caller; this module produces the member paths and their new contents.

use rootcause::Report;
use tracing::debug;

use crate::error::{ExportError, ExportResult};
use crate::export::materials::{basename, join_windows};
use crate::export::{ExportedModel, MOD_FILE_TYPE, export_object};
use crate::scene::{SceneArchive, SceneObject};

/// A re-exported model and where it goes inside the archive.
#[derive(Debug, Clone)]
pub struct ArchiveMember {
    /// Backslash separated path inside the archive, e.g. `pawn\pl\pl00\model\pl0000.mod`.
    pub path: String,
    pub exported: ExportedModel,
}

/// Export every model of `archive`. Fails on the first member that cannot be
/// exported, in which case no member is returned.
pub fn export_archive(archive: &SceneArchive) -> Result<Vec<ArchiveMember>, Report<ExportError>> {
    export_members(archive).map_err(Report::new)
}

fn export_members(archive: &SceneArchive) -> ExportResult<Vec<ArchiveMember>> {
    if archive.provenance.is_none() {
        return Err(ExportError::MissingProvenance(archive.name.clone()));
    }

    let members = archive
        .models
        .iter()
        .map(export_member)
        .collect::<ExportResult<Vec<_>>>()?;
    debug!(archive = %archive.name, members = members.len(), "exported archive models");
    Ok(members)
}

/// Archive path of `object`.
pub fn member_path(object: &SceneObject) -> ExportResult<String> {
    let provenance = object
        .provenance
        .as_ref()
        .ok_or_else(|| ExportError::MissingProvenance(object.name.clone()))?;
    if provenance.file_type != MOD_FILE_TYPE {
        return Err(ExportError::UnexpectedFileType {
            object: object.name.clone(),
            found: provenance.file_type.clone(),
            expected: MOD_FILE_TYPE,
        });
    }
    Ok(join_windows(&provenance.folder, basename(&object.name)))
}

fn export_member(object: &SceneObject) -> ExportResult<ArchiveMember> {
    let path = member_path(object)?;
    let exported = export_object(object)?;
    Ok(ArchiveMember { path, exported })
}
