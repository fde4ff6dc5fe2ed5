//! Archiving: tars a workflow's on-disk directory (cwl, inputs, metadata,
//! logs) into a compressed archive under `{archive_root}/{wf_id}.tgz`.
//!
//! Partial results during cancellation are not flushed specially here --
//! whatever is on disk at archive time is archived as-is, which already
//! includes anything written before cancellation landed.

use crate::error::WfmError;
use bee_common::WorkflowId;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::path::{Path, PathBuf};

pub fn archive_path(archive_root: &Path, wf_id: WorkflowId) -> PathBuf {
    archive_root.join(format!("{wf_id}.tgz"))
}

/// Tars `workflow_dir` into `{archive_root}/{wf_id}.tgz`. `workflow_dir` need
/// not exist -- an empty workflow produces an empty (header-only) archive,
/// satisfying the zero-task-workflow boundary case.
pub fn write_archive(workflow_dir: &Path, archive_root: &Path, wf_id: WorkflowId) -> Result<PathBuf, WfmError> {
    std::fs::create_dir_all(archive_root)?;
    let dest = archive_path(archive_root, wf_id);
    let file = File::create(&dest)?;
    let enc = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(enc);
    if workflow_dir.exists() {
        builder.append_dir_all(".", workflow_dir)?;
    }
    builder.finish()?;
    Ok(dest)
}
