//
// batch.rs
// XNAT-RTStruct-rs
//
// Parallel validation of every RT structure set below a directory.
//

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use dicom::core::Tag;
use dicom::object::OpenFileOptions;
use rayon::prelude::*;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::dependencies::DependencyResolver;
use crate::models::ValidationReport;
use crate::rtstruct::RtStruct;

const PIXEL_DATA: Tag = Tag(0x7FE0, 0x0010);
const MODALITY: Tag = Tag(0x0008, 0x0060);

/// One report per RT-STRUCT file found; other DICOM files are skipped.
pub fn validate_directory(
    dir: &Path,
    resolver: Option<&DependencyResolver<'_>>,
) -> Result<Vec<ValidationReport>> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    let files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map_or(false, |ext| ext == "dcm"))
        .map(|e| e.into_path())
        .collect();
    info!("checking {} file(s) under {}", files.len(), dir.display());

    let mut reports: Vec<ValidationReport> = files
        .par_iter()
        .filter_map(|path| validate_file(path, resolver))
        .collect();
    reports.sort_by(|a, b| a.file.cmp(&b.file));
    Ok(reports)
}

/// `None` when the file is not an RT structure set.
pub fn validate_file(path: &Path, resolver: Option<&DependencyResolver<'_>>) -> Option<ValidationReport> {
    let name = path.display().to_string();
    let obj = match OpenFileOptions::new().read_until(PIXEL_DATA).open_file(path) {
        Ok(obj) => obj,
        Err(e) => {
            return Some(ValidationReport {
                file: name,
                valid: false,
                roi_count: None,
                errors: vec![format!("Failed to open DICOM file: {e}")],
                warnings: Vec::new(),
            })
        }
    };
    let modality = obj.element(MODALITY).ok().and_then(|e| e.to_str().ok());
    if modality.as_deref().map(str::trim) != Some("RTSTRUCT") {
        debug!("skipping {name}: not an RT structure set");
        return None;
    }

    Some(match RtStruct::parse(&obj, resolver) {
        Ok(rtstruct) => ValidationReport::passed(name, &rtstruct.report()),
        Err(e) => ValidationReport::failed(name, &e),
    })
}
