//
// models.rs
// XNAT-RTStruct-rs
//
// Serializable reports shown by the CLI and returned by the HTTP service.
//

use serde::{Deserialize, Serialize};

use crate::error::RtStructError;

/// One row of the ROI table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoiSummary {
    pub number: i32,
    pub name: Option<String>,
    pub interpreted_type: Option<String>,
    pub contour_count: usize,
    pub point_count: usize,
    pub display_color: Option<[i32; 3]>,
    pub has_observation: bool,
}

/// What a successfully parsed structure set contains and references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureSetSummary {
    pub sop_instance_uid: String,
    pub label: String,
    pub name: Option<String>,
    pub patient_id: Option<String>,
    pub patient_name: Option<String>,
    pub study_uids: Vec<String>,
    pub series_uids: Vec<String>,
    pub image_count: usize,
    pub session: Option<String>,
    pub rois: Vec<RoiSummary>,
    pub warnings: Vec<String>,
}

/// Outcome of one parse attempt: every error and every warning, never just the first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub file: String,
    pub valid: bool,
    pub roi_count: Option<usize>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn passed(file: impl Into<String>, summary: &StructureSetSummary) -> Self {
        Self {
            file: file.into(),
            valid: true,
            roi_count: Some(summary.rois.len()),
            errors: Vec::new(),
            warnings: summary.warnings.clone(),
        }
    }

    pub fn failed(file: impl Into<String>, error: &RtStructError) -> Self {
        let mut errors: Vec<String> = error.errors().iter().map(ToString::to_string).collect();
        if let RtStructError::DataFormat { reason, .. } = error {
            errors.insert(0, reason.clone());
        }
        if errors.is_empty() {
            errors.push(error.to_string());
        }
        Self {
            file: file.into(),
            valid: false,
            roi_count: None,
            errors,
            warnings: error.warnings().iter().map(ToString::to_string).collect(),
        }
    }
}
