//
// error.rs
// XNAT-RTStruct-rs
//
// Typed errors for the structure set pipeline and the image repository collaborator.
//

use std::path::PathBuf;

use thiserror::Error;

use crate::validate::Diagnostic;

#[derive(Debug, Error)]
pub enum RtStructError {
    /// The object is not a structure set at all, or lacks a whole mandatory sequence.
    #[error("not a usable RT structure set: {reason}{}", list(.errors))]
    DataFormat {
        reason: String,
        errors: Vec<Diagnostic>,
    },
    /// Required data missing or malformed; carries every problem found in one pass.
    #[error("structure set failed validation with {} error(s):{}", .errors.len(), list(.errors))]
    DataRepresentation {
        errors: Vec<Diagnostic>,
        warnings: Vec<Diagnostic>,
    },
    #[error("structure set could not be encoded ({} error(s)):{}", .errors.len(), list(.errors))]
    Encode { errors: Vec<Diagnostic> },
    /// The chosen ROIs cannot stand on their own as a structure set.
    #[error("ROI subset {rois:?} cannot be encoded: {reason}")]
    Subset { rois: Vec<i32>, reason: String },
    #[error("failed to build the file meta group")]
    FileMeta(#[from] dicom::object::meta::Error),
}

impl RtStructError {
    pub fn errors(&self) -> &[Diagnostic] {
        match self {
            RtStructError::DataFormat { errors, .. }
            | RtStructError::DataRepresentation { errors, .. }
            | RtStructError::Encode { errors } => errors,
            RtStructError::Subset { .. } | RtStructError::FileMeta(_) => &[],
        }
    }

    pub fn warnings(&self) -> &[Diagnostic] {
        match self {
            RtStructError::DataRepresentation { warnings, .. } => warnings,
            _ => &[],
        }
    }
}

fn list(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| format!("\n  - {d}"))
        .collect()
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("unexpected response body from {url}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write cached file {}", .path.display())]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
