//
// lib.rs
// XNAT-RTStruct-rs
//
// Exposes the crate's modules and re-exports the main entry points for binary and library consumers.
//

pub mod batch;
pub mod cli;
pub mod codec;
pub mod config;
pub mod dependencies;
pub mod dicom_access;
pub mod entities;
pub mod error;
pub mod models;
pub mod rtstruct;
pub mod storage;
pub mod uid;
pub mod upload;
pub mod validate;
pub mod web;
pub mod xnat;

pub use cli::{run as run_cli, Cli, Commands};
pub use dependencies::{DependencyResolver, ImageReferences, ImageRepository};
pub use error::{RepositoryError, RtStructError};
pub use rtstruct::{EncodedFile, Roi, RtStruct};
