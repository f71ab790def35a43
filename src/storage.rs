//
// storage.rs
// XNAT-RTStruct-rs
//
// File store behind the HTTP service: uploaded structure sets and the subsets derived from them.
//

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use tracing::debug;

const DEFAULT_STEM: &str = "rtstruct";

#[derive(Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).context("Failed to create storage directory")?;
        Ok(Self { root })
    }

    /// Store an upload as `<stem>-<hash>.dcm`; uploading the same bytes twice yields the same name.
    pub fn save(&self, original_name: Option<&str>, bytes: &[u8]) -> Result<String> {
        let stem = original_name
            .map(file_stem)
            .unwrap_or_else(|| DEFAULT_STEM.to_string());
        let hash = hex::encode(Sha256::digest(bytes));
        let filename = format!("{}-{}.dcm", stem, &hash[..12]);
        let path = self.root.join(&filename);
        if path.exists() {
            debug!("{filename} already stored");
            return Ok(filename);
        }
        fs::write(&path, bytes).context("Failed to persist uploaded file")?;
        Ok(filename)
    }

    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let candidate = self.root.join(name);
        let canonical_root = self
            .root
            .canonicalize()
            .unwrap_or_else(|_| self.root.clone());
        let canonical = candidate
            .canonicalize()
            .context("Requested file not found")?;
        if !canonical.starts_with(&canonical_root) {
            bail!("Attempt to access file outside storage root");
        }
        Ok(canonical)
    }

    /// Name and path for a file derived from a stored structure set, e.g. `plan-1a2b-subset-<uid>.dcm`.
    pub fn derived_path(&self, source_name: &str, kind: &str, uid: &str) -> (String, PathBuf) {
        let digest = hex::encode(Sha256::digest(uid.as_bytes()));
        let filename = format!(
            "{}-{}-{}.dcm",
            file_stem(source_name),
            sanitize_filename(kind),
            &digest[..8]
        );
        let path = self.root.join(&filename);
        (filename, path)
    }
}

fn file_stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .map(sanitize_filename)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_STEM.to_string())
}

fn sanitize_filename(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}
