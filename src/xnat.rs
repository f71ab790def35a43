//
// xnat.rs
// XNAT-RTStruct-rs
//
// Blocking XNAT REST client used as the image repository, with a local cache of downloaded scan files.
//

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use dicom::core::Tag;
use dicom::object::OpenFileOptions;
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::dependencies::{ImageRepository, ScanRef, SessionRef};
use crate::error::RepositoryError;

const PIXEL_DATA: Tag = Tag(0x7FE0, 0x0010);
const SOP_INSTANCE_UID: Tag = Tag(0x0008, 0x0018);

#[derive(Debug, Deserialize)]
struct ResultSetEnvelope<T> {
    #[serde(rename = "ResultSet")]
    result_set: ResultSet<T>,
}

#[derive(Debug, Deserialize)]
struct ResultSet<T> {
    #[serde(rename = "Result", default = "Vec::new")]
    result: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ExperimentRow {
    #[serde(rename = "ID")]
    id: String,
    #[serde(default)]
    label: String,
    #[serde(rename = "UID", default)]
    uid: String,
    #[serde(rename = "subject_ID", default)]
    subject_id: String,
    #[serde(default)]
    subject_label: String,
}

#[derive(Debug, Deserialize)]
struct ScanRow {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "UID", default)]
    uid: String,
}

#[derive(Debug, Deserialize)]
struct FileRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "URI")]
    uri: String,
}

pub struct XnatClient {
    base_url: String,
    user: Option<String>,
    password: Option<String>,
    http: Client,
    cache_dir: PathBuf,
    /// SOP Instance UID -> cached file, per "session/scan".
    index: Mutex<HashMap<String, BTreeMap<String, PathBuf>>>,
}

impl XnatClient {
    /// Must be called outside an async context; the blocking client owns its own runtime.
    pub fn new(
        base_url: &str,
        user: Option<String>,
        password: Option<String>,
        cache_dir: PathBuf,
    ) -> Result<Self, RepositoryError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|source| RepositoryError::Request {
                url: base_url.to_string(),
                source,
            })?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            user,
            password,
            http,
            cache_dir,
            index: Mutex::new(HashMap::new()),
        })
    }

    fn get(&self, url: &str) -> Result<Response, RepositoryError> {
        let mut request = self.http.get(url);
        if let Some(user) = &self.user {
            request = request.basic_auth(user, self.password.as_ref());
        }
        let response = request.send().map_err(|source| RepositoryError::Request {
            url: url.to_string(),
            source,
        })?;
        if !response.status().is_success() {
            return Err(RepositoryError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }
        Ok(response)
    }

    fn results<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, RepositoryError> {
        let url = format!("{}{path}", self.base_url);
        debug!("GET {url}");
        let envelope: ResultSetEnvelope<T> = self.get(&url)?.json().map_err(|source| {
            RepositoryError::Body {
                url: url.clone(),
                source,
            }
        })?;
        Ok(envelope.result_set.result)
    }

    fn scan_dir(&self, session: &SessionRef, scan: &ScanRef) -> PathBuf {
        self.cache_dir
            .join(safe_component(&session.session_id))
            .join(safe_component(&scan.id))
    }

    /// Download the scan's DICOM resource unless a previous run already did.
    ///
    /// The scan directory only ever appears complete, see [`populate_atomically`].
    fn download_scan(&self, session: &SessionRef, scan: &ScanRef) -> Result<PathBuf, RepositoryError> {
        let dir = self.scan_dir(session, scan);
        if dir.is_dir() {
            return Ok(dir);
        }

        let files: Vec<FileRow> = self.results(&format!(
            "/data/experiments/{}/scans/{}/resources/DICOM/files?format=json",
            session.session_id, scan.id
        ))?;
        info!(
            "downloading {} file(s) of scan {} in session {}",
            files.len(),
            scan.id,
            session.session_label
        );
        populate_atomically(&dir, |staging| {
            for row in &files {
                let path = staging.join(safe_component(&row.name));
                let url = format!("{}{}", self.base_url, row.uri);
                let mut response = self.get(&url)?;
                let mut file = File::create(&path).map_err(|source| RepositoryError::Cache {
                    path: path.clone(),
                    source,
                })?;
                response
                    .copy_to(&mut file)
                    .map_err(|source| RepositoryError::Body { url, source })?;
            }
            Ok(())
        })?;
        Ok(dir)
    }

    fn lock_index(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<String, BTreeMap<String, PathBuf>>>, RepositoryError> {
        self.index
            .lock()
            .map_err(|_| RepositoryError::Unavailable("file index lock poisoned".into()))
    }

    fn index_scan(dir: &Path) -> BTreeMap<String, PathBuf> {
        let mut index = BTreeMap::new();
        let Ok(entries) = fs::read_dir(dir) else {
            return index;
        };
        for path in entries.filter_map(|e| e.ok()).map(|e| e.path()) {
            let header = OpenFileOptions::new().read_until(PIXEL_DATA).open_file(&path);
            let obj = match header {
                Ok(obj) => obj,
                Err(e) => {
                    warn!("skipping unreadable cached file {}: {e}", path.display());
                    continue;
                }
            };
            let uid = obj
                .element(SOP_INSTANCE_UID)
                .ok()
                .and_then(|e| e.to_str().ok())
                .map(|s| s.trim_matches([' ', '\0']).to_string());
            if let Some(uid) = uid {
                index.insert(uid, path);
            }
        }
        index
    }
}

impl ImageRepository for XnatClient {
    fn sessions_for_studies(
        &self,
        project: &str,
        study_uids: &[String],
    ) -> Result<Vec<SessionRef>, RepositoryError> {
        let rows: Vec<ExperimentRow> = self.results(&format!(
            "/data/projects/{project}/experiments?xsiType=xnat:imageSessionData&columns=ID,label,UID,subject_ID,subject_label&format=json"
        ))?;
        Ok(rows
            .into_iter()
            .filter(|row| study_uids.contains(&row.uid))
            .map(|row| SessionRef {
                project: project.to_string(),
                subject_id: row.subject_id,
                subject_label: row.subject_label,
                session_id: row.id,
                session_label: row.label,
                study_uid: row.uid,
            })
            .collect())
    }

    fn scans_for_series(
        &self,
        session: &SessionRef,
        series_uids: &[String],
    ) -> Result<Vec<ScanRef>, RepositoryError> {
        let rows: Vec<ScanRow> = self.results(&format!(
            "/data/experiments/{}/scans?columns=ID,UID&format=json",
            session.session_id
        ))?;
        Ok(rows
            .into_iter()
            .filter(|row| series_uids.contains(&row.uid))
            .map(|row| ScanRef {
                id: row.id,
                series_uid: row.uid,
            })
            .collect())
    }

    fn local_file(
        &self,
        session: &SessionRef,
        scan: &ScanRef,
        sop_instance_uid: &str,
    ) -> Result<Option<PathBuf>, RepositoryError> {
        let key = format!("{}/{}", session.session_id, scan.id);
        if let Some(files) = self.lock_index()?.get(&key) {
            return Ok(files.get(sop_instance_uid).cloned());
        }

        // Downloads run without the lock so different scans are fetched in parallel.
        let dir = self.download_scan(session, scan)?;
        let files = Self::index_scan(&dir);
        let found = files.get(sop_instance_uid).cloned();
        self.lock_index()?.entry(key).or_insert(files);
        Ok(found)
    }
}

/// Fill `dir` through a uniquely named staging sibling that is renamed into place on success.
///
/// A failed `fill` removes the staging directory, so an interrupted download is
/// retried on the next run instead of being mistaken for a complete one.
fn populate_atomically(
    dir: &Path,
    fill: impl FnOnce(&Path) -> Result<(), RepositoryError>,
) -> Result<(), RepositoryError> {
    let parent = dir.parent().unwrap_or_else(|| Path::new("."));
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let staging = parent.join(format!(".{name}.{}.partial", uuid::Uuid::new_v4().simple()));
    fs::create_dir_all(&staging).map_err(cache_error(&staging))?;

    if let Err(e) = fill(&staging) {
        if let Err(cleanup) = fs::remove_dir_all(&staging) {
            warn!("could not remove {}: {cleanup}", staging.display());
        }
        return Err(e);
    }

    match fs::rename(&staging, dir) {
        Ok(()) => Ok(()),
        // Another worker finished the same scan first; its copy is as good as ours.
        Err(_) if dir.is_dir() => {
            debug!("{} already populated, discarding {}", dir.display(), staging.display());
            fs::remove_dir_all(&staging).map_err(cache_error(&staging))
        }
        Err(source) => {
            if let Err(cleanup) = fs::remove_dir_all(&staging) {
                warn!("could not remove {}: {cleanup}", staging.display());
            }
            Err(cache_error(dir)(source))
        }
    }
}

fn cache_error(path: &Path) -> impl FnOnce(io::Error) -> RepositoryError {
    let path = path.to_path_buf();
    move |source| RepositoryError::Cache { path, source }
}

fn safe_component(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}
