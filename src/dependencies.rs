//
// dependencies.rs
// XNAT-RTStruct-rs
//
// Cross-checks the images a structure set references against an image repository.
//

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::entities::{ReferencedFrameOfReference, RoiContour, SopReference};
use crate::error::RepositoryError;
use crate::validate::Diagnostics;

const ENTITY: &str = "DependencyResolver";

/// Study, series and image identifiers a structure set points at.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImageReferences {
    pub study_uids: Vec<String>,
    pub series_uids: Vec<String>,
    pub sop_instance_uids: Vec<String>,
    pub series_by_study: BTreeMap<String, Vec<String>>,
    pub series_for_sop: BTreeMap<String, String>,
}

impl ImageReferences {
    /// Gather references in document order from the referenced-study list and the frame of reference tree.
    pub fn collect(studies: &[SopReference], frames: &[ReferencedFrameOfReference]) -> Self {
        let mut references = ImageReferences::default();
        for study in studies {
            push_unique(&mut references.study_uids, &study.sop_instance_uid);
        }
        for frame in frames {
            for study in &frame.studies {
                push_unique(&mut references.study_uids, &study.study_instance_uid);
                let series_list = references
                    .series_by_study
                    .entry(study.study_instance_uid.clone())
                    .or_default();
                for series in &study.series {
                    push_unique(series_list, &series.series_instance_uid);
                    push_unique(&mut references.series_uids, &series.series_instance_uid);
                    for image in &series.contour_images {
                        push_unique(&mut references.sop_instance_uids, &image.sop_instance_uid);
                        references
                            .series_for_sop
                            .entry(image.sop_instance_uid.clone())
                            .or_insert_with(|| series.series_instance_uid.clone());
                    }
                }
            }
        }
        references
    }

    /// Images named only by contours (outside the frame of reference tree) are appended too.
    pub fn add_contour_images(&mut self, roi_contours: &[RoiContour]) {
        for uid in roi_contours.iter().flat_map(RoiContour::image_uids) {
            push_unique(&mut self.sop_instance_uids, uid);
        }
    }

    fn sops_in_series<'a>(&'a self, series_uid: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.sop_instance_uids
            .iter()
            .filter(move |sop| {
                self.series_for_sop.get(sop.as_str()).map(String::as_str) == Some(series_uid)
            })
            .map(String::as_str)
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !value.is_empty() && !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionRef {
    pub project: String,
    pub subject_id: String,
    pub subject_label: String,
    pub session_id: String,
    pub session_label: String,
    pub study_uid: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanRef {
    pub id: String,
    pub series_uid: String,
}

/// Queries the image repository answers for the resolver.
pub trait ImageRepository: Send + Sync {
    /// Image sessions in `project` whose study UID is one of `study_uids`.
    fn sessions_for_studies(
        &self,
        project: &str,
        study_uids: &[String],
    ) -> Result<Vec<SessionRef>, RepositoryError>;

    /// Scans of `session` whose series UID is one of `series_uids`.
    fn scans_for_series(
        &self,
        session: &SessionRef,
        series_uids: &[String],
    ) -> Result<Vec<ScanRef>, RepositoryError>;

    /// Local copy of one image, fetching the scan first when the repository caches remotely held files.
    fn local_file(
        &self,
        session: &SessionRef,
        scan: &ScanRef,
        sop_instance_uid: &str,
    ) -> Result<Option<PathBuf>, RepositoryError>;
}

/// Where in the repository the referenced images live.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dependencies {
    /// Chosen session per referenced study, in reference order.
    pub sessions: Vec<SessionRef>,
    /// Every candidate session for studies matched by more than one.
    pub ambiguities: BTreeMap<String, Vec<SessionRef>>,
    pub scan_for_series: BTreeMap<String, String>,
    pub scan_for_sop: BTreeMap<String, String>,
    pub file_for_sop: BTreeMap<String, PathBuf>,
}

impl Dependencies {
    /// Keep only what the given references still need.
    pub fn restricted_to(&self, references: &ImageReferences) -> Self {
        let studies: BTreeSet<&str> = references.study_uids.iter().map(String::as_str).collect();
        let series: BTreeSet<&str> = references.series_uids.iter().map(String::as_str).collect();
        let sops: BTreeSet<&str> = references
            .sop_instance_uids
            .iter()
            .map(String::as_str)
            .collect();
        Dependencies {
            sessions: self
                .sessions
                .iter()
                .filter(|s| studies.contains(s.study_uid.as_str()))
                .cloned()
                .collect(),
            ambiguities: self
                .ambiguities
                .iter()
                .filter(|(study, _)| studies.contains(study.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            scan_for_series: filter_keys(&self.scan_for_series, &series),
            scan_for_sop: filter_keys(&self.scan_for_sop, &sops),
            file_for_sop: filter_keys(&self.file_for_sop, &sops),
        }
    }
}

fn filter_keys<V: Clone>(map: &BTreeMap<String, V>, keep: &BTreeSet<&str>) -> BTreeMap<String, V> {
    map.iter()
        .filter(|(k, _)| keep.contains(k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Resolves studies to sessions, series to scans and images to local files.
///
/// Repository failures never escape: they become errors in the returned
/// diagnostics so the caller still sees every other problem of the file.
pub struct DependencyResolver<'a> {
    repository: &'a dyn ImageRepository,
    project: String,
    preferred_session: Option<String>,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(repository: &'a dyn ImageRepository, project: impl Into<String>) -> Self {
        Self {
            repository,
            project: project.into(),
            preferred_session: None,
        }
    }

    /// Session ID or label to use when a study matches several sessions.
    pub fn with_session(mut self, session: Option<String>) -> Self {
        self.preferred_session = session;
        self
    }

    pub fn resolve(&self, references: &ImageReferences) -> (Option<Dependencies>, Diagnostics) {
        let mut diagnostics = Diagnostics::default();
        if references.study_uids.is_empty() {
            diagnostics.warning(ENTITY, "no study is referenced, nothing to resolve");
            return (None, diagnostics);
        }

        let candidates = match self
            .repository
            .sessions_for_studies(&self.project, &references.study_uids)
        {
            Ok(candidates) => candidates,
            Err(e) => {
                diagnostics.error(
                    ENTITY,
                    format!("session lookup in project {} failed: {e}", self.project),
                );
                return (None, diagnostics);
            }
        };

        let mut dependencies = Dependencies::default();
        for study_uid in &references.study_uids {
            self.choose_session(study_uid, references, &candidates, &mut dependencies, &mut diagnostics);
        }

        let subjects: BTreeSet<&str> = dependencies
            .sessions
            .iter()
            .map(|s| s.subject_id.as_str())
            .collect();
        if subjects.len() > 1 {
            diagnostics.warning(
                ENTITY,
                format!(
                    "referenced studies belong to {} different subjects",
                    subjects.len()
                ),
            );
        }

        for session in dependencies.sessions.clone() {
            let Some(series_uids) = references.series_by_study.get(&session.study_uid) else {
                continue;
            };
            self.resolve_scans(&session, series_uids, references, &mut dependencies, &mut diagnostics);
        }

        info!(
            "resolved {} session(s), {} scan(s), {} local image file(s)",
            dependencies.sessions.len(),
            dependencies.scan_for_series.len(),
            dependencies.file_for_sop.len()
        );
        (Some(dependencies), diagnostics)
    }

    fn choose_session(
        &self,
        study_uid: &str,
        references: &ImageReferences,
        candidates: &[SessionRef],
        dependencies: &mut Dependencies,
        diagnostics: &mut Diagnostics,
    ) {
        let matches: Vec<&SessionRef> = candidates
            .iter()
            .filter(|s| s.study_uid == study_uid)
            .collect();

        let has_series = references
            .series_by_study
            .get(study_uid)
            .is_some_and(|series| !series.is_empty());
        if matches.is_empty() {
            let message = format!(
                "study {study_uid} is not in any session of project {}",
                self.project
            );
            if has_series {
                diagnostics.error(ENTITY, message);
            } else {
                diagnostics.warning(ENTITY, message);
            }
            return;
        }

        let chosen = match &self.preferred_session {
            Some(wanted) => matches
                .iter()
                .find(|s| &s.session_id == wanted || &s.session_label == wanted)
                .copied(),
            None => matches.first().copied(),
        };
        let Some(chosen) = chosen else {
            diagnostics.error(
                ENTITY,
                format!(
                    "requested session {} does not contain study {study_uid}",
                    self.preferred_session.as_deref().unwrap_or_default()
                ),
            );
            return;
        };

        if matches.len() > 1 {
            let labels: Vec<&str> = matches.iter().map(|s| s.session_label.as_str()).collect();
            if self.preferred_session.is_none() {
                warn!(
                    "study {study_uid} matches sessions {labels:?}, defaulting to {}",
                    chosen.session_label
                );
                diagnostics.warning(
                    ENTITY,
                    format!(
                        "study {study_uid} is in {} sessions ({}); using {}",
                        matches.len(),
                        labels.join(", "),
                        chosen.session_label
                    ),
                );
            }
            dependencies.ambiguities.insert(
                study_uid.to_string(),
                matches.iter().map(|s| (*s).clone()).collect(),
            );
        }
        debug!("study {study_uid} -> session {}", chosen.session_id);
        dependencies.sessions.push(chosen.clone());
    }

    fn resolve_scans(
        &self,
        session: &SessionRef,
        series_uids: &[String],
        references: &ImageReferences,
        dependencies: &mut Dependencies,
        diagnostics: &mut Diagnostics,
    ) {
        let scans = match self.repository.scans_for_series(session, series_uids) {
            Ok(scans) => scans,
            Err(e) => {
                diagnostics.error(
                    ENTITY,
                    format!("scan lookup in session {} failed: {e}", session.session_label),
                );
                return;
            }
        };

        for series_uid in series_uids {
            let Some(scan) = scans.iter().find(|scan| &scan.series_uid == series_uid) else {
                diagnostics.error(
                    ENTITY,
                    format!(
                        "referenced series {series_uid} is not a scan of session {}",
                        session.session_label
                    ),
                );
                continue;
            };
            dependencies
                .scan_for_series
                .insert(series_uid.clone(), scan.id.clone());

            for sop in references.sops_in_series(series_uid) {
                dependencies
                    .scan_for_sop
                    .insert(sop.to_string(), scan.id.clone());
                match self.repository.local_file(session, scan, sop) {
                    Ok(Some(path)) => {
                        dependencies.file_for_sop.insert(sop.to_string(), path);
                    }
                    Ok(None) => diagnostics.warning(
                        ENTITY,
                        format!("image {sop} is not stored in scan {}", scan.id),
                    ),
                    Err(e) => {
                        diagnostics.error(
                            ENTITY,
                            format!("fetching images of scan {} failed: {e}", scan.id),
                        );
                        break;
                    }
                }
            }
        }
    }
}
