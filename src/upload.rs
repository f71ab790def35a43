//
// upload.rs
// XNAT-RTStruct-rs
//
// Upload side: per-ROI XML metadata documents and writing re-encoded structure sets to disk.
//

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use quick_xml::se::Serializer;
use serde::Serialize;
use tracing::info;

use crate::rtstruct::{EncodedFile, Roi, RtStruct};

const ICR_NAMESPACE: &str = "http://www.icr.ac.uk/icr";
const XNAT_NAMESPACE: &str = "http://nrg.wustl.edu/xnat";

#[derive(Debug, Serialize)]
struct SeriesUids {
    #[serde(rename = "icr:seriesUID")]
    uid: Vec<String>,
}

#[derive(Debug, Serialize)]
struct RoiData {
    #[serde(rename = "@xmlns:icr")]
    icr_namespace: &'static str,
    #[serde(rename = "@xmlns:xnat")]
    xnat_namespace: &'static str,
    #[serde(rename = "@ID")]
    id: String,
    #[serde(rename = "@project", skip_serializing_if = "Option::is_none")]
    project: Option<String>,
    #[serde(rename = "@label")]
    label: String,
    #[serde(rename = "icr:subjectID", skip_serializing_if = "Option::is_none")]
    subject_id: Option<String>,
    #[serde(rename = "icr:imageSession_ID", skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
    #[serde(rename = "icr:roiSetID")]
    structure_set_uid: String,
    #[serde(rename = "icr:roiNumber")]
    number: i32,
    #[serde(rename = "icr:roiName", skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(rename = "icr:roiDescription", skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(rename = "icr:roiGenerationAlgorithm", skip_serializing_if = "Option::is_none")]
    generation_algorithm: Option<String>,
    #[serde(rename = "icr:referencedFrameOfReferenceUID")]
    frame_of_reference_uid: String,
    #[serde(rename = "icr:nContours")]
    contour_count: usize,
    #[serde(rename = "icr:nPoints")]
    point_count: usize,
    #[serde(rename = "icr:associatedSeries")]
    series: SeriesUids,
    #[serde(rename = "icr:observationLabel", skip_serializing_if = "Option::is_none")]
    observation_label: Option<String>,
    #[serde(rename = "icr:roiInterpretedType", skip_serializing_if = "Option::is_none")]
    interpreted_type: Option<String>,
    #[serde(rename = "icr:roiInterpreter", skip_serializing_if = "Option::is_none")]
    interpreter: Option<String>,
}

/// XML metadata for one ROI of a structure set stored under `structure_set_uid`.
///
/// Observation fields appear only when the ROI has an RT ROI observation.
pub fn roi_xml(rtstruct: &RtStruct, roi: &Roi, structure_set_uid: &str) -> Result<String> {
    let summary = rtstruct.summary(roi);
    let geometry = rtstruct.geometry(roi);
    let session = rtstruct
        .dependencies
        .as_ref()
        .and_then(|deps| deps.sessions.first());

    let data = RoiData {
        icr_namespace: ICR_NAMESPACE,
        xnat_namespace: XNAT_NAMESPACE,
        id: format!("{structure_set_uid}_{}", roi.number),
        project: session.map(|s| s.project.clone()),
        label: format!(
            "{}_{}",
            rtstruct.structure_set.label,
            roi.name.as_deref().unwrap_or("ROI")
        ),
        subject_id: session.map(|s| s.subject_id.clone()),
        session_id: session.map(|s| s.session_id.clone()),
        structure_set_uid: structure_set_uid.to_string(),
        number: roi.number,
        name: roi.name.clone(),
        description: summary.and_then(|s| s.description.clone()),
        generation_algorithm: summary.and_then(|s| s.generation_algorithm.clone()),
        frame_of_reference_uid: roi.frame_of_reference_uid.clone(),
        contour_count: geometry.map_or(0, |g| g.contours.len()),
        point_count: geometry.map_or(0, |g| g.point_count()),
        series: SeriesUids {
            uid: rtstruct.series_for_roi(roi),
        },
        observation_label: roi.observation_label.clone(),
        interpreted_type: roi.interpreted_type.clone(),
        interpreter: roi.interpreter.clone(),
    };

    let mut body = String::new();
    let mut serializer = Serializer::with_root(&mut body, Some("icr:roiData"))
        .map_err(|e| anyhow!("Failed to start ROI XML: {e}"))?;
    serializer.indent(' ', 2);
    data.serialize(serializer)
        .map_err(|e| anyhow!("Failed to serialize ROI {}: {e}", roi.number))?;
    Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{body}\n"))
}

/// Write an encoded structure set as a Part 10 file.
pub fn write_encoded(encoded: &EncodedFile, output: &Path) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context("Failed to create output directory")?;
    }
    encoded
        .file
        .write_to_file(output)
        .context("Failed to write DICOM file")?;
    info!(
        "wrote structure set {} to {}",
        encoded.sop_instance_uid,
        output.display()
    );
    Ok(())
}

/// Write one XML document per ROI into `dir`, named after the ROI number.
pub fn write_roi_documents(rtstruct: &RtStruct, structure_set_uid: &str, dir: &Path) -> Result<Vec<String>> {
    fs::create_dir_all(dir).context("Failed to create XML output directory")?;
    let mut written = Vec::with_capacity(rtstruct.rois.len());
    for roi in &rtstruct.rois {
        let xml = roi_xml(rtstruct, roi, structure_set_uid)?;
        let name = format!("roi-{}.xml", roi.number);
        fs::write(dir.join(&name), xml).context("Failed to write ROI XML")?;
        written.push(name);
    }
    Ok(written)
}
