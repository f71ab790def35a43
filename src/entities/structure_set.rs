//
// entities/structure_set.rs
// XNAT-RTStruct-rs
//
// Top level of an RT Structure Set: general study/series attributes, the structure set module and its three parallel ROI sequences.
//

use dicom::core::{Tag, VR};
use serde::Serialize;

use super::{
    Patient, ReferencedFrameOfReference, RoiContour, RtRoiObservation, SopReference,
    StructureSetRoi,
};
use crate::codec::Entity;
use crate::dicom_access::{Field, TagReader, TagWriter};
use crate::validate::Requirement;

pub const RT_STRUCTURE_SET_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.481.3";

const SOP_CLASS_UID: Field = Field::new(
    Tag(0x0008, 0x0016),
    "SOPClassUID",
    VR::UI,
    Requirement::Required,
);
pub(crate) const SOP_INSTANCE_UID: Field = Field::new(
    Tag(0x0008, 0x0018),
    "SOPInstanceUID",
    VR::UI,
    Requirement::Required,
);
const INSTANCE_CREATION_DATE: Field = Field::new(
    Tag(0x0008, 0x0012),
    "InstanceCreationDate",
    VR::DA,
    Requirement::Optional,
);
const INSTANCE_CREATION_TIME: Field = Field::new(
    Tag(0x0008, 0x0013),
    "InstanceCreationTime",
    VR::TM,
    Requirement::Optional,
);
const STUDY_DATE: Field = Field::new(
    Tag(0x0008, 0x0020),
    "StudyDate",
    VR::DA,
    Requirement::RequiredAllowEmpty,
);
const STUDY_TIME: Field = Field::new(
    Tag(0x0008, 0x0030),
    "StudyTime",
    VR::TM,
    Requirement::RequiredAllowEmpty,
);
const ACCESSION_NUMBER: Field = Field::new(
    Tag(0x0008, 0x0050),
    "AccessionNumber",
    VR::SH,
    Requirement::RequiredAllowEmpty,
);
pub(crate) const MODALITY: Field = Field::new(
    Tag(0x0008, 0x0060),
    "Modality",
    VR::CS,
    Requirement::Required,
);
const MANUFACTURER: Field = Field::new(
    Tag(0x0008, 0x0070),
    "Manufacturer",
    VR::LO,
    Requirement::RequiredAllowEmpty,
);
const REFERRING_PHYSICIAN_NAME: Field = Field::new(
    Tag(0x0008, 0x0090),
    "ReferringPhysicianName",
    VR::PN,
    Requirement::RequiredAllowEmpty,
);
const SERIES_DESCRIPTION: Field = Field::new(
    Tag(0x0008, 0x103E),
    "SeriesDescription",
    VR::LO,
    Requirement::Optional,
);
const OPERATORS_NAME: Field = Field::new(
    Tag(0x0008, 0x1070),
    "OperatorsName",
    VR::PN,
    Requirement::RequiredAllowEmpty,
);
const REFERENCED_STUDY_SEQUENCE: Field = Field::new(
    Tag(0x0008, 0x1110),
    "ReferencedStudySequence",
    VR::SQ,
    Requirement::Optional,
);
const SOFTWARE_VERSIONS: Field = Field::new(
    Tag(0x0018, 0x1020),
    "SoftwareVersions",
    VR::LO,
    Requirement::Optional,
);
const STUDY_INSTANCE_UID: Field = Field::new(
    Tag(0x0020, 0x000D),
    "StudyInstanceUID",
    VR::UI,
    Requirement::Required,
);
const SERIES_INSTANCE_UID: Field = Field::new(
    Tag(0x0020, 0x000E),
    "SeriesInstanceUID",
    VR::UI,
    Requirement::Required,
);
const STUDY_ID: Field = Field::new(
    Tag(0x0020, 0x0010),
    "StudyID",
    VR::SH,
    Requirement::RequiredAllowEmpty,
);
const SERIES_NUMBER: Field = Field::new(
    Tag(0x0020, 0x0011),
    "SeriesNumber",
    VR::IS,
    Requirement::RequiredAllowEmpty,
);
const INSTANCE_NUMBER: Field = Field::new(
    Tag(0x0020, 0x0013),
    "InstanceNumber",
    VR::IS,
    Requirement::Optional,
);
const STRUCTURE_SET_LABEL: Field = Field::new(
    Tag(0x3006, 0x0002),
    "StructureSetLabel",
    VR::SH,
    Requirement::Required,
);
const STRUCTURE_SET_NAME: Field = Field::new(
    Tag(0x3006, 0x0004),
    "StructureSetName",
    VR::LO,
    Requirement::Optional,
);
const STRUCTURE_SET_DESCRIPTION: Field = Field::new(
    Tag(0x3006, 0x0006),
    "StructureSetDescription",
    VR::ST,
    Requirement::Optional,
);
const STRUCTURE_SET_DATE: Field = Field::new(
    Tag(0x3006, 0x0008),
    "StructureSetDate",
    VR::DA,
    Requirement::RequiredAllowEmpty,
);
const STRUCTURE_SET_TIME: Field = Field::new(
    Tag(0x3006, 0x0009),
    "StructureSetTime",
    VR::TM,
    Requirement::RequiredAllowEmpty,
);
const REFERENCED_FRAME_OF_REFERENCE_SEQUENCE: Field = Field::new(
    Tag(0x3006, 0x0010),
    "ReferencedFrameOfReferenceSequence",
    VR::SQ,
    Requirement::Optional,
);
pub(crate) const STRUCTURE_SET_ROI_SEQUENCE: Field = Field::new(
    Tag(0x3006, 0x0020),
    "StructureSetROISequence",
    VR::SQ,
    Requirement::Required,
);
pub(crate) const ROI_CONTOUR_SEQUENCE: Field = Field::new(
    Tag(0x3006, 0x0039),
    "ROIContourSequence",
    VR::SQ,
    Requirement::Required,
);
pub(crate) const RT_ROI_OBSERVATIONS_SEQUENCE: Field = Field::new(
    Tag(0x3006, 0x0080),
    "RTROIObservationsSequence",
    VR::SQ,
    Requirement::Required,
);

/// Top-level sequences whose total absence means the object is not a usable structure set.
pub(crate) const MANDATORY_SEQUENCES: [Field; 3] = [
    STRUCTURE_SET_ROI_SEQUENCE,
    ROI_CONTOUR_SEQUENCE,
    RT_ROI_OBSERVATIONS_SEQUENCE,
];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StructureSet {
    pub sop_class_uid: String,
    pub sop_instance_uid: String,
    pub modality: String,
    pub study_instance_uid: String,
    pub series_instance_uid: String,
    pub study_date: Option<String>,
    pub study_time: Option<String>,
    pub accession_number: Option<String>,
    pub referring_physician_name: Option<String>,
    pub study_id: Option<String>,
    pub series_number: Option<i32>,
    pub series_description: Option<String>,
    pub manufacturer: Option<String>,
    pub software_versions: Option<String>,
    pub operators_name: Option<String>,
    pub instance_number: Option<i32>,
    pub instance_creation_date: Option<String>,
    pub instance_creation_time: Option<String>,
    pub label: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub patient: Patient,
    pub referenced_studies: Vec<SopReference>,
    pub referenced_frames: Vec<ReferencedFrameOfReference>,
    pub rois: Vec<StructureSetRoi>,
    pub roi_contours: Vec<RoiContour>,
    pub observations: Vec<RtRoiObservation>,
}

fn is_rtstruct(modality: &str) -> bool {
    modality == "RTSTRUCT"
}

impl StructureSet {
    /// Scalar attributes and the embedded patient; sequences are left empty.
    pub(crate) fn decode_header(reader: &mut TagReader<'_>) -> Self {
        StructureSet {
            sop_class_uid: reader.string(&SOP_CLASS_UID).unwrap_or_default(),
            sop_instance_uid: reader.string(&SOP_INSTANCE_UID).unwrap_or_default(),
            modality: reader
                .string_checked(&MODALITY, |m| is_rtstruct(m))
                .unwrap_or_default(),
            study_instance_uid: reader.string(&STUDY_INSTANCE_UID).unwrap_or_default(),
            series_instance_uid: reader.string(&SERIES_INSTANCE_UID).unwrap_or_default(),
            study_date: reader.string(&STUDY_DATE),
            study_time: reader.string(&STUDY_TIME),
            accession_number: reader.string(&ACCESSION_NUMBER),
            referring_physician_name: reader.string(&REFERRING_PHYSICIAN_NAME),
            study_id: reader.string(&STUDY_ID),
            series_number: reader.int(&SERIES_NUMBER),
            series_description: reader.string(&SERIES_DESCRIPTION),
            manufacturer: reader.string(&MANUFACTURER),
            software_versions: reader.string(&SOFTWARE_VERSIONS),
            operators_name: reader.string(&OPERATORS_NAME),
            instance_number: reader.int(&INSTANCE_NUMBER),
            instance_creation_date: reader.string(&INSTANCE_CREATION_DATE),
            instance_creation_time: reader.string(&INSTANCE_CREATION_TIME),
            label: reader.string(&STRUCTURE_SET_LABEL).unwrap_or_default(),
            name: reader.string(&STRUCTURE_SET_NAME),
            description: reader.string(&STRUCTURE_SET_DESCRIPTION),
            date: reader.string(&STRUCTURE_SET_DATE),
            time: reader.string(&STRUCTURE_SET_TIME),
            patient: reader.embedded(),
            ..Default::default()
        }
    }

    /// Referenced studies, then the frame of reference tree (which repeats studies per frame).
    pub(crate) fn decode_references(&mut self, reader: &mut TagReader<'_>) {
        self.referenced_studies = reader.sequence(&REFERENCED_STUDY_SEQUENCE);
        self.referenced_frames = reader.sequence(&REFERENCED_FRAME_OF_REFERENCE_SEQUENCE);
    }

    /// ROI summaries, contour geometry and observations, in that order.
    pub(crate) fn decode_rois(&mut self, reader: &mut TagReader<'_>) {
        self.rois = reader.sequence(&STRUCTURE_SET_ROI_SEQUENCE);
        self.roi_contours = reader.sequence(&ROI_CONTOUR_SEQUENCE);
        self.observations = reader.sequence(&RT_ROI_OBSERVATIONS_SEQUENCE);
    }
}

impl Entity for StructureSet {
    const NAME: &'static str = "StructureSet";

    fn decode(reader: &mut TagReader<'_>) -> Self {
        let mut structure_set = StructureSet::decode_header(reader);
        structure_set.decode_references(reader);
        structure_set.decode_rois(reader);
        structure_set
    }

    fn encode(&self, writer: &mut TagWriter) {
        writer.string(&SOP_CLASS_UID, Some(&self.sop_class_uid));
        writer.string(&SOP_INSTANCE_UID, Some(&self.sop_instance_uid));
        writer.string(&INSTANCE_CREATION_DATE, self.instance_creation_date.as_deref());
        writer.string(&INSTANCE_CREATION_TIME, self.instance_creation_time.as_deref());
        writer.string(&STUDY_DATE, self.study_date.as_deref());
        writer.string(&STUDY_TIME, self.study_time.as_deref());
        writer.string(&ACCESSION_NUMBER, self.accession_number.as_deref());
        writer.string_checked(&MODALITY, Some(&self.modality), is_rtstruct);
        writer.string(&MANUFACTURER, self.manufacturer.as_deref());
        writer.string(
            &REFERRING_PHYSICIAN_NAME,
            self.referring_physician_name.as_deref(),
        );
        writer.string(&SERIES_DESCRIPTION, self.series_description.as_deref());
        writer.string(&OPERATORS_NAME, self.operators_name.as_deref());
        writer.sequence(&REFERENCED_STUDY_SEQUENCE, &self.referenced_studies);
        writer.string(&SOFTWARE_VERSIONS, self.software_versions.as_deref());
        writer.string(&STUDY_INSTANCE_UID, Some(&self.study_instance_uid));
        writer.string(&SERIES_INSTANCE_UID, Some(&self.series_instance_uid));
        writer.string(&STUDY_ID, self.study_id.as_deref());
        writer.int(&SERIES_NUMBER, self.series_number);
        writer.int(&INSTANCE_NUMBER, self.instance_number);
        writer.embedded(&self.patient);

        writer.string(&STRUCTURE_SET_LABEL, Some(&self.label));
        writer.string(&STRUCTURE_SET_NAME, self.name.as_deref());
        writer.string(&STRUCTURE_SET_DESCRIPTION, self.description.as_deref());
        writer.string(&STRUCTURE_SET_DATE, self.date.as_deref());
        writer.string(&STRUCTURE_SET_TIME, self.time.as_deref());
        writer.sequence(
            &REFERENCED_FRAME_OF_REFERENCE_SEQUENCE,
            &self.referenced_frames,
        );
        writer.sequence(&STRUCTURE_SET_ROI_SEQUENCE, &self.rois);
        writer.sequence(&ROI_CONTOUR_SEQUENCE, &self.roi_contours);
        writer.sequence(&RT_ROI_OBSERVATIONS_SEQUENCE, &self.observations);
    }
}
