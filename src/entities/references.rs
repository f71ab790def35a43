//
// entities/references.rs
// XNAT-RTStruct-rs
//
// Referenced frame of reference tree (frame → study → series → image) and plain SOP references.
//

use dicom::core::{Tag, VR};
use serde::Serialize;

use super::contour::ContourImage;
use super::fields::{
    CONTOUR_IMAGE_SEQUENCE, REFERENCED_SOP_CLASS_UID, REFERENCED_SOP_INSTANCE_UID,
    SERIES_INSTANCE_UID,
};
use crate::codec::Entity;
use crate::dicom_access::{Field, TagReader, TagWriter};
use crate::validate::Requirement;

const FRAME_OF_REFERENCE_UID: Field = Field::new(
    Tag(0x0020, 0x0052),
    "FrameOfReferenceUID",
    VR::UI,
    Requirement::Required,
);
const RT_REFERENCED_STUDY_SEQUENCE: Field = Field::new(
    Tag(0x3006, 0x0012),
    "RTReferencedStudySequence",
    VR::SQ,
    Requirement::Optional,
);
const RT_REFERENCED_SERIES_SEQUENCE: Field = Field::new(
    Tag(0x3006, 0x0014),
    "RTReferencedSeriesSequence",
    VR::SQ,
    Requirement::Required,
);
const FRAME_OF_REFERENCE_RELATIONSHIP_SEQUENCE: Field = Field::new(
    Tag(0x3006, 0x00C0),
    "FrameOfReferenceRelationshipSequence",
    VR::SQ,
    Requirement::Retired,
);

/// A bare (class, instance) pair, as found in the Referenced Study Sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SopReference {
    pub sop_class_uid: String,
    pub sop_instance_uid: String,
}

impl Entity for SopReference {
    const NAME: &'static str = "ReferencedStudy";

    fn decode(reader: &mut TagReader<'_>) -> Self {
        SopReference {
            sop_class_uid: reader.string(&REFERENCED_SOP_CLASS_UID).unwrap_or_default(),
            sop_instance_uid: reader
                .string(&REFERENCED_SOP_INSTANCE_UID)
                .unwrap_or_default(),
        }
    }

    fn encode(&self, writer: &mut TagWriter) {
        writer.string(&REFERENCED_SOP_CLASS_UID, Some(&self.sop_class_uid));
        writer.string(&REFERENCED_SOP_INSTANCE_UID, Some(&self.sop_instance_uid));
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RtReferencedSeries {
    pub series_instance_uid: String,
    pub contour_images: Vec<ContourImage>,
}

impl Entity for RtReferencedSeries {
    const NAME: &'static str = "RTReferencedSeries";

    fn decode(reader: &mut TagReader<'_>) -> Self {
        RtReferencedSeries {
            series_instance_uid: reader.string(&SERIES_INSTANCE_UID).unwrap_or_default(),
            contour_images: reader.sequence(&CONTOUR_IMAGE_SEQUENCE),
        }
    }

    fn encode(&self, writer: &mut TagWriter) {
        writer.string(&SERIES_INSTANCE_UID, Some(&self.series_instance_uid));
        writer.sequence(&CONTOUR_IMAGE_SEQUENCE, &self.contour_images);
    }
}

/// One study of a frame of reference; its SOP instance UID is the Study Instance UID.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RtReferencedStudy {
    pub sop_class_uid: String,
    pub study_instance_uid: String,
    pub series: Vec<RtReferencedSeries>,
}

impl Entity for RtReferencedStudy {
    const NAME: &'static str = "RTReferencedStudy";

    fn decode(reader: &mut TagReader<'_>) -> Self {
        RtReferencedStudy {
            sop_class_uid: reader.string(&REFERENCED_SOP_CLASS_UID).unwrap_or_default(),
            study_instance_uid: reader
                .string(&REFERENCED_SOP_INSTANCE_UID)
                .unwrap_or_default(),
            series: reader.sequence(&RT_REFERENCED_SERIES_SEQUENCE),
        }
    }

    fn encode(&self, writer: &mut TagWriter) {
        writer.string(&REFERENCED_SOP_CLASS_UID, Some(&self.sop_class_uid));
        writer.string(&REFERENCED_SOP_INSTANCE_UID, Some(&self.study_instance_uid));
        writer.sequence(&RT_REFERENCED_SERIES_SEQUENCE, &self.series);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReferencedFrameOfReference {
    pub frame_of_reference_uid: String,
    pub studies: Vec<RtReferencedStudy>,
}

impl ReferencedFrameOfReference {
    pub fn series(&self) -> impl Iterator<Item = &RtReferencedSeries> {
        self.studies.iter().flat_map(|study| study.series.iter())
    }
}

impl Entity for ReferencedFrameOfReference {
    const NAME: &'static str = "ReferencedFrameOfReference";

    fn decode(reader: &mut TagReader<'_>) -> Self {
        let frame_of_reference_uid = reader.string(&FRAME_OF_REFERENCE_UID).unwrap_or_default();
        // Registration belongs in the Spatial Registration IOD now; only flag it.
        reader.presence(&FRAME_OF_REFERENCE_RELATIONSHIP_SEQUENCE);
        ReferencedFrameOfReference {
            frame_of_reference_uid,
            studies: reader.sequence(&RT_REFERENCED_STUDY_SEQUENCE),
        }
    }

    fn encode(&self, writer: &mut TagWriter) {
        writer.string(&FRAME_OF_REFERENCE_UID, Some(&self.frame_of_reference_uid));
        writer.sequence(&RT_REFERENCED_STUDY_SEQUENCE, &self.studies);
    }
}
