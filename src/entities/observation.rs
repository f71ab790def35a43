//
// entities/observation.rs
// XNAT-RTStruct-rs
//
// RT ROI Observations module: clinical interpretation attached to an ROI.
//

use dicom::core::{Tag, VR};
use serde::Serialize;

use super::fields::REFERENCED_ROI_NUMBER;
use crate::codec::Entity;
use crate::dicom_access::{Field, TagReader, TagWriter};
use crate::validate::Requirement;

const OBSERVATION_NUMBER: Field = Field::new(
    Tag(0x3006, 0x0082),
    "ObservationNumber",
    VR::IS,
    Requirement::Required,
);
const ROI_OBSERVATION_LABEL: Field = Field::new(
    Tag(0x3006, 0x0085),
    "ROIObservationLabel",
    VR::SH,
    Requirement::Optional,
);
const ROI_OBSERVATION_DESCRIPTION: Field = Field::new(
    Tag(0x3006, 0x0088),
    "ROIObservationDescription",
    VR::ST,
    Requirement::Optional,
);
const RT_ROI_INTERPRETED_TYPE: Field = Field::new(
    Tag(0x3006, 0x00A4),
    "RTROIInterpretedType",
    VR::CS,
    Requirement::RequiredAllowEmpty,
);
const ROI_INTERPRETER: Field = Field::new(
    Tag(0x3006, 0x00A6),
    "ROIInterpreter",
    VR::PN,
    Requirement::RequiredAllowEmpty,
);

/// Entry of the RT ROI Observations Sequence (radiotherapy interpretation of an ROI).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RtRoiObservation {
    pub observation_number: i32,
    pub referenced_roi_number: i32,
    pub label: Option<String>,
    pub description: Option<String>,
    pub interpreted_type: Option<String>,
    pub interpreter: Option<String>,
}

impl Entity for RtRoiObservation {
    const NAME: &'static str = "RTROIObservation";

    fn decode(reader: &mut TagReader<'_>) -> Self {
        RtRoiObservation {
            observation_number: reader.int(&OBSERVATION_NUMBER).unwrap_or_default(),
            referenced_roi_number: reader.int(&REFERENCED_ROI_NUMBER).unwrap_or_default(),
            label: reader.string(&ROI_OBSERVATION_LABEL),
            description: reader.string(&ROI_OBSERVATION_DESCRIPTION),
            interpreted_type: reader.string(&RT_ROI_INTERPRETED_TYPE),
            interpreter: reader.string(&ROI_INTERPRETER),
        }
    }

    fn encode(&self, writer: &mut TagWriter) {
        writer.int(&OBSERVATION_NUMBER, Some(self.observation_number));
        writer.int(&REFERENCED_ROI_NUMBER, Some(self.referenced_roi_number));
        writer.string(&ROI_OBSERVATION_LABEL, self.label.as_deref());
        writer.string(&ROI_OBSERVATION_DESCRIPTION, self.description.as_deref());
        writer.string(&RT_ROI_INTERPRETED_TYPE, self.interpreted_type.as_deref());
        writer.string(&ROI_INTERPRETER, self.interpreter.as_deref());
    }
}
