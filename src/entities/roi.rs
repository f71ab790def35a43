//
// entities/roi.rs
// XNAT-RTStruct-rs
//
// Structure Set ROI entries and the derivation codes that describe how each ROI was produced.
//

use dicom::core::{Tag, VR};
use serde::Serialize;

use crate::codec::Entity;
use crate::dicom_access::{Field, TagReader, TagWriter};
use crate::validate::Requirement;

const ROI_NUMBER: Field = Field::new(
    Tag(0x3006, 0x0022),
    "ROINumber",
    VR::IS,
    Requirement::Required,
);
const REFERENCED_FRAME_OF_REFERENCE_UID: Field = Field::new(
    Tag(0x3006, 0x0024),
    "ReferencedFrameOfReferenceUID",
    VR::UI,
    Requirement::Required,
);
const ROI_NAME: Field = Field::new(
    Tag(0x3006, 0x0026),
    "ROIName",
    VR::LO,
    Requirement::RequiredAllowEmpty,
);
const ROI_DESCRIPTION: Field = Field::new(
    Tag(0x3006, 0x0028),
    "ROIDescription",
    VR::ST,
    Requirement::Optional,
);
const ROI_GENERATION_ALGORITHM: Field = Field::new(
    Tag(0x3006, 0x0036),
    "ROIGenerationAlgorithm",
    VR::CS,
    Requirement::RequiredAllowEmpty,
);
const DERIVATION_CODE_SEQUENCE: Field = Field::new(
    Tag(0x0008, 0x9215),
    "DerivationCodeSequence",
    VR::SQ,
    Requirement::Optional,
);

const CODE_VALUE: Field = Field::new(
    Tag(0x0008, 0x0100),
    "CodeValue",
    VR::SH,
    Requirement::Required,
);
const CODING_SCHEME_DESIGNATOR: Field = Field::new(
    Tag(0x0008, 0x0102),
    "CodingSchemeDesignator",
    VR::SH,
    Requirement::Required,
);
const CODING_SCHEME_VERSION: Field = Field::new(
    Tag(0x0008, 0x0103),
    "CodingSchemeVersion",
    VR::SH,
    Requirement::Optional,
);
const CODE_MEANING: Field = Field::new(
    Tag(0x0008, 0x0104),
    "CodeMeaning",
    VR::LO,
    Requirement::Required,
);

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DerivationCode {
    pub value: String,
    pub scheme_designator: String,
    pub scheme_version: Option<String>,
    pub meaning: String,
}

impl Entity for DerivationCode {
    const NAME: &'static str = "DerivationCode";

    fn decode(reader: &mut TagReader<'_>) -> Self {
        DerivationCode {
            value: reader.string(&CODE_VALUE).unwrap_or_default(),
            scheme_designator: reader.string(&CODING_SCHEME_DESIGNATOR).unwrap_or_default(),
            scheme_version: reader.string(&CODING_SCHEME_VERSION),
            meaning: reader.string(&CODE_MEANING).unwrap_or_default(),
        }
    }

    fn encode(&self, writer: &mut TagWriter) {
        writer.string(&CODE_VALUE, Some(&self.value));
        writer.string(&CODING_SCHEME_DESIGNATOR, Some(&self.scheme_designator));
        writer.string(&CODING_SCHEME_VERSION, self.scheme_version.as_deref());
        writer.string(&CODE_MEANING, Some(&self.meaning));
    }
}

/// Summary entry of the Structure Set ROI Sequence. `number` is the key the
/// contour and observation sequences refer back to.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StructureSetRoi {
    pub number: i32,
    pub frame_of_reference_uid: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub generation_algorithm: Option<String>,
    pub derivation_codes: Vec<DerivationCode>,
}

impl Entity for StructureSetRoi {
    const NAME: &'static str = "StructureSetROI";

    fn decode(reader: &mut TagReader<'_>) -> Self {
        StructureSetRoi {
            number: reader.int(&ROI_NUMBER).unwrap_or_default(),
            frame_of_reference_uid: reader
                .string(&REFERENCED_FRAME_OF_REFERENCE_UID)
                .unwrap_or_default(),
            name: reader.string(&ROI_NAME),
            description: reader.string(&ROI_DESCRIPTION),
            generation_algorithm: reader.string(&ROI_GENERATION_ALGORITHM),
            derivation_codes: reader.sequence(&DERIVATION_CODE_SEQUENCE),
        }
    }

    fn encode(&self, writer: &mut TagWriter) {
        writer.int(&ROI_NUMBER, Some(self.number));
        writer.string(
            &REFERENCED_FRAME_OF_REFERENCE_UID,
            Some(&self.frame_of_reference_uid),
        );
        writer.string(&ROI_NAME, self.name.as_deref());
        writer.string(&ROI_DESCRIPTION, self.description.as_deref());
        writer.string(&ROI_GENERATION_ALGORITHM, self.generation_algorithm.as_deref());
        writer.sequence(&DERIVATION_CODE_SEQUENCE, &self.derivation_codes);
    }
}
