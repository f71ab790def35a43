//
// entities/patient.rs
// XNAT-RTStruct-rs
//
// Patient module attributes carried at the top level of the structure set.
//

use dicom::core::{Tag, VR};
use serde::Serialize;

use crate::codec::Entity;
use crate::dicom_access::{Field, TagReader, TagWriter};
use crate::validate::Requirement;

const PATIENT_NAME: Field = Field::new(
    Tag(0x0010, 0x0010),
    "PatientName",
    VR::PN,
    Requirement::RequiredAllowEmpty,
);
const PATIENT_ID: Field = Field::new(
    Tag(0x0010, 0x0020),
    "PatientID",
    VR::LO,
    Requirement::RequiredAllowEmpty,
);
const PATIENT_BIRTH_DATE: Field = Field::new(
    Tag(0x0010, 0x0030),
    "PatientBirthDate",
    VR::DA,
    Requirement::RequiredAllowEmpty,
);
const PATIENT_SEX: Field = Field::new(
    Tag(0x0010, 0x0040),
    "PatientSex",
    VR::CS,
    Requirement::RequiredAllowEmpty,
);

fn known_sex(value: &str) -> bool {
    matches!(value, "M" | "F" | "O")
}

/// Patient module attributes, stored at the top level of the structure set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Patient {
    pub name: Option<String>,
    pub id: Option<String>,
    pub birth_date: Option<String>,
    pub sex: Option<String>,
}

impl Entity for Patient {
    const NAME: &'static str = "Patient";

    fn decode(reader: &mut TagReader<'_>) -> Self {
        Patient {
            name: reader.string(&PATIENT_NAME),
            id: reader.string(&PATIENT_ID),
            birth_date: reader.string(&PATIENT_BIRTH_DATE),
            sex: reader.string_checked(&PATIENT_SEX, |sex| known_sex(sex)),
        }
    }

    fn encode(&self, writer: &mut TagWriter) {
        writer.string(&PATIENT_NAME, self.name.as_deref());
        writer.string(&PATIENT_ID, self.id.as_deref());
        writer.string(&PATIENT_BIRTH_DATE, self.birth_date.as_deref());
        writer.string_checked(&PATIENT_SEX, self.sex.as_deref(), known_sex);
    }
}
