//
// entities/mod.rs
// XNAT-RTStruct-rs
//
// Domain records of an RT Structure Set, each with its own field table and codec implementation.
//

mod contour;
mod observation;
mod patient;
mod references;
mod roi;
mod structure_set;

pub use contour::{Contour, ContourImage, RoiContour, CONTOUR_GEOMETRIC_TYPES};
pub use observation::RtRoiObservation;
pub use patient::Patient;
pub use references::{ReferencedFrameOfReference, RtReferencedSeries, RtReferencedStudy, SopReference};
pub use roi::{DerivationCode, StructureSetRoi};
pub use structure_set::{StructureSet, RT_STRUCTURE_SET_STORAGE};
pub(crate) use structure_set::{MANDATORY_SEQUENCES, MODALITY};

pub mod fields {
    //! Field tables shared by more than one entity.

    use dicom::core::{Tag, VR};

    use crate::dicom_access::Field;
    use crate::validate::Requirement;

    pub const REFERENCED_SOP_CLASS_UID: Field = Field::new(
        Tag(0x0008, 0x1150),
        "ReferencedSOPClassUID",
        VR::UI,
        Requirement::Required,
    );
    pub const REFERENCED_SOP_INSTANCE_UID: Field = Field::new(
        Tag(0x0008, 0x1155),
        "ReferencedSOPInstanceUID",
        VR::UI,
        Requirement::Required,
    );
    pub const SERIES_INSTANCE_UID: Field = Field::new(
        Tag(0x0020, 0x000E),
        "SeriesInstanceUID",
        VR::UI,
        Requirement::Required,
    );
    pub const CONTOUR_IMAGE_SEQUENCE: Field = Field::new(
        Tag(0x3006, 0x0016),
        "ContourImageSequence",
        VR::SQ,
        Requirement::Required,
    );
    pub const REFERENCED_ROI_NUMBER: Field = Field::new(
        Tag(0x3006, 0x0084),
        "ReferencedROINumber",
        VR::IS,
        Requirement::Required,
    );
}
