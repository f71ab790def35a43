//
// entities/contour.rs
// XNAT-RTStruct-rs
//
// ROI Contour module: per-ROI contour geometry and the images each contour was drawn on.
//

use dicom::core::{Tag, VR};
use serde::Serialize;

use super::fields::{REFERENCED_ROI_NUMBER, REFERENCED_SOP_CLASS_UID, REFERENCED_SOP_INSTANCE_UID};
use crate::codec::Entity;
use crate::dicom_access::{Field, TagReader, TagWriter};
use crate::validate::Requirement;

pub const CONTOUR_GEOMETRIC_TYPES: [&str; 4] =
    ["POINT", "OPEN_PLANAR", "OPEN_NONPLANAR", "CLOSED_PLANAR"];

fn known_geometric_type(value: &str) -> bool {
    CONTOUR_GEOMETRIC_TYPES.contains(&value)
}

const REFERENCED_FRAME_NUMBER: Field = Field::new(
    Tag(0x0008, 0x1160),
    "ReferencedFrameNumber",
    VR::IS,
    Requirement::Optional,
);
const ROI_DISPLAY_COLOR: Field = Field::new(
    Tag(0x3006, 0x002A),
    "ROIDisplayColor",
    VR::IS,
    Requirement::Optional,
);
const CONTOUR_SEQUENCE: Field = Field::new(
    Tag(0x3006, 0x0040),
    "ContourSequence",
    VR::SQ,
    Requirement::Optional,
);
const CONTOUR_IMAGE_SEQUENCE: Field = Field::new(
    Tag(0x3006, 0x0016),
    "ContourImageSequence",
    VR::SQ,
    Requirement::Optional,
);
const CONTOUR_GEOMETRIC_TYPE: Field = Field::new(
    Tag(0x3006, 0x0042),
    "ContourGeometricType",
    VR::CS,
    Requirement::RequiredConditional,
);
const NUMBER_OF_CONTOUR_POINTS: Field = Field::new(
    Tag(0x3006, 0x0046),
    "NumberOfContourPoints",
    VR::IS,
    Requirement::RequiredConditional,
);
const CONTOUR_NUMBER: Field = Field::new(
    Tag(0x3006, 0x0048),
    "ContourNumber",
    VR::IS,
    Requirement::Optional,
);
const CONTOUR_DATA: Field = Field::new(
    Tag(0x3006, 0x0050),
    "ContourData",
    VR::DS,
    Requirement::RequiredConditional,
);

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContourImage {
    pub sop_class_uid: String,
    pub sop_instance_uid: String,
    pub frame_number: Option<i32>,
}

impl Entity for ContourImage {
    const NAME: &'static str = "ContourImage";

    fn decode(reader: &mut TagReader<'_>) -> Self {
        ContourImage {
            sop_class_uid: reader.string(&REFERENCED_SOP_CLASS_UID).unwrap_or_default(),
            sop_instance_uid: reader
                .string(&REFERENCED_SOP_INSTANCE_UID)
                .unwrap_or_default(),
            frame_number: reader.int_checked(&REFERENCED_FRAME_NUMBER, |n| *n > 0),
        }
    }

    fn encode(&self, writer: &mut TagWriter) {
        writer.string(&REFERENCED_SOP_CLASS_UID, Some(&self.sop_class_uid));
        writer.string(&REFERENCED_SOP_INSTANCE_UID, Some(&self.sop_instance_uid));
        writer.int_checked(&REFERENCED_FRAME_NUMBER, self.frame_number, |n| n > 0);
    }
}

/// One polygon (or point set) of an ROI; `data` holds x/y/z triples in patient coordinates (mm).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Contour {
    pub number: Option<i32>,
    pub images: Vec<ContourImage>,
    pub geometric_type: String,
    pub number_of_points: usize,
    pub data: Vec<f64>,
}

impl Contour {
    pub fn points(&self) -> impl Iterator<Item = [f64; 3]> + '_ {
        self.data.chunks_exact(3).map(|p| [p[0], p[1], p[2]])
    }
}

impl Entity for Contour {
    const NAME: &'static str = "Contour";

    fn decode(reader: &mut TagReader<'_>) -> Self {
        let number = reader.int(&CONTOUR_NUMBER);
        let images = reader.sequence(&CONTOUR_IMAGE_SEQUENCE);
        let geometric_type = reader
            .string_checked(&CONTOUR_GEOMETRIC_TYPE, |t| known_geometric_type(t))
            .unwrap_or_default();
        let number_of_points = reader
            .int_checked(&NUMBER_OF_CONTOUR_POINTS, |n| *n > 0)
            .map(|n| n as usize);
        let data = match number_of_points {
            Some(n) => reader.floats_checked(&CONTOUR_DATA, |data| data.len() == 3 * n),
            // Without a point count the length cannot be cross-checked; the count is already an error.
            None => reader.floats(&CONTOUR_DATA),
        };

        Contour {
            number,
            images,
            geometric_type,
            number_of_points: number_of_points.unwrap_or_default(),
            data: data.unwrap_or_default(),
        }
    }

    fn encode(&self, writer: &mut TagWriter) {
        let points = self.number_of_points;
        writer.int(&CONTOUR_NUMBER, self.number);
        writer.sequence(&CONTOUR_IMAGE_SEQUENCE, &self.images);
        writer.string_checked(&CONTOUR_GEOMETRIC_TYPE, Some(&self.geometric_type), known_geometric_type);
        writer.int_checked(&NUMBER_OF_CONTOUR_POINTS, i32::try_from(points).ok(), |n| n > 0);
        writer.floats_checked(&CONTOUR_DATA, Some(&self.data), |data| {
            points > 0 && data.len() == 3 * points
        });
    }
}

/// Geometry of one ROI, linked to its summary entry through `referenced_roi_number`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RoiContour {
    pub referenced_roi_number: i32,
    pub display_color: Option<[i32; 3]>,
    pub contours: Vec<Contour>,
}

impl RoiContour {
    pub fn point_count(&self) -> usize {
        self.contours.iter().map(|c| c.number_of_points).sum()
    }

    pub fn image_uids(&self) -> impl Iterator<Item = &str> {
        self.contours
            .iter()
            .flat_map(|c| c.images.iter())
            .map(|image| image.sop_instance_uid.as_str())
    }
}

impl Entity for RoiContour {
    const NAME: &'static str = "ROIContour";

    fn decode(reader: &mut TagReader<'_>) -> Self {
        RoiContour {
            referenced_roi_number: reader.int(&REFERENCED_ROI_NUMBER).unwrap_or_default(),
            display_color: reader
                .ints_checked(&ROI_DISPLAY_COLOR, |rgb| {
                    rgb.len() == 3 && rgb.iter().all(|c| (0..=255).contains(c))
                })
                .map(|rgb| [rgb[0], rgb[1], rgb[2]]),
            contours: reader.sequence(&CONTOUR_SEQUENCE),
        }
    }

    fn encode(&self, writer: &mut TagWriter) {
        writer.int(&REFERENCED_ROI_NUMBER, Some(self.referenced_roi_number));
        writer.ints_checked(
            &ROI_DISPLAY_COLOR,
            self.display_color.as_ref().map(|rgb| rgb.as_slice()),
            |rgb| rgb.iter().all(|c| (0..=255).contains(c)),
        );
        writer.sequence(&CONTOUR_SEQUENCE, &self.contours);
    }
}
