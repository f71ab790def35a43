//
// rtstruct.rs
// XNAT-RTStruct-rs
//
// The decoded structure set: ordered parse pipeline, ROI cross-referencing, subset derivation and re-encoding.
//

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Context;
use dicom::object::{
    open_file, DefaultDicomObject, FileDicomObject, FileMetaTableBuilder, InMemDicomObject,
    StandardDataDictionary,
};
use dicom::transfer_syntax::entries::EXPLICIT_VR_LITTLE_ENDIAN;
use serde::Serialize;
use tracing::{debug, info};

use crate::codec::Entity;
use crate::dependencies::{Dependencies, DependencyResolver, ImageReferences};
use crate::dicom_access::{TagReader, TagWriter};
use crate::entities::{
    ReferencedFrameOfReference, RoiContour, RtReferencedSeries, RtReferencedStudy,
    RtRoiObservation, StructureSet, StructureSetRoi, MANDATORY_SEQUENCES, MODALITY,
    RT_STRUCTURE_SET_STORAGE,
};
use crate::error::RtStructError;
use crate::models::{RoiSummary, StructureSetSummary};
use crate::uid;
use crate::validate::{Diagnostic, Diagnostics};

const LINK_ENTITY: &str = "StructureSet";
const LABEL_LIMIT: usize = 16;
const SUBSET_SUFFIX: &str = "-subset";
const NAME_LIMIT: usize = 64;
const SUBSET_NAME_SUFFIX: &str = " ROI subset";

/// One ROI with its summary, geometry and (when present) observation tied together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Roi {
    pub number: i32,
    pub name: Option<String>,
    pub frame_of_reference_uid: String,
    pub observation_label: Option<String>,
    pub interpreted_type: Option<String>,
    pub interpreter: Option<String>,
    #[serde(skip)]
    summary_index: usize,
    #[serde(skip)]
    contour_index: usize,
    #[serde(skip)]
    observation_index: Option<usize>,
}

/// A validated RT structure set.
#[derive(Debug, Clone)]
pub struct RtStruct {
    pub structure_set: StructureSet,
    pub rois: Vec<Roi>,
    pub references: ImageReferences,
    pub dependencies: Option<Dependencies>,
    pub warnings: Vec<Diagnostic>,
    source: InMemDicomObject,
}

/// Output of [`RtStruct::to_dicom`].
pub struct EncodedFile {
    pub file: DefaultDicomObject,
    pub sop_instance_uid: String,
    pub warnings: Vec<Diagnostic>,
}

impl RtStruct {
    /// Open a Part 10 file and parse it.
    pub fn open(path: &Path, resolver: Option<&DependencyResolver<'_>>) -> anyhow::Result<Self> {
        let obj = open_file(path).context("Failed to open DICOM file")?;
        let rtstruct = Self::parse(&obj, resolver)
            .with_context(|| format!("Failed to load structure set {}", path.display()))?;
        Ok(rtstruct)
    }

    /// Decode a data set, collecting every diagnostic before deciding whether it is usable.
    ///
    /// Without a resolver the referenced images are not checked and a warning says so.
    pub fn parse(
        obj: &InMemDicomObject,
        resolver: Option<&DependencyResolver<'_>>,
    ) -> Result<Self, RtStructError> {
        check_modality(obj)?;

        let mut reader = TagReader::new(obj, StructureSet::NAME);
        let mut structure_set = StructureSet::decode_header(&mut reader);
        info!("parsing structure set {:?}", structure_set.label);

        structure_set.decode_references(&mut reader);
        let mut references = ImageReferences::collect(
            &structure_set.referenced_studies,
            &structure_set.referenced_frames,
        );

        let dependencies = match resolver {
            Some(resolver) => {
                let (dependencies, diagnostics) = resolver.resolve(&references);
                reader.merge(diagnostics);
                dependencies
            }
            None => {
                reader.warning("no image repository configured, referenced images were not checked");
                None
            }
        };

        structure_set.decode_rois(&mut reader);
        let mut diagnostics = reader.into_diagnostics();
        let rois = link(&structure_set, &mut diagnostics);
        references.add_contour_images(&structure_set.roi_contours);

        let missing: Vec<&str> = MANDATORY_SEQUENCES
            .iter()
            .filter(|field| obj.element(field.tag).is_err())
            .map(|field| field.keyword)
            .collect();
        if !missing.is_empty() {
            return Err(RtStructError::DataFormat {
                reason: format!("missing {}", missing.join(", ")),
                errors: diagnostics.errors,
            });
        }
        if diagnostics.has_errors() {
            info!(
                "structure set rejected with {} error(s), {} warning(s)",
                diagnostics.errors.len(),
                diagnostics.warnings.len()
            );
            return Err(RtStructError::DataRepresentation {
                errors: diagnostics.errors,
                warnings: diagnostics.warnings,
            });
        }

        info!(
            "structure set {:?} parsed: {} ROI(s), {} warning(s)",
            structure_set.label,
            rois.len(),
            diagnostics.warnings.len()
        );
        Ok(RtStruct {
            structure_set,
            rois,
            references,
            dependencies,
            warnings: diagnostics.warnings,
            source: obj.clone(),
        })
    }

    pub fn roi_numbers(&self) -> Vec<i32> {
        self.rois.iter().map(|roi| roi.number).collect()
    }

    pub fn roi(&self, number: i32) -> Option<&Roi> {
        self.rois.iter().find(|roi| roi.number == number)
    }

    pub fn summary(&self, roi: &Roi) -> Option<&StructureSetRoi> {
        self.structure_set.rois.get(roi.summary_index)
    }

    pub fn geometry(&self, roi: &Roi) -> Option<&RoiContour> {
        self.structure_set.roi_contours.get(roi.contour_index)
    }

    pub fn observation(&self, roi: &Roi) -> Option<&RtRoiObservation> {
        roi.observation_index
            .and_then(|index| self.structure_set.observations.get(index))
    }

    /// Series the given ROI's contours are drawn on.
    pub fn series_for_roi(&self, roi: &Roi) -> Vec<String> {
        let mut series = Vec::new();
        if let Some(geometry) = self.geometry(roi) {
            for sop in geometry.image_uids() {
                if let Some(uid) = self.references.series_for_sop.get(sop) {
                    if !series.contains(uid) {
                        series.push(uid.clone());
                    }
                }
            }
        }
        series
    }

    /// A new structure set restricted to `roi_numbers`; this one is untouched.
    ///
    /// Fails when no chosen ROI exists, or when none of them has an RT ROI
    /// observation, since the result could then never be encoded.
    pub fn derive_subset(&self, roi_numbers: &BTreeSet<i32>) -> Result<RtStruct, RtStructError> {
        let mut structure_set = self.structure_set.clone();
        structure_set.sop_instance_uid = uid::new_uid();
        let base_name = self
            .structure_set
            .name
            .clone()
            .unwrap_or_else(|| self.structure_set.label.clone());
        structure_set.name = Some(subset_name(&base_name));
        structure_set.label = subset_label(&self.structure_set.label);

        structure_set
            .rois
            .retain(|roi| roi_numbers.contains(&roi.number));
        structure_set
            .roi_contours
            .retain(|c| roi_numbers.contains(&c.referenced_roi_number));
        structure_set
            .observations
            .retain(|o| roi_numbers.contains(&o.referenced_roi_number));
        let refuse = |reason: &str| RtStructError::Subset {
            rois: roi_numbers.iter().copied().collect(),
            reason: reason.to_string(),
        };
        if structure_set.rois.is_empty() {
            return Err(refuse("none of the requested ROIs exist"));
        }
        if structure_set.observations.is_empty() {
            return Err(refuse(
                "none of the chosen ROIs has an RT ROI observation, so RTROIObservationsSequence would be empty",
            ));
        }
        structure_set.referenced_frames = prune_frames(&structure_set);

        let mut references = ImageReferences::collect(
            &structure_set.referenced_studies,
            &structure_set.referenced_frames,
        );
        references.add_contour_images(&structure_set.roi_contours);

        let mut diagnostics = Diagnostics::default();
        let rois = link(&structure_set, &mut diagnostics);
        let dependencies = self
            .dependencies
            .as_ref()
            .map(|deps| deps.restricted_to(&references));
        debug!(
            "derived subset {:?} with ROIs {:?}",
            structure_set.label,
            rois.iter().map(|r| r.number).collect::<Vec<_>>()
        );

        Ok(RtStruct {
            structure_set,
            rois,
            references,
            dependencies,
            warnings: diagnostics.warnings,
            source: self.source.clone(),
        })
    }

    /// Encode as a new Part 10 object with fresh instance identifiers.
    ///
    /// Attributes of the source data set that are not modelled are carried over.
    pub fn to_dicom(&self) -> Result<EncodedFile, RtStructError> {
        let (date, time) = uid::creation_stamp(chrono::Local::now());
        let mut structure_set = self.structure_set.clone();
        structure_set.sop_class_uid = RT_STRUCTURE_SET_STORAGE.to_string();
        structure_set.sop_instance_uid = uid::new_uid();
        structure_set.series_instance_uid = uid::new_uid();
        structure_set.modality = "RTSTRUCT".to_string();
        structure_set.manufacturer = Some(uid::MANUFACTURER.to_string());
        structure_set.software_versions = Some(uid::SOFTWARE_VERSION.to_string());
        structure_set.instance_creation_date = Some(date);
        structure_set.instance_creation_time = Some(time);

        let mut writer = TagWriter::over(self.source.clone(), StructureSet::NAME);
        structure_set.encode(&mut writer);
        let (object, diagnostics) = writer.finish();
        if diagnostics.has_errors() {
            return Err(RtStructError::Encode {
                errors: diagnostics.errors,
            });
        }

        let meta = FileMetaTableBuilder::new()
            .transfer_syntax(EXPLICIT_VR_LITTLE_ENDIAN.uid())
            .media_storage_sop_class_uid(RT_STRUCTURE_SET_STORAGE)
            .media_storage_sop_instance_uid(structure_set.sop_instance_uid.as_str())
            .build()?;
        let mut file = FileDicomObject::new_empty_with_dict_and_meta(StandardDataDictionary, meta);
        for element in object {
            file.put(element);
        }

        Ok(EncodedFile {
            file,
            sop_instance_uid: structure_set.sop_instance_uid,
            warnings: diagnostics.warnings,
        })
    }

    pub fn report(&self) -> StructureSetSummary {
        let rois = self
            .rois
            .iter()
            .map(|roi| {
                let geometry = self.geometry(roi);
                RoiSummary {
                    number: roi.number,
                    name: roi.name.clone(),
                    interpreted_type: roi.interpreted_type.clone(),
                    contour_count: geometry.map_or(0, |g| g.contours.len()),
                    point_count: geometry.map_or(0, RoiContour::point_count),
                    display_color: geometry.and_then(|g| g.display_color),
                    has_observation: roi.observation_index.is_some(),
                }
            })
            .collect();
        let session = self
            .dependencies
            .as_ref()
            .and_then(|deps| deps.sessions.first())
            .map(|s| s.session_label.clone());

        StructureSetSummary {
            sop_instance_uid: self.structure_set.sop_instance_uid.clone(),
            label: self.structure_set.label.clone(),
            name: self.structure_set.name.clone(),
            patient_id: self.structure_set.patient.id.clone(),
            patient_name: self.structure_set.patient.name.clone(),
            study_uids: self.references.study_uids.clone(),
            series_uids: self.references.series_uids.clone(),
            image_count: self.references.sop_instance_uids.len(),
            session,
            rois,
            warnings: self.warnings.iter().map(ToString::to_string).collect(),
        }
    }
}

fn check_modality(obj: &InMemDicomObject) -> Result<(), RtStructError> {
    let modality = obj
        .element(MODALITY.tag)
        .ok()
        .and_then(|e| e.to_str().ok())
        .map(|m| m.trim_matches([' ', '\0']).to_string());
    match modality.as_deref() {
        Some("RTSTRUCT") => Ok(()),
        Some(other) => Err(RtStructError::DataFormat {
            reason: format!("modality is {other:?}, expected RTSTRUCT"),
            errors: Vec::new(),
        }),
        None => Err(RtStructError::DataFormat {
            reason: "Modality (0008,0060) is absent".to_string(),
            errors: Vec::new(),
        }),
    }
}

/// Tie the three parallel ROI lists together by ROI number.
fn link(structure_set: &StructureSet, diagnostics: &mut Diagnostics) -> Vec<Roi> {
    let mut declared = BTreeSet::new();
    let mut rois = Vec::with_capacity(structure_set.rois.len());

    for (summary_index, summary) in structure_set.rois.iter().enumerate() {
        let number = summary.number;
        if !declared.insert(number) {
            diagnostics.error(LINK_ENTITY, format!("ROI number {number} is declared more than once"));
            continue;
        }

        let contours: Vec<usize> = positions(&structure_set.roi_contours, |c| {
            c.referenced_roi_number == number
        });
        let Some(&contour_index) = contours.first() else {
            diagnostics.error(
                LINK_ENTITY,
                format!(
                    "ROI {number} ({}) has no contour geometry in ROIContourSequence",
                    summary.name.as_deref().unwrap_or("unnamed")
                ),
            );
            continue;
        };
        if contours.len() > 1 {
            diagnostics.warning(
                LINK_ENTITY,
                format!("ROI {number} has {} ROIContour entries, using the first", contours.len()),
            );
        }

        let observations = positions(&structure_set.observations, |o| {
            o.referenced_roi_number == number
        });
        let observation_index = observations.first().copied();
        if observation_index.is_none() {
            diagnostics.warning(LINK_ENTITY, format!("ROI {number} has no RT ROI observation"));
        }
        let observation = observation_index.map(|i| &structure_set.observations[i]);

        rois.push(Roi {
            number,
            name: summary.name.clone(),
            frame_of_reference_uid: summary.frame_of_reference_uid.clone(),
            observation_label: observation.and_then(|o| o.label.clone()),
            interpreted_type: observation.and_then(|o| o.interpreted_type.clone()),
            interpreter: observation.and_then(|o| o.interpreter.clone()),
            summary_index,
            contour_index,
            observation_index,
        });
    }

    for contour in &structure_set.roi_contours {
        if !declared.contains(&contour.referenced_roi_number) {
            diagnostics.warning(
                LINK_ENTITY,
                format!(
                    "ROIContour refers to undeclared ROI {}",
                    contour.referenced_roi_number
                ),
            );
        }
    }
    for observation in &structure_set.observations {
        if !declared.contains(&observation.referenced_roi_number) {
            diagnostics.warning(
                LINK_ENTITY,
                format!(
                    "RT ROI observation {} refers to undeclared ROI {}",
                    observation.observation_number, observation.referenced_roi_number
                ),
            );
        }
    }
    rois
}

fn positions<T>(items: &[T], matches: impl Fn(&T) -> bool) -> Vec<usize> {
    items
        .iter()
        .enumerate()
        .filter(|(_, item)| matches(item))
        .map(|(index, _)| index)
        .collect()
}

fn subset_label(label: &str) -> String {
    let base: String = label.chars().take(LABEL_LIMIT - SUBSET_SUFFIX.len()).collect();
    format!("{base}{SUBSET_SUFFIX}")
}

fn subset_name(name: &str) -> String {
    let base: String = name.chars().take(NAME_LIMIT - SUBSET_NAME_SUFFIX.len()).collect();
    format!("{base}{SUBSET_NAME_SUFFIX}")
}

/// Frames used by the kept ROIs, with image lists cut down to the images the kept contours use.
fn prune_frames(structure_set: &StructureSet) -> Vec<ReferencedFrameOfReference> {
    let frames: BTreeSet<&str> = structure_set
        .rois
        .iter()
        .map(|roi| roi.frame_of_reference_uid.as_str())
        .collect();
    let images: BTreeSet<&str> = structure_set
        .roi_contours
        .iter()
        .flat_map(RoiContour::image_uids)
        .collect();

    structure_set
        .referenced_frames
        .iter()
        .filter(|frame| frames.contains(frame.frame_of_reference_uid.as_str()))
        .map(|frame| {
            if images.is_empty() {
                return frame.clone();
            }
            let studies = frame
                .studies
                .iter()
                .filter_map(|study| {
                    let series: Vec<RtReferencedSeries> = study
                        .series
                        .iter()
                        .filter_map(|series| {
                            let contour_images: Vec<_> = series
                                .contour_images
                                .iter()
                                .filter(|image| images.contains(image.sop_instance_uid.as_str()))
                                .cloned()
                                .collect();
                            (!contour_images.is_empty()).then(|| RtReferencedSeries {
                                series_instance_uid: series.series_instance_uid.clone(),
                                contour_images,
                            })
                        })
                        .collect();
                    (!series.is_empty()).then(|| RtReferencedStudy {
                        sop_class_uid: study.sop_class_uid.clone(),
                        study_instance_uid: study.study_instance_uid.clone(),
                        series,
                    })
                })
                .collect();
            ReferencedFrameOfReference {
                frame_of_reference_uid: frame.frame_of_reference_uid.clone(),
                studies,
            }
        })
        .collect()
}



#[cfg(test)]
mod parse_tests {
    use super::fixtures::*;
    use super::*;
    use dicom::core::{Tag, VR};

    fn warnings_text(rtstruct: &RtStruct) -> String {
        rtstruct
            .warnings
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn parses_and_links_rois() {
        let obj = structure_set(&[(1, "PTV"), (2, "Cord")], &[1, 2]);
        let rtstruct = RtStruct::parse(&obj, None).expect("valid structure set");

        assert_eq!(rtstruct.roi_numbers(), vec![1, 2]);
        assert_eq!(rtstruct.structure_set.label, "Contours");
        assert_eq!(rtstruct.structure_set.patient.id.as_deref(), Some("P001"));
        assert_eq!(rtstruct.references.study_uids, vec![STUDY]);
        assert_eq!(rtstruct.references.series_uids, vec![SERIES]);
        assert_eq!(rtstruct.references.sop_instance_uids.len(), 2);

        let cord = rtstruct.roi(2).unwrap();
        assert_eq!(cord.name.as_deref(), Some("Cord"));
        assert_eq!(cord.observation_label.as_deref(), Some("obs2"));
        let geometry = rtstruct.geometry(cord).unwrap();
        assert_eq!(geometry.display_color, Some([255, 128, 0]));
        assert_eq!(geometry.contours[0].points().nth(2), Some([0.0, -10.25, 10.0]));
        assert_eq!(rtstruct.series_for_roi(cord), vec![SERIES]);
        assert!(warnings_text(&rtstruct).contains("not checked"));
    }

    #[test]
    fn rejects_other_modalities() {
        let mut obj = structure_set(&[(1, "PTV")], &[1]);
        put(&mut obj, Tag(0x0008, 0x0060), VR::CS, "CT");
        let err = RtStruct::parse(&obj, None).unwrap_err();
        assert!(matches!(err, RtStructError::DataFormat { .. }));
        assert!(err.to_string().contains("\"CT\""));
    }

    #[test]
    fn collects_every_error_before_failing() {
        let mut obj = structure_set(&[(1, "PTV"), (2, "Cord")], &[1, 2]);
        obj.remove_element(Tag(0x3006, 0x0002));
        let mut broken = roi_contour(2);
        let mut contours = Vec::new();
        let mut contour = InMemDicomObject::new_empty();
        put(&mut contour, Tag(0x3006, 0x0042), VR::CS, "CLOSED_PLANAR");
        put(&mut contour, Tag(0x3006, 0x0046), VR::IS, "2");
        put(&mut contour, Tag(0x3006, 0x0050), VR::DS, "0\\0\\0");
        contours.push(contour);
        put_items(&mut broken, Tag(0x3006, 0x0040), contours);
        put_items(&mut obj, Tag(0x3006, 0x0039), vec![roi_contour(1), broken]);

        let err = RtStruct::parse(&obj, None).unwrap_err();
        let messages: Vec<String> = err.errors().iter().map(ToString::to_string).collect();
        assert!(matches!(err, RtStructError::DataRepresentation { .. }));
        assert!(messages.iter().any(|m| m.contains("StructureSetLabel (3006,0002)")));
        assert!(messages.iter().any(|m| m.contains("ContourData (3006,0050)")));
        assert!(messages.iter().any(|m| m.contains("ROI 2 (Cord) has no contour geometry")));
    }

    #[test]
    fn absent_mandatory_sequence_is_a_format_error() {
        let mut obj = structure_set(&[(1, "PTV")], &[1]);
        obj.remove_element(Tag(0x3006, 0x0039));
        let err = RtStruct::parse(&obj, None).unwrap_err();
        assert!(matches!(err, RtStructError::DataFormat { .. }));
        assert!(err.to_string().contains("ROIContourSequence"));
    }

    #[test]
    fn roi_without_observation_only_warns() {
        let obj = structure_set(&[(1, "PTV"), (2, "Body")], &[1]);
        let rtstruct = RtStruct::parse(&obj, None).expect("observations are optional per ROI");
        let body = rtstruct.roi(2).unwrap();
        assert_eq!(body.interpreted_type, None);
        assert!(rtstruct.observation(body).is_none());
        assert!(warnings_text(&rtstruct).contains("ROI 2 has no RT ROI observation"));
    }

    #[test]
    fn subset_keeps_only_selected_rois() {
        let obj = structure_set(&[(1, "PTV"), (2, "Cord"), (3, "Lung")], &[1, 2, 3]);
        let rtstruct = RtStruct::parse(&obj, None).unwrap();
        let subset = rtstruct.derive_subset(&BTreeSet::from([1, 3, 7])).unwrap();

        assert_eq!(subset.roi_numbers(), vec![1, 3]);
        assert_eq!(subset.structure_set.label, "Contours-subset");
        assert_eq!(subset.structure_set.name.as_deref(), Some("Contours ROI subset"));
        assert_ne!(
            subset.structure_set.sop_instance_uid,
            rtstruct.structure_set.sop_instance_uid
        );
        assert_eq!(
            subset.references.sop_instance_uids,
            vec![image_uid(1), image_uid(3)]
        );
        assert_eq!(rtstruct.roi_numbers(), vec![1, 2, 3]);
    }

    #[test]
    fn reencoding_regenerates_identifiers_and_keeps_content() {
        let obj = structure_set(&[(1, "PTV"), (2, "Cord")], &[1, 2]);
        let rtstruct = RtStruct::parse(&obj, None).unwrap();
        let encoded = rtstruct.to_dicom().expect("encodes");

        assert_ne!(encoded.sop_instance_uid, rtstruct.structure_set.sop_instance_uid);
        assert_eq!(
            encoded.file.meta().media_storage_sop_instance_uid(),
            encoded.sop_instance_uid
        );
        let again = RtStruct::parse(&encoded.file, None).expect("re-encoded file parses");
        assert_eq!(again.structure_set.rois, rtstruct.structure_set.rois);
        assert_eq!(
            again.structure_set.roi_contours,
            rtstruct.structure_set.roi_contours
        );
        assert_eq!(
            again.structure_set.manufacturer.as_deref(),
            Some(uid::MANUFACTURER)
        );
    }

    #[test]
    fn subset_without_any_observation_is_refused_up_front() {
        let obj = structure_set(&[(1, "PTV"), (2, "Body")], &[1]);
        let rtstruct = RtStruct::parse(&obj, None).unwrap();

        let err = rtstruct.derive_subset(&BTreeSet::from([2])).unwrap_err();
        assert!(matches!(err, RtStructError::Subset { .. }));
        assert!(err.to_string().contains("RT ROI observation"));

        let err = rtstruct.derive_subset(&BTreeSet::from([9])).unwrap_err();
        assert!(err.to_string().contains("none of the requested ROIs exist"));

        let mixed = rtstruct.derive_subset(&BTreeSet::from([1, 2])).unwrap();
        let encoded = mixed.to_dicom().expect("one observation is enough");
        let again = RtStruct::parse(&encoded.file, None).unwrap();
        assert_eq!(again.roi_numbers(), vec![1, 2]);
        assert!(again.observation(again.roi(2).unwrap()).is_none());
    }

    #[test]
    fn tiny_coordinates_are_stable_through_reencoding() {
        let mut obj = structure_set(&[(1, "PTV")], &[1]);
        let mut contour = InMemDicomObject::new_empty();
        put(&mut contour, Tag(0x3006, 0x0042), VR::CS, "POINT");
        put(&mut contour, Tag(0x3006, 0x0046), VR::IS, "1");
        put(
            &mut contour,
            Tag(0x3006, 0x0050),
            VR::DS,
            "1.2345678901e-07\\2.5\\-3.0517578e-05",
        );
        let mut geometry = roi_contour(1);
        put_items(&mut geometry, Tag(0x3006, 0x0040), vec![contour]);
        put_items(&mut obj, Tag(0x3006, 0x0039), vec![geometry]);

        let first = RtStruct::parse(&obj, None).unwrap();
        let second = RtStruct::parse(&first.to_dicom().unwrap().file, None).unwrap();
        let data = |rt: &RtStruct| rt.structure_set.roi_contours[0].contours[0].data.clone();
        assert_eq!(data(&first), vec![1.2345678901e-07, 2.5, -3.0517578e-05]);
        assert_eq!(data(&second), data(&first));
    }
}
