//
// rtstruct_workflows.rs
// XNAT-RTStruct-rs
//
// End-to-end tests: decoding files from disk, re-encoding, ROI subsets, dependency resolution, batch validation and ROI XML.
//

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use dicom::core::value::DataSetSequence;
use dicom::core::{DataElement, PrimitiveValue, Tag, VR};
use dicom::dictionary_std::StandardDataDictionary;
use dicom::object::{open_file, FileDicomObject, FileMetaTableBuilder, InMemDicomObject};
use dicom::transfer_syntax::entries::EXPLICIT_VR_LITTLE_ENDIAN;
use tempfile::{tempdir, TempDir};
use xnat_rtstruct::dependencies::{ScanRef, SessionRef};
use xnat_rtstruct::{
    batch, upload, DependencyResolver, ImageRepository, RepositoryError, RtStruct, RtStructError,
};

const RT_STRUCTURE_SET_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.481.3";
const CT_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.2";
const STUDY: &str = "1.2.826.0.1.3680043.2.1125.100";
const SERIES: &str = "1.2.826.0.1.3680043.2.1125.200";
const FRAME: &str = "1.2.826.0.1.3680043.2.1125.300";

fn put(obj: &mut InMemDicomObject, tag: Tag, vr: VR, value: &str) {
    obj.put(DataElement::new(tag, vr, PrimitiveValue::from(value)));
}

fn put_items(obj: &mut InMemDicomObject, tag: Tag, items: Vec<InMemDicomObject>) {
    obj.put(DataElement::new(tag, VR::SQ, DataSetSequence::from(items)));
}

fn image_uid(n: i32) -> String {
    format!("{SERIES}.{n}")
}

fn image_ref(n: i32) -> InMemDicomObject {
    let mut item = InMemDicomObject::new_empty();
    put(&mut item, Tag(0x0008, 0x1150), VR::UI, CT_IMAGE_STORAGE);
    put(&mut item, Tag(0x0008, 0x1155), VR::UI, &image_uid(n));
    item
}

fn contour(image: i32, points: &str, data: &str) -> InMemDicomObject {
    let mut item = InMemDicomObject::new_empty();
    put(&mut item, Tag(0x3006, 0x0048), VR::IS, "1");
    put_items(&mut item, Tag(0x3006, 0x0016), vec![image_ref(image)]);
    put(&mut item, Tag(0x3006, 0x0042), VR::CS, "CLOSED_PLANAR");
    put(&mut item, Tag(0x3006, 0x0046), VR::IS, points);
    put(&mut item, Tag(0x3006, 0x0050), VR::DS, data);
    item
}

fn roi_contour(number: i32, contours: Vec<InMemDicomObject>) -> InMemDicomObject {
    let mut item = InMemDicomObject::new_empty();
    put(&mut item, Tag(0x3006, 0x0084), VR::IS, &number.to_string());
    put(&mut item, Tag(0x3006, 0x002A), VR::IS, "0\\255\\0");
    put_items(&mut item, Tag(0x3006, 0x0040), contours);
    item
}

fn square(number: i32) -> InMemDicomObject {
    let z = format!("{}.5", number * 3);
    roi_contour(
        number,
        vec![contour(
            number,
            "4",
            &format!("-12.5\\-12.5\\{z}\\12.5\\-12.5\\{z}\\12.5\\12.5\\{z}\\-12.5\\12.5\\{z}"),
        )],
    )
}

fn structure_set_roi(number: i32, name: &str) -> InMemDicomObject {
    let mut item = InMemDicomObject::new_empty();
    put(&mut item, Tag(0x3006, 0x0022), VR::IS, &number.to_string());
    put(&mut item, Tag(0x3006, 0x0024), VR::UI, FRAME);
    put(&mut item, Tag(0x3006, 0x0026), VR::LO, name);
    put(&mut item, Tag(0x3006, 0x0036), VR::CS, "AUTOMATIC");
    item
}

fn observation(number: i32) -> InMemDicomObject {
    let mut item = InMemDicomObject::new_empty();
    put(&mut item, Tag(0x3006, 0x0082), VR::IS, &(number + 100).to_string());
    put(&mut item, Tag(0x3006, 0x0084), VR::IS, &number.to_string());
    put(&mut item, Tag(0x3006, 0x00A4), VR::CS, "PTV");
    put(&mut item, Tag(0x3006, 0x00A6), VR::PN, "Physicist^Alex");
    item
}

fn frame_of_reference(images: &[i32]) -> InMemDicomObject {
    let mut series = InMemDicomObject::new_empty();
    put(&mut series, Tag(0x0020, 0x000E), VR::UI, SERIES);
    put_items(
        &mut series,
        Tag(0x3006, 0x0016),
        images.iter().map(|n| image_ref(*n)).collect(),
    );
    let mut study = InMemDicomObject::new_empty();
    put(&mut study, Tag(0x0008, 0x1150), VR::UI, "1.2.840.10008.3.1.2.3.1");
    put(&mut study, Tag(0x0008, 0x1155), VR::UI, STUDY);
    put_items(&mut study, Tag(0x3006, 0x0014), vec![series]);
    let mut frame = InMemDicomObject::new_empty();
    put(&mut frame, Tag(0x0020, 0x0052), VR::UI, FRAME);
    put_items(&mut frame, Tag(0x3006, 0x0012), vec![study]);
    frame
}

/// A structure set with one square contour per ROI, ROI `n` drawn on image `n`.
fn build_structure_set(rois: &[(i32, &str)], observed: &[i32]) -> InMemDicomObject {
    let mut obj = InMemDicomObject::new_empty();
    put(&mut obj, Tag(0x0008, 0x0016), VR::UI, RT_STRUCTURE_SET_STORAGE);
    put(&mut obj, Tag(0x0008, 0x0018), VR::UI, "1.2.826.0.1.3680043.2.1125.400");
    put(&mut obj, Tag(0x0008, 0x0020), VR::DA, "20240301");
    put(&mut obj, Tag(0x0008, 0x0030), VR::TM, "120000");
    put(&mut obj, Tag(0x0008, 0x0050), VR::SH, "ACC42");
    put(&mut obj, Tag(0x0008, 0x0060), VR::CS, "RTSTRUCT");
    put(&mut obj, Tag(0x0008, 0x0070), VR::LO, "TPS");
    put(&mut obj, Tag(0x0008, 0x0090), VR::PN, "Referrer^Ann");
    put(&mut obj, Tag(0x0008, 0x1070), VR::PN, "Operator^Bo");
    put(&mut obj, Tag(0x0010, 0x0010), VR::PN, "Test^Patient");
    put(&mut obj, Tag(0x0010, 0x0020), VR::LO, "PAT123");
    put(&mut obj, Tag(0x0010, 0x0030), VR::DA, "19700101");
    put(&mut obj, Tag(0x0010, 0x0040), VR::CS, "O");
    put(&mut obj, Tag(0x0020, 0x000D), VR::UI, STUDY);
    put(&mut obj, Tag(0x0020, 0x000E), VR::UI, "1.2.826.0.1.3680043.2.1125.500");
    put(&mut obj, Tag(0x0020, 0x0010), VR::SH, "S1");
    put(&mut obj, Tag(0x0020, 0x0011), VR::IS, "7");
    put(&mut obj, Tag(0x3006, 0x0002), VR::SH, "Plan structures");
    put(&mut obj, Tag(0x3006, 0x0004), VR::LO, "Head and neck");
    put(&mut obj, Tag(0x3006, 0x0008), VR::DA, "20240302");
    put(&mut obj, Tag(0x3006, 0x0009), VR::TM, "080000");
    // Private tag: not modelled, must survive re-encoding.
    put(&mut obj, Tag(0x0011, 0x0010), VR::LO, "ACME private");

    let images: Vec<i32> = rois.iter().map(|(n, _)| *n).collect();
    put_items(&mut obj, Tag(0x3006, 0x0010), vec![frame_of_reference(&images)]);
    put_items(
        &mut obj,
        Tag(0x3006, 0x0020),
        rois.iter().map(|(n, name)| structure_set_roi(*n, name)).collect(),
    );
    put_items(
        &mut obj,
        Tag(0x3006, 0x0039),
        rois.iter().map(|(n, _)| square(*n)).collect(),
    );
    put_items(
        &mut obj,
        Tag(0x3006, 0x0080),
        observed.iter().map(|n| observation(*n)).collect(),
    );
    obj
}

fn write_dicom(dir: &Path, name: &str, obj: InMemDicomObject, sop_class: &str) -> PathBuf {
    let path = dir.join(name);
    let meta = FileMetaTableBuilder::new()
        .transfer_syntax(EXPLICIT_VR_LITTLE_ENDIAN.uid())
        .media_storage_sop_class_uid(sop_class)
        .media_storage_sop_instance_uid(format!("2.25.{}", name.len()))
        .build()
        .expect("meta");
    let mut file = FileDicomObject::new_empty_with_dict_and_meta(StandardDataDictionary, meta);
    for elem in obj {
        file.put(elem);
    }
    file.write_to_file(&path).expect("write dicom");
    path
}

fn sample_file(rois: &[(i32, &str)], observed: &[i32]) -> (TempDir, PathBuf) {
    let dir = tempdir().expect("tempdir");
    let path = write_dicom(
        dir.path(),
        "rtstruct.dcm",
        build_structure_set(rois, observed),
        RT_STRUCTURE_SET_STORAGE,
    );
    (dir, path)
}

struct MemoryRepository {
    sessions: Vec<SessionRef>,
    scans: Vec<ScanRef>,
    images: Vec<String>,
}

impl MemoryRepository {
    fn with_series(series: &[&str]) -> Self {
        Self {
            sessions: vec![SessionRef {
                project: "HN".into(),
                subject_id: "XNAT_S01".into(),
                subject_label: "PAT123".into(),
                session_id: "XNAT_E01".into(),
                session_label: "PAT123_CT".into(),
                study_uid: STUDY.into(),
            }],
            scans: series
                .iter()
                .enumerate()
                .map(|(i, uid)| ScanRef {
                    id: (i + 1).to_string(),
                    series_uid: uid.to_string(),
                })
                .collect(),
            images: (1..=5).map(image_uid).collect(),
        }
    }
}

impl ImageRepository for MemoryRepository {
    fn sessions_for_studies(
        &self,
        _project: &str,
        study_uids: &[String],
    ) -> Result<Vec<SessionRef>, RepositoryError> {
        Ok(self
            .sessions
            .iter()
            .filter(|s| study_uids.contains(&s.study_uid))
            .cloned()
            .collect())
    }

    fn scans_for_series(
        &self,
        _session: &SessionRef,
        series_uids: &[String],
    ) -> Result<Vec<ScanRef>, RepositoryError> {
        Ok(self
            .scans
            .iter()
            .filter(|s| series_uids.contains(&s.series_uid))
            .cloned()
            .collect())
    }

    fn local_file(
        &self,
        session: &SessionRef,
        scan: &ScanRef,
        sop_instance_uid: &str,
    ) -> Result<Option<PathBuf>, RepositoryError> {
        Ok(self
            .images
            .iter()
            .any(|uid| uid == sop_instance_uid)
            .then(|| {
                PathBuf::from(format!(
                    "cache/{}/{}/{sop_instance_uid}.dcm",
                    session.session_id, scan.id
                ))
            }))
    }
}

#[test]
fn reencoded_file_decodes_to_the_same_structures() {
    let (dir, path) = sample_file(&[(1, "PTV"), (2, "Parotid L"), (5, "Cord")], &[1, 2, 5]);
    let original = RtStruct::open(&path, None).expect("parse original");

    let encoded = original.to_dicom().expect("encode");
    let out = dir.path().join("reencoded.dcm");
    upload::write_encoded(&encoded, &out).expect("write");
    let decoded = RtStruct::open(&out, None).expect("parse re-encoded");

    assert_eq!(decoded.structure_set.rois, original.structure_set.rois);
    assert_eq!(decoded.structure_set.roi_contours, original.structure_set.roi_contours);
    assert_eq!(decoded.structure_set.observations, original.structure_set.observations);
    assert_eq!(
        decoded.structure_set.referenced_frames,
        original.structure_set.referenced_frames
    );
    assert_eq!(decoded.structure_set.patient, original.structure_set.patient);
    assert_eq!(decoded.references, original.references);

    assert_ne!(decoded.structure_set.sop_instance_uid, original.structure_set.sop_instance_uid);
    assert_ne!(
        decoded.structure_set.series_instance_uid,
        original.structure_set.series_instance_uid
    );
    assert_eq!(decoded.structure_set.sop_class_uid, RT_STRUCTURE_SET_STORAGE);
    assert!(decoded.structure_set.instance_creation_date.is_some());

    let raw = open_file(&out).expect("open re-encoded");
    let private = raw.element(Tag(0x0011, 0x0010)).expect("private tag carried over");
    assert_eq!(private.to_str().expect("text").trim(), "ACME private");

    // decode . encode . decode is stable.
    let again = RtStruct::parse(&decoded.to_dicom().expect("encode again").file, None)
        .expect("parse again");
    assert_eq!(again.structure_set.rois, decoded.structure_set.rois);
    assert_eq!(again.structure_set.roi_contours, decoded.structure_set.roi_contours);
    assert_eq!(again.structure_set.observations, decoded.structure_set.observations);
}

#[test]
fn subsets_contain_exactly_the_chosen_rois() {
    let (_dir, path) = sample_file(&[(1, "PTV"), (2, "Parotid L"), (5, "Cord")], &[1, 2, 5]);
    let rtstruct = RtStruct::open(&path, None).expect("parse");
    let all: BTreeSet<i32> = rtstruct.roi_numbers().into_iter().collect();

    for chosen in [vec![1], vec![2, 5], vec![5, 9], vec![1, 2, 5], vec![42]] {
        let chosen: BTreeSet<i32> = chosen.into_iter().collect();
        let Ok(subset) = rtstruct.derive_subset(&chosen) else {
            assert!((&chosen & &all).is_empty(), "{chosen:?} should form a subset");
            continue;
        };
        let kept: BTreeSet<i32> = subset.roi_numbers().into_iter().collect();
        assert_eq!(kept, &chosen & &all);
        assert!(subset
            .structure_set
            .roi_contours
            .iter()
            .all(|c| chosen.contains(&c.referenced_roi_number)));
        assert!(subset
            .structure_set
            .observations
            .iter()
            .all(|o| chosen.contains(&o.referenced_roi_number)));
        let expected_images: Vec<String> = kept.iter().map(|n| image_uid(*n)).collect();
        assert_eq!(subset.references.sop_instance_uids, expected_images);
    }
    assert_eq!(rtstruct.roi_numbers(), vec![1, 2, 5]);
}

#[test]
fn subset_file_is_a_valid_structure_set() {
    let (dir, path) = sample_file(&[(1, "PTV"), (2, "Parotid L"), (5, "Cord")], &[1, 2, 5]);
    let rtstruct = RtStruct::open(&path, None).expect("parse");
    let subset = rtstruct.derive_subset(&BTreeSet::from([2])).expect("subset");
    let encoded = subset.to_dicom().expect("encode subset");
    let out = dir.path().join("subset.dcm");
    upload::write_encoded(&encoded, &out).expect("write subset");

    let reopened = RtStruct::open(&out, None).expect("subset parses");
    assert_eq!(reopened.roi_numbers(), vec![2]);
    assert_eq!(reopened.structure_set.label, "Plan stru-subset");
    assert_eq!(
        reopened.structure_set.name.as_deref(),
        Some("Head and neck ROI subset")
    );
    assert_eq!(reopened.references.sop_instance_uids, vec![image_uid(2)]);
}

#[test]
fn missing_roi_contour_sequence_is_a_format_error() {
    let mut obj = build_structure_set(&[(1, "PTV")], &[1]);
    obj.remove_element(Tag(0x3006, 0x0039));
    let err = RtStruct::parse(&obj, None).expect_err("must fail");
    match err {
        RtStructError::DataFormat { reason, .. } => assert!(reason.contains("ROIContourSequence")),
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn non_rtstruct_input_is_rejected() {
    let mut obj = build_structure_set(&[(1, "PTV")], &[1]);
    put(&mut obj, Tag(0x0008, 0x0060), VR::CS, "MR");
    assert!(matches!(
        RtStruct::parse(&obj, None),
        Err(RtStructError::DataFormat { .. })
    ));
}

#[test]
fn retired_tag_is_reported_as_warning_only() {
    let mut obj = build_structure_set(&[(1, "PTV")], &[1]);
    let mut frame = frame_of_reference(&[1]);
    put_items(&mut frame, Tag(0x3006, 0x00C0), vec![InMemDicomObject::new_empty()]);
    put_items(&mut obj, Tag(0x3006, 0x0010), vec![frame]);

    let rtstruct = RtStruct::parse(&obj, None).expect("retired tags do not block parsing");
    assert!(rtstruct
        .warnings
        .iter()
        .any(|w| w.message.contains("(3006,00C0)")));
}

#[test]
fn contour_data_length_mismatch_rejects_the_file() {
    let mut obj = build_structure_set(&[(1, "PTV"), (2, "Cord")], &[1, 2]);
    let bad = roi_contour(2, vec![contour(2, "3", "0\\0\\0\\1\\1\\1\\2\\2")]);
    put_items(&mut obj, Tag(0x3006, 0x0039), vec![square(1), bad]);

    let err = RtStruct::parse(&obj, None).expect_err("must fail");
    let messages: Vec<String> = err.errors().iter().map(ToString::to_string).collect();
    assert!(matches!(err, RtStructError::DataRepresentation { .. }));
    assert!(messages.iter().any(|m| m.contains("ContourData (3006,0050)")));
    assert!(messages.iter().any(|m| m.contains("ROI 2")));
}

#[test]
fn roi_without_observation_parses_with_warning() {
    let (_dir, path) = sample_file(&[(1, "PTV"), (2, "External")], &[1]);
    let rtstruct = RtStruct::open(&path, None).expect("parse");
    let external = rtstruct.roi(2).expect("ROI 2");
    assert_eq!(external.interpreted_type, None);
    assert_eq!(external.interpreter, None);
    assert!(rtstruct
        .warnings
        .iter()
        .any(|w| w.message.contains("ROI 2 has no RT ROI observation")));
}

#[test]
fn unknown_series_fails_and_names_the_uid() {
    let repository = MemoryRepository::with_series(&["1.2.3.4.5.6"]);
    let resolver = DependencyResolver::new(&repository, "HN");
    let obj = build_structure_set(&[(1, "PTV")], &[1]);

    let err = RtStruct::parse(&obj, Some(&resolver)).expect_err("must fail");
    assert!(err.errors().iter().any(|e| e.message.contains(SERIES)));
}

#[test]
fn resolved_dependencies_follow_subsets() {
    let repository = MemoryRepository::with_series(&[SERIES]);
    let resolver = DependencyResolver::new(&repository, "HN");
    let obj = build_structure_set(&[(1, "PTV"), (2, "Cord")], &[1, 2]);

    let rtstruct = RtStruct::parse(&obj, Some(&resolver)).expect("parse");
    let deps = rtstruct.dependencies.as_ref().expect("resolved");
    assert_eq!(deps.sessions[0].session_label, "PAT123_CT");
    assert_eq!(deps.scan_for_series[SERIES], "1");
    assert_eq!(deps.file_for_sop.len(), 2);

    let subset = rtstruct.derive_subset(&BTreeSet::from([2])).expect("subset");
    let deps = subset.dependencies.as_ref().expect("carried over");
    assert_eq!(deps.file_for_sop.keys().cloned().collect::<Vec<_>>(), vec![image_uid(2)]);
}

#[test]
fn batch_reports_each_structure_set_and_skips_images() {
    let dir = tempdir().expect("tempdir");
    write_dicom(
        dir.path(),
        "a_good.dcm",
        build_structure_set(&[(1, "PTV")], &[1]),
        RT_STRUCTURE_SET_STORAGE,
    );
    let mut broken = build_structure_set(&[(1, "PTV")], &[1]);
    broken.remove_element(Tag(0x3006, 0x0002));
    write_dicom(dir.path(), "b_broken.dcm", broken, RT_STRUCTURE_SET_STORAGE);
    let mut image = InMemDicomObject::new_empty();
    put(&mut image, Tag(0x0008, 0x0060), VR::CS, "CT");
    write_dicom(dir.path(), "c_image.dcm", image, CT_IMAGE_STORAGE);

    let reports = batch::validate_directory(dir.path(), None).expect("batch");
    assert_eq!(reports.len(), 2);
    assert!(reports[0].valid);
    assert_eq!(reports[0].roi_count, Some(1));
    assert!(!reports[1].valid);
    assert!(reports[1].errors.iter().any(|e| e.contains("StructureSetLabel")));
}

#[test]
fn roi_xml_describes_the_roi() {
    let (_dir, path) = sample_file(&[(1, "PTV"), (2, "Cord")], &[1, 2]);
    let rtstruct = RtStruct::open(&path, None).expect("parse");
    let roi = rtstruct.roi(2).expect("ROI 2");
    let xml = upload::roi_xml(&rtstruct, roi, &rtstruct.structure_set.sop_instance_uid)
        .expect("xml");

    assert!(xml.contains("<icr:roiName>Cord</icr:roiName>"));
    assert!(xml.contains("<icr:nContours>1</icr:nContours>"));
    assert!(xml.contains("<icr:nPoints>4</icr:nPoints>"));
    assert!(xml.contains("<icr:roiInterpreter>Physicist^Alex</icr:roiInterpreter>"));
    assert!(xml.contains(FRAME));
}
