//
// dicom_access.rs
// XNAT-RTStruct-rs
//
// Typed scalar/array access to DICOM data set levels; every access is classified by the presence validator.
//

use std::str::FromStr;

use dicom::core::value::Value;
use dicom::core::{DataElement, PrimitiveValue, Tag, VR};
use dicom::object::mem::InMemElement;
use dicom::object::InMemDicomObject;

use crate::validate::{classify, Diagnostics, Requirement};

/// Static description of one attribute: where it lives and how strictly it is required.
#[derive(Debug, Copy, Clone)]
pub struct Field {
    pub tag: Tag,
    pub keyword: &'static str,
    pub vr: VR,
    pub requirement: Requirement,
}

impl Field {
    pub const fn new(tag: Tag, keyword: &'static str, vr: VR, requirement: Requirement) -> Self {
        Self {
            tag,
            keyword,
            vr,
            requirement,
        }
    }
}

/// Reads fields of one data set level on behalf of a named entity.
pub struct TagReader<'a> {
    pub(crate) obj: &'a InMemDicomObject,
    pub(crate) entity: &'static str,
    pub(crate) diagnostics: Diagnostics,
}

impl<'a> TagReader<'a> {
    pub fn new(obj: &'a InMemDicomObject, entity: &'static str) -> Self {
        Self {
            obj,
            entity,
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn string(&mut self, field: &Field) -> Option<String> {
        self.string_checked(field, |_| true)
    }

    pub fn string_checked(
        &mut self,
        field: &Field,
        check: impl FnOnce(&String) -> bool,
    ) -> Option<String> {
        self.read_with(field, element_text, check)
    }

    pub fn int(&mut self, field: &Field) -> Option<i32> {
        self.int_checked(field, |_| true)
    }

    pub fn int_checked(&mut self, field: &Field, check: impl FnOnce(&i32) -> bool) -> Option<i32> {
        self.read_with(field, single_value, check)
    }

    pub fn ints_checked(
        &mut self,
        field: &Field,
        check: impl FnOnce(&Vec<i32>) -> bool,
    ) -> Option<Vec<i32>> {
        self.read_with(field, multi_value, check)
    }

    pub fn floats(&mut self, field: &Field) -> Option<Vec<f64>> {
        self.floats_checked(field, |_| true)
    }

    pub fn floats_checked(
        &mut self,
        field: &Field,
        check: impl FnOnce(&Vec<f64>) -> bool,
    ) -> Option<Vec<f64>> {
        self.read_with(field, multi_value, check)
    }

    /// Presence check for attributes that are not modelled, typically retired ones.
    pub fn presence(&mut self, field: &Field) -> bool {
        let present = self.obj.element(field.tag).is_ok();
        self.report(field, present, present);
        present
    }

    /// Classify one access and keep the resulting diagnostic, if any.
    pub fn report(&mut self, field: &Field, present: bool, valid: bool) {
        let outcome = classify(present, valid, field.requirement);
        self.diagnostics
            .record(self.entity, field.keyword, field.tag, outcome);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.diagnostics.error(self.entity, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.diagnostics.warning(self.entity, message);
    }

    pub fn merge(&mut self, diagnostics: Diagnostics) {
        self.diagnostics.merge(diagnostics);
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    fn read_with<T>(
        &mut self,
        field: &Field,
        parse: impl FnOnce(&InMemElement) -> Option<T>,
        check: impl FnOnce(&T) -> bool,
    ) -> Option<T> {
        let Ok(element) = self.obj.element(field.tag) else {
            self.report(field, false, false);
            return None;
        };
        if is_empty_value(element) {
            self.report(field, true, field.requirement.allows_empty());
            return None;
        }
        match parse(element) {
            Some(value) if check(&value) => {
                self.report(field, true, true);
                Some(value)
            }
            _ => {
                self.report(field, true, false);
                None
            }
        }
    }
}

/// Builds one data set level on behalf of a named entity.
///
/// Fields the model leaves unset are removed, so a writer started
/// [`over`](TagWriter::over) an existing object never leaks stale values.
pub struct TagWriter {
    pub(crate) obj: InMemDicomObject,
    pub(crate) entity: &'static str,
    pub(crate) diagnostics: Diagnostics,
}

impl TagWriter {
    pub fn new(entity: &'static str) -> Self {
        Self::over(InMemDicomObject::new_empty(), entity)
    }

    pub fn over(obj: InMemDicomObject, entity: &'static str) -> Self {
        Self {
            obj,
            entity,
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn string(&mut self, field: &Field, value: Option<&str>) {
        self.string_checked(field, value, |_| true);
    }

    /// Write a string, applying the same content check the matching read uses.
    ///
    /// Blank values skip the check, as on read, and only need the field to allow empty values.
    pub fn string_checked(&mut self, field: &Field, value: Option<&str>, check: impl FnOnce(&str) -> bool) {
        let valid = value.map_or(true, |s| {
            if s.trim().is_empty() {
                field.requirement.allows_empty()
            } else {
                check(s)
            }
        });
        self.put(field, value.map(|s| PrimitiveValue::from(s.to_string())), valid);
    }

    pub fn int(&mut self, field: &Field, value: Option<i32>) {
        self.int_checked(field, value, |_| true);
    }

    pub fn int_checked(&mut self, field: &Field, value: Option<i32>, check: impl FnOnce(i32) -> bool) {
        let valid = value.map_or(true, check);
        self.put(field, value.map(|v| PrimitiveValue::from(v.to_string())), valid);
    }

    pub fn ints_checked(&mut self, field: &Field, value: Option<&[i32]>, check: impl FnOnce(&[i32]) -> bool) {
        let valid = value.map_or(true, check);
        let value = value.map(|values| PrimitiveValue::Strs(values.iter().map(i32::to_string).collect()));
        self.put(field, value, valid);
    }

    pub fn floats_checked(&mut self, field: &Field, value: Option<&[f64]>, check: impl FnOnce(&[f64]) -> bool) {
        let valid = value.map_or(true, |values| values.iter().all(|v| v.is_finite()) && check(values));
        let value = value.map(|values| {
            PrimitiveValue::Strs(values.iter().copied().map(format_decimal).collect())
        });
        self.put(field, value, valid);
    }

    pub fn report(&mut self, field: &Field, present: bool, valid: bool) {
        let outcome = classify(present, valid, field.requirement);
        self.diagnostics
            .record(self.entity, field.keyword, field.tag, outcome);
    }

    pub fn merge(&mut self, diagnostics: Diagnostics) {
        self.diagnostics.merge(diagnostics);
    }

    pub fn finish(self) -> (InMemDicomObject, Diagnostics) {
        (self.obj, self.diagnostics)
    }

    fn put(&mut self, field: &Field, value: Option<PrimitiveValue>, valid: bool) {
        match value {
            Some(value) => {
                self.obj.put(DataElement::new(field.tag, field.vr, value));
                self.report(field, true, valid);
            }
            None if is_type_two(field.requirement) => {
                self.obj
                    .put(DataElement::new(field.tag, field.vr, PrimitiveValue::Empty));
                self.report(field, true, true);
            }
            None => {
                self.obj.remove_element(field.tag);
                self.report(field, false, false);
            }
        }
    }
}

pub(crate) fn is_type_two(requirement: Requirement) -> bool {
    matches!(
        requirement,
        Requirement::RequiredAllowEmpty | Requirement::RequiredAllowEmptyConditional
    )
}

pub(crate) fn is_empty_value(element: &InMemElement) -> bool {
    match element.value() {
        Value::Primitive(p) => p.to_str().trim_matches([' ', '\0']).is_empty(),
        Value::Sequence(seq) => seq.items().is_empty(),
        Value::PixelSequence(_) => false,
    }
}

fn element_text(element: &InMemElement) -> Option<String> {
    element
        .to_str()
        .ok()
        .map(|s| s.trim_matches([' ', '\0']).to_string())
}

fn multi_value<T: FromStr>(element: &InMemElement) -> Option<Vec<T>> {
    // Works for string VRs (IS/DS) and binary numeric VRs alike.
    let text = element.to_str().ok()?;
    text.split('\\')
        .map(|part| part.trim_matches([' ', '\0']).parse().ok())
        .collect()
}

fn single_value<T: FromStr>(element: &InMemElement) -> Option<T> {
    let mut values = multi_value::<T>(element)?;
    if values.len() == 1 {
        values.pop()
    } else {
        None
    }
}

/// Render a value as a DICOM decimal string (at most 16 characters).
///
/// The shortest exact form is used when it fits, plain or exponent. Otherwise
/// precision is reduced in both notations and the closer result wins.
pub fn format_decimal(value: f64) -> String {
    let plain = value.to_string();
    if plain.len() <= 16 {
        return plain;
    }
    let exponent = format!("{value:e}");
    if exponent.len() <= 16 {
        return exponent;
    }

    let fixed = (0..=15)
        .rev()
        .map(|precision| {
            let text = format!("{value:.precision$}");
            if text.contains('.') {
                text.trim_end_matches('0').trim_end_matches('.').to_string()
            } else {
                text
            }
        })
        .find(|text| text.len() <= 16);
    let scientific = (0..=15)
        .rev()
        .map(|precision| format!("{value:.precision$e}"))
        .find(|text| text.len() <= 16);

    let error = |text: &String| text.parse::<f64>().map_or(f64::INFINITY, |v| (v - value).abs());
    match (fixed, scientific) {
        (Some(fixed), Some(scientific)) if error(&scientific) < error(&fixed) => scientific,
        (Some(fixed), _) => fixed,
        (None, Some(scientific)) => scientific,
        (None, None) => exponent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROI_NUMBER: Field = Field::new(
        Tag(0x3006, 0x0022),
        "ROINumber",
        VR::IS,
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

    fn object_with(elements: Vec<(Tag, VR, PrimitiveValue)>) -> InMemDicomObject {
        let mut obj = InMemDicomObject::new_empty();
        for (tag, vr, value) in elements {
            obj.put(DataElement::new(tag, vr, value));
        }
        obj
    }

    #[test]
    fn missing_required_tag_yields_none_and_an_error() {
        let obj = InMemDicomObject::new_empty();
        let mut reader = TagReader::new(&obj, "StructureSetROI");
        assert_eq!(reader.int(&ROI_NUMBER), None);
        let diagnostics = reader.into_diagnostics();
        assert_eq!(diagnostics.errors.len(), 1);
        assert!(diagnostics.errors[0].message.contains("(3006,0022)"));
    }

    #[test]
    fn empty_type_two_value_is_silent() {
        let obj = object_with(vec![(ROI_NAME.tag, VR::LO, PrimitiveValue::Empty)]);
        let mut reader = TagReader::new(&obj, "StructureSetROI");
        assert_eq!(reader.string(&ROI_NAME), None);
        let diagnostics = reader.into_diagnostics();
        assert!(diagnostics.errors.is_empty());
        assert!(diagnostics.warnings.is_empty());
    }

    #[test]
    fn unparsable_integer_string_is_invalid() {
        let obj = object_with(vec![(ROI_NUMBER.tag, VR::IS, PrimitiveValue::from("x7"))]);
        let mut reader = TagReader::new(&obj, "StructureSetROI");
        assert_eq!(reader.int(&ROI_NUMBER), None);
        let diagnostics = reader.into_diagnostics();
        assert!(diagnostics.errors[0].message.contains("invalid tag contents"));
    }

    #[test]
    fn padded_values_are_trimmed() {
        let obj = object_with(vec![
            (ROI_NUMBER.tag, VR::IS, PrimitiveValue::from(" 12 ")),
            (ROI_NAME.tag, VR::LO, PrimitiveValue::from("PTV ")),
        ]);
        let mut reader = TagReader::new(&obj, "StructureSetROI");
        assert_eq!(reader.int(&ROI_NUMBER), Some(12));
        assert_eq!(reader.string(&ROI_NAME).as_deref(), Some("PTV"));
        assert!(!reader.into_diagnostics().has_errors());
    }

    #[test]
    fn absent_optional_tag_warns() {
        let obj = InMemDicomObject::new_empty();
        let mut reader = TagReader::new(&obj, "StructureSetROI");
        assert_eq!(reader.string(&ROI_DESCRIPTION), None);
        let diagnostics = reader.into_diagnostics();
        assert!(diagnostics.errors.is_empty());
        assert_eq!(diagnostics.warnings.len(), 1);
    }

    #[test]
    fn writer_emits_empty_type_two_and_drops_unset_optional() {
        let base = object_with(vec![(
            ROI_DESCRIPTION.tag,
            VR::ST,
            PrimitiveValue::from("stale"),
        )]);
        let mut writer = TagWriter::over(base, "StructureSetROI");
        writer.int(&ROI_NUMBER, Some(4));
        writer.string(&ROI_NAME, None);
        writer.string(&ROI_DESCRIPTION, None);
        let (obj, diagnostics) = writer.finish();

        assert!(!diagnostics.has_errors());
        assert_eq!(diagnostics.warnings.len(), 1);
        assert!(obj.element(ROI_NAME.tag).is_ok());
        assert!(obj.element(ROI_DESCRIPTION.tag).is_err());
        assert_eq!(obj.element(ROI_NUMBER.tag).unwrap().to_str().unwrap(), "4");
    }

    #[test]
    fn writer_rejects_missing_required_value() {
        let mut writer = TagWriter::new("StructureSetROI");
        writer.int(&ROI_NUMBER, None);
        let (_, diagnostics) = writer.finish();
        assert!(diagnostics.errors[0].message.contains("required but absent"));
    }

    #[test]
    fn writer_applies_the_read_checks() {
        let mut writer = TagWriter::new("StructureSetROI");
        writer.string_checked(&ROI_NAME, Some("SPLINE"), |name| name == "PTV");
        writer.int_checked(&ROI_NUMBER, Some(0), |n| n > 0);
        let (obj, diagnostics) = writer.finish();
        assert_eq!(diagnostics.errors.len(), 2);
        assert!(diagnostics
            .errors
            .iter()
            .all(|e| e.message.contains("invalid tag contents")));

        // What the writer rejects, the reader rejects too.
        let mut reader = TagReader::new(&obj, "StructureSetROI");
        assert_eq!(reader.string_checked(&ROI_NAME, |name| name == "PTV"), None);
        assert_eq!(reader.int_checked(&ROI_NUMBER, |n| *n > 0), None);
        assert_eq!(reader.into_diagnostics().errors.len(), 2);
    }

    #[test]
    fn writer_skips_checks_for_blank_type_two_values() {
        let mut writer = TagWriter::new("StructureSetROI");
        writer.string_checked(&ROI_NAME, Some(""), |name| name == "PTV");
        let (_, diagnostics) = writer.finish();
        assert!(!diagnostics.has_errors());
    }

    #[test]
    fn decimal_strings_fit_sixteen_characters() {
        assert_eq!(format_decimal(1.5), "1.5");
        assert_eq!(format_decimal(-120.0), "-120");
        let long = format_decimal(-123.456789012345678);
        assert!(long.len() <= 16, "{long}");
        assert!((long.parse::<f64>().unwrap() - -123.456789012345678).abs() < 1e-9);
        assert!(format_decimal(1e300).len() <= 16);
        assert!(format_decimal(-1.234567890123456e-300).len() <= 16);
    }

    #[test]
    fn small_coordinates_survive_a_round_trip() {
        for value in [1.2345678901e-07, -1.2345678901e-07, -3.0517578e-05, 2.5, 123456.78901234] {
            let text = format_decimal(value);
            assert!(text.len() <= 16, "{text}");
            assert_eq!(text.parse::<f64>().unwrap(), value, "{text}");
        }
    }

    #[test]
    fn oversized_precision_keeps_the_closer_notation() {
        let value = 1.234567890123456e-7;
        let text = format_decimal(value);
        assert!(text.contains('e'), "{text}");
        assert!((text.parse::<f64>().unwrap() - value).abs() < 1e-16);
    }
}
