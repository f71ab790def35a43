//
// codec.rs
// XNAT-RTStruct-rs
//
// Generic bidirectional mapping between entities and DICOM data set levels, including nested sequences.
//

use dicom::core::value::{DataSetSequence, Value};
use dicom::core::{DataElement, VR};
use dicom::object::InMemDicomObject;
use tracing::debug;

use crate::dicom_access::{is_type_two, Field, TagReader, TagWriter};
use crate::validate::{Diagnostics, Requirement};

/// A record that maps to one data set level (the top level or one sequence item).
///
/// Implementations form the codec table: each entity type owns its decode and
/// encode functions, and the sequence helpers dispatch on the item type
/// statically.
pub trait Entity: Sized {
    const NAME: &'static str;

    fn decode(reader: &mut TagReader<'_>) -> Self;

    fn encode(&self, writer: &mut TagWriter);
}

/// An entity together with every diagnostic produced while decoding it.
#[derive(Debug)]
pub struct Decoded<T> {
    pub value: T,
    pub diagnostics: Diagnostics,
}

/// A data set level together with every diagnostic produced while encoding it.
#[derive(Debug)]
pub struct Encoded {
    pub object: InMemDicomObject,
    pub diagnostics: Diagnostics,
}

pub fn decode<T: Entity>(obj: &InMemDicomObject) -> Decoded<T> {
    let mut reader = TagReader::new(obj, T::NAME);
    let value = T::decode(&mut reader);
    Decoded {
        value,
        diagnostics: reader.into_diagnostics(),
    }
}

pub fn encode<T: Entity>(value: &T) -> Encoded {
    let mut writer = TagWriter::new(T::NAME);
    value.encode(&mut writer);
    let (object, diagnostics) = writer.finish();
    Encoded {
        object,
        diagnostics,
    }
}

/// Decode every item, keeping only those without errors.
///
/// Diagnostics of all items are returned whether or not the item was kept,
/// so one broken item never hides its problems nor aborts its siblings.
pub fn decode_items<T: Entity>(items: &[InMemDicomObject]) -> (Vec<T>, Diagnostics) {
    items.iter().enumerate().fold(
        (Vec::with_capacity(items.len()), Diagnostics::default()),
        |(mut kept, mut all), (index, item)| {
            let Decoded { value, diagnostics } = decode::<T>(item);
            if diagnostics.has_errors() {
                debug!(
                    "dropping {} item {} with {} error(s)",
                    T::NAME,
                    index + 1,
                    diagnostics.errors.len()
                );
            } else {
                kept.push(value);
            }
            all.merge(diagnostics);
            (kept, all)
        },
    )
}

impl TagReader<'_> {
    /// Read a sequence field as a list of `T`.
    pub fn sequence<T: Entity>(&mut self, field: &Field) -> Vec<T> {
        let Ok(element) = self.obj.element(field.tag) else {
            self.report(field, false, false);
            return Vec::new();
        };
        let items = match element.value() {
            Value::Sequence(seq) => seq.items(),
            _ => {
                self.report(field, true, false);
                return Vec::new();
            }
        };
        if items.is_empty() {
            self.report(field, true, field.requirement.allows_empty());
            return Vec::new();
        }
        self.report(field, true, true);

        let (kept, diagnostics) = decode_items::<T>(items);
        self.merge(diagnostics);
        kept
    }

    /// Decode another entity stored at this same level (e.g. patient attributes).
    pub fn embedded<T: Entity>(&mut self) -> T {
        let Decoded { value, diagnostics } = decode::<T>(self.obj);
        self.merge(diagnostics);
        value
    }
}

impl TagWriter {
    /// Write a list of `T` as a sequence field.
    pub fn sequence<T: Entity>(&mut self, field: &Field, items: &[T]) {
        if items.is_empty() {
            match field.requirement {
                Requirement::Optional | Requirement::Retired => {
                    self.obj.remove_element(field.tag);
                    self.report(field, false, false);
                }
                requirement if is_type_two(requirement) => {
                    self.obj.put(DataElement::new(
                        field.tag,
                        VR::SQ,
                        DataSetSequence::from(Vec::<InMemDicomObject>::new()),
                    ));
                    self.report(field, true, true);
                }
                _ => {
                    self.obj.remove_element(field.tag);
                    self.report(field, true, false);
                }
            }
            return;
        }

        let mut encoded = Vec::with_capacity(items.len());
        for item in items {
            let Encoded {
                object,
                diagnostics,
            } = encode(item);
            self.merge(diagnostics);
            encoded.push(object);
        }
        self.obj.put(DataElement::new(
            field.tag,
            VR::SQ,
            DataSetSequence::from(encoded),
        ));
        self.report(field, true, true);
    }

    /// Encode another entity into this same level.
    pub fn embedded<T: Entity>(&mut self, value: &T) {
        let entity = self.entity;
        self.entity = T::NAME;
        value.encode(self);
        self.entity = entity;
    }
}
