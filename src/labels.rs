//! Ingestion of user-provided labels
//!
//! A label file holds features with a label property. Textual labels are
//! class names and map to their index in the [`ClassSchema`]; numeric
//! labels pass through unchanged. Whichever kind the first labeled row has
//! is the kind for the whole file.

use std::num::NonZeroUsize;
use std::path::Path;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::formats::{self, PointRecord};
use crate::types::LabeledCoordinate;

/// Ordered class names. A name's position is its label value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSchema {
    names: Vec<String>,
}

impl ClassSchema {
    /// Creates a schema, rejecting empty or duplicated names
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();

        if names.is_empty() {
            return Err(Error::config("At least one label class is required"));
        }
        for (index, name) in names.iter().enumerate() {
            if name.is_empty() {
                return Err(Error::config("Label class names must not be empty"));
            }
            if names[..index].contains(name) {
                return Err(Error::config(format!("Duplicate label class \"{}\"", name)));
            }
        }

        Ok(Self { names })
    }

    /// Index of a class name (case-sensitive)
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Class names in index order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// How many labeled coordinates to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeepLimit {
    /// No limit
    #[default]
    All,
    /// Keep only the first N, in file order
    First(NonZeroUsize),
}

impl KeepLimit {
    /// Maps a command-line count to a limit; zero means no limit
    pub fn from_count(count: usize) -> Self {
        NonZeroUsize::new(count).map_or(KeepLimit::All, KeepLimit::First)
    }

    /// Truncates `items` to the limit
    pub fn apply<T>(&self, items: &mut Vec<T>) {
        if let KeepLimit::First(n) = self {
            items.truncate(n.get());
        }
    }
}

/// The kind of value held by a file's label property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    /// Class names, resolved through the schema
    Text,
    /// Numbers, used as-is
    Numeric,
}

impl LabelKind {
    /// Classifies a label value. Null means "no label" and yields None.
    pub fn of(value: &Value) -> Result<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::String(_) => Ok(Some(LabelKind::Text)),
            Value::Number(_) => Ok(Some(LabelKind::Numeric)),
            other => Err(Error::data(format!(
                "Unrecognized label property type: {}",
                value_type_name(other)
            ))),
        }
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Turns point records into labeled coordinates.
///
/// Rows whose class name is not in the schema, or that have no label, are
/// dropped and reported as a count.
pub fn labeled_coordinates(
    records: &[PointRecord],
    label_property: &str,
    classes: &ClassSchema,
    keep: KeepLimit,
) -> Result<Vec<LabeledCoordinate>> {
    if !records.is_empty() && !records.iter().any(|r| r.properties.contains_key(label_property)) {
        return Err(Error::config(format!(
            "Label property \"{}\" not found in labels file",
            label_property
        )));
    }

    let mut kind: Option<LabelKind> = None;
    let mut skipped = 0usize;
    let mut coordinates = Vec::with_capacity(records.len());

    for record in records {
        let value = record.properties.get(label_property).unwrap_or(&Value::Null);
        let Some(value_kind) = LabelKind::of(value)? else {
            skipped += 1;
            continue;
        };

        let kind = *kind.get_or_insert(value_kind);
        if kind != value_kind {
            return Err(Error::data(format!(
                "Label property \"{}\" mixes {:?} and {:?} values",
                label_property, kind, value_kind
            )));
        }

        let label = match value {
            Value::String(name) => match classes.index_of(name) {
                Some(index) => index as f64,
                None => {
                    skipped += 1;
                    continue;
                }
            },
            Value::Number(number) => number.as_f64().ok_or_else(|| {
                Error::data(format!("Label value {} is not representable as a float", number))
            })?,
            _ => unreachable!("label kind already checked"),
        };

        coordinates.push(LabeledCoordinate::new(
            record.position.lon(),
            record.position.lat(),
            label,
        ));
    }

    if skipped > 0 {
        tracing::info!(skipped, "Dropped labeled rows with unknown or missing class");
    }

    keep.apply(&mut coordinates);
    Ok(coordinates)
}

/// Reads labeled coordinates from a vector file
pub fn read_labels_file(
    path: &Path,
    label_property: &str,
    classes: &ClassSchema,
    keep: KeepLimit,
) -> Result<Vec<LabeledCoordinate>> {
    let records = formats::read_points(path)?;
    let coordinates = labeled_coordinates(&records, label_property, classes, keep)?;
    tracing::info!(count = coordinates.len(), "Read labeled coordinates");
    Ok(coordinates)
}
