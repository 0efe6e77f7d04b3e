//! Table-driven mapping of reply fields onto typed records.
//!
//! Each record type declares a static [`FieldMap`]: reply field name to a
//! [`Slot`] that knows where the value lands. Parsing never fails on a
//! single field; unknown names are ignored and unsupported slots are
//! logged and skipped.

use log::{debug, warn};
use snatcher_core::{Reply, ReplyField, SnatchError};

/// Accessor for a nullable text attribute of `T`.
pub type TextSetter<T> = fn(&mut T) -> &mut Option<String>;

pub enum Slot<T> {
    Text(TextSetter<T>),
    /// A mapped name whose attribute is not text. Values are reported and
    /// dropped, never coerced.
    Unsupported(&'static str),
}

pub type FieldMap<T> = [(&'static str, Slot<T>)];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    pub assigned: usize,
    pub ignored: usize,
    pub skipped: Vec<String>,
}

/// Normalizes a raw field value: unwraps `[Link](url)`, and maps blank or
/// `undefined` to `None`.
pub fn clean_value(raw: &str) -> Option<String> {
    let mut value = raw.trim();
    if value.starts_with('[') && value.ends_with(')') {
        if let Some(start) = value.find("](") {
            value = value[start + 2..value.len() - 1].trim();
        }
    }
    if value.is_empty() || value.eq_ignore_ascii_case("undefined") {
        None
    } else {
        Some(value.to_string())
    }
}

pub fn parse<T>(target: &mut T, fields: &[ReplyField], map: &FieldMap<T>) -> ParseReport {
    let mut report = ParseReport::default();

    for field in fields {
        let name = field.name.trim();
        let Some((_, slot)) = map.iter().find(|(key, _)| *key == name) else {
            report.ignored += 1;
            continue;
        };

        match slot {
            Slot::Text(setter) => {
                *setter(target) = clean_value(&field.value);
                report.assigned += 1;
            }
            Slot::Unsupported(kind) => {
                warn!(
                    "Field '{}' maps to a {} attribute; value {:?} not assigned",
                    name, kind, field.value
                );
                report.skipped.push(name.to_string());
            }
        }
    }

    debug!(
        "Parsed {} field(s), ignored {}, skipped {}",
        report.assigned,
        report.ignored,
        report.skipped.len()
    );
    report
}

/// Parses unit `index` of `reply` into `target`.
pub fn parse_unit<T>(
    target: &mut T,
    reply: &Reply,
    index: usize,
    map: &FieldMap<T>,
) -> Result<ParseReport, SnatchError> {
    let unit = reply.unit(index).ok_or_else(|| {
        SnatchError::Unparseable(format!(
            "reply has {} unit(s), unit {} is missing",
            reply.len(),
            index
        ))
    })?;
    Ok(parse(target, &unit.fields, map))
}
