// Scan Layer (spec.md §4.5 "Column-typed decoding"): turns a raw driver row
// into a map of GraphQL-field-name -> `Value`, applying per-`ColumnKind`
// coercions. Extras (batch parent-key columns, vector distance columns) skip
// enum/set mapping since they never carry those kinds.

use crate::driver::{RawCell, RawRow};
use crate::error::{CoreError, Result};
use crate::model::{Column, ColumnKind};
use std::collections::HashMap;

/// Describes one position in a planned SELECT list.
#[derive(Debug, Clone)]
pub struct ScanColumn {
    /// Output key: the GraphQL field alias, or a synthetic alias for extras
    /// (e.g. `__batch_parent_0`, `__distance`).
    pub alias: String,
    pub kind: ColumnKind,
    /// Extras (batch parent-key echoes, vector distances) bypass enum/set
    /// label mapping even if `kind` happens to coincide with one.
    pub is_extra: bool,
}

impl ScanColumn {
    pub fn from_column(alias: impl Into<String>, column: &Column) -> Self {
        Self {
            alias: alias.into(),
            kind: column.kind.clone(),
            is_extra: false,
        }
    }

    pub fn extra(alias: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            alias: alias.into(),
            kind,
            is_extra: true,
        }
    }
}

pub type ScannedRow = HashMap<String, crate::value::Value>;

/// Decode one raw row against its planned column list, producing a map of
/// field alias -> `Value`. `columns.len()` must equal `raw.len()`; a
/// mismatch is an invariant violation (planner/scan desync), not bad input.
pub fn scan_row(columns: &[ScanColumn], raw: &RawRow) -> Result<ScannedRow> {
    if columns.len() != raw.len() {
        return Err(CoreError::InvariantViolation(format!(
            "scan column count {} does not match raw row width {}",
            columns.len(),
            raw.len()
        )));
    }
    let mut out = HashMap::with_capacity(columns.len());
    for (col, cell) in columns.iter().zip(raw.iter()) {
        out.insert(col.alias.clone(), scan_cell(col, cell)?);
    }
    Ok(out)
}

fn scan_cell(col: &ScanColumn, cell: &RawCell) -> Result<crate::value::Value> {
    use crate::value::Value;

    if matches!(cell, RawCell::Null) {
        return Ok(Value::Null);
    }

    if col.is_extra {
        return Ok(coerce_plain(cell));
    }

    match &col.kind {
        ColumnKind::Enum { members } => match cell {
            RawCell::Int(i) => enum_label(members, *i, &col.alias),
            RawCell::UInt(u) => enum_label(members, *u as i64, &col.alias),
            RawCell::Str(s) => Ok(Value::Str(s.clone())),
            RawCell::Bytes(b) => Ok(Value::Str(String::from_utf8_lossy(b).into_owned())),
            other => Err(CoreError::InvariantViolation(format!(
                "column {}: unexpected raw cell {:?} for enum",
                col.alias, other
            ))),
        },
        ColumnKind::Set { .. } => {
            let text = cell_as_text(cell, &col.alias)?;
            let labels = text
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            Ok(Value::Labels(labels))
        }
        ColumnKind::Boolean => match cell {
            RawCell::Bool(b) => Ok(Value::Bool(*b)),
            RawCell::Int(i) => Ok(Value::Bool(*i != 0)),
            RawCell::UInt(u) => Ok(Value::Bool(*u != 0)),
            RawCell::Str(s) => Ok(Value::Bool(matches!(s.as_str(), "1" | "true" | "TRUE" | "True"))),
            RawCell::Bytes(b) => Ok(Value::Bool(matches!(b.as_slice(), [1] | [b'1']))),
            RawCell::Float(f) => Ok(Value::Bool(*f != 0.0)),
            RawCell::Null => unreachable!("handled above"),
        },
        ColumnKind::Int => Ok(Value::Int(cell_as_i64(cell, &col.alias)?)),
        ColumnKind::Float => Ok(Value::Float(cell_as_f64(cell, &col.alias)?)),
        ColumnKind::BigInt | ColumnKind::Decimal => Ok(Value::DecimalStr(cell_as_text(cell, &col.alias)?)),
        ColumnKind::Json => Ok(Value::Json(cell_as_text(cell, &col.alias)?)),
        ColumnKind::Vector { .. } => Ok(Value::Vector(cell_as_text(cell, &col.alias)?)),
        ColumnKind::Bytes => match cell {
            RawCell::Bytes(b) => Ok(Value::Bytes(b.clone())),
            RawCell::Str(s) => Ok(Value::Bytes(s.clone().into_bytes())),
            other => Err(CoreError::InvariantViolation(format!(
                "column {}: unexpected raw cell {:?} for bytes",
                col.alias, other
            ))),
        },
        // UUID canonicalization happens at field-resolve time, not here
        // (spec.md §4.5): the scan layer passes the driver's text through.
        ColumnKind::Uuid | ColumnKind::String | ColumnKind::Date | ColumnKind::DateTime | ColumnKind::Time | ColumnKind::Year => {
            Ok(Value::Str(cell_as_text(cell, &col.alias)?))
        }
    }
}

fn enum_label(members: &[String], ordinal: i64, alias: &str) -> Result<crate::value::Value> {
    let idx = usize::try_from(ordinal - 1)
        .map_err(|_| CoreError::InvariantViolation(format!("column {alias}: enum ordinal {ordinal} out of range")))?;
    members
        .get(idx)
        .cloned()
        .map(crate::value::Value::Str)
        .ok_or_else(|| CoreError::InvariantViolation(format!("column {alias}: enum ordinal {ordinal} out of range")))
}

fn cell_as_text(cell: &RawCell, alias: &str) -> Result<String> {
    match cell {
        RawCell::Str(s) => Ok(s.clone()),
        RawCell::Bytes(b) => Ok(String::from_utf8_lossy(b).into_owned()),
        RawCell::Int(i) => Ok(i.to_string()),
        RawCell::UInt(u) => Ok(u.to_string()),
        RawCell::Float(f) => Ok(f.to_string()),
        RawCell::Bool(b) => Ok(b.to_string()),
        RawCell::Null => Err(CoreError::InvariantViolation(format!("column {alias}: unexpected null"))),
    }
}

fn cell_as_i64(cell: &RawCell, alias: &str) -> Result<i64> {
    match cell {
        RawCell::Int(i) => Ok(*i),
        RawCell::UInt(u) => i64::try_from(*u).map_err(|_| CoreError::ExecutorFailure(format!("column {alias}: integer overflow"))),
        RawCell::Str(s) => s
            .parse()
            .map_err(|_| CoreError::InvariantViolation(format!("column {alias}: non-numeric text for int column"))),
        other => Err(CoreError::InvariantViolation(format!("column {alias}: unexpected raw cell {:?} for int", other))),
    }
}

fn cell_as_f64(cell: &RawCell, alias: &str) -> Result<f64> {
    match cell {
        RawCell::Float(f) => Ok(*f),
        RawCell::Int(i) => Ok(*i as f64),
        RawCell::UInt(u) => Ok(*u as f64),
        RawCell::Str(s) => s
            .parse()
            .map_err(|_| CoreError::InvariantViolation(format!("column {alias}: non-numeric text for float column"))),
        other => Err(CoreError::InvariantViolation(format!("column {alias}: unexpected raw cell {:?} for float", other))),
    }
}

fn coerce_plain(cell: &RawCell) -> crate::value::Value {
    use crate::value::Value;
    match cell {
        RawCell::Null => Value::Null,
        RawCell::Bool(b) => Value::Bool(*b),
        RawCell::Int(i) => Value::Int(*i),
        RawCell::UInt(u) => Value::UInt(*u),
        RawCell::Float(f) => Value::Float(*f),
        RawCell::Bytes(b) => Value::Bytes(b.clone()),
        RawCell::Str(s) => Value::Str(s.clone()),
    }
}
