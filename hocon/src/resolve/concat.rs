//! Joining the parts of a concatenation once they are concrete.

use crate::error::{Error, Result};
use crate::merge::ConfigMerger;
use crate::path::ConfigPath;
use crate::value::{ConfigObject, ConfigValue, ValueType};

/// A concrete part of a concatenation. Absent parts are simply left out.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Piece {
    Value(ConfigValue),
    Whitespace(String),
}

/// Joins resolved pieces into one value.
///
/// Returns `None` if no value remains. Whitespace only survives between
/// scalars; objects merge left to right and arrays are appended in order.
pub(crate) fn join(mut pieces: Vec<Piece>, at: &ConfigPath) -> Result<Option<ConfigValue>> {
    while matches!(pieces.last(), Some(Piece::Whitespace(_))) {
        pieces.pop();
    }
    let leading = pieces
        .iter()
        .take_while(|piece| matches!(piece, Piece::Whitespace(_)))
        .count();
    pieces.drain(..leading);

    let kinds: Vec<ValueType> = pieces
        .iter()
        .filter_map(|piece| match piece {
            Piece::Value(value) => Some(value.value_type()),
            Piece::Whitespace(_) => None,
        })
        .collect();

    let Some(&first) = kinds.first() else {
        return Ok(None);
    };
    if pieces.len() == 1 {
        return Ok(pieces.pop().and_then(|piece| match piece {
            Piece::Value(value) => Some(value),
            Piece::Whitespace(_) => None,
        }));
    }

    let group = |kind: ValueType| match kind {
        ValueType::Object => ValueType::Object,
        ValueType::Array => ValueType::Array,
        _ => ValueType::String,
    };
    if let Some(&conflict) = kinds.iter().find(|kind| group(**kind) != group(first)) {
        return Err(Error::type_mismatch(at, first, conflict));
    }

    let kind = group(first);
    let values = pieces.into_iter().filter_map(|piece| match piece {
        Piece::Value(value) => Some(value),
        Piece::Whitespace(ws) if kind == ValueType::String => Some(ConfigValue::String(ws)),
        Piece::Whitespace(_) => None,
    });

    let joined = match kind {
        ValueType::Object => ConfigValue::Object(values.fold(ConfigObject::new(), |merged, value| {
            match value {
                ConfigValue::Object(object) => ConfigMerger::merge_objects(merged, object),
                _ => merged,
            }
        })),
        ValueType::Array => ConfigValue::Array(
            values
                .flat_map(|value| match value {
                    ConfigValue::Array(items) => items,
                    _ => Vec::new(),
                })
                .collect(),
        ),
        _ => ConfigValue::String(values.filter_map(|value| value.scalar_text()).collect()),
    };
    Ok(Some(joined))
}
