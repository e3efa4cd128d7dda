//! Layer merging and precedence handling.
//!
//! This module combines raw configuration trees. Objects merge key by key and
//! recursively; any other pair of values is settled in favour of the
//! overriding side. When an unresolved value overrides something, the value
//! it replaced is kept as that path's history so that a self-reference such as
//! `a = ${a} [3]` can still see the inherited value during resolution.

use crate::value::{ConfigObject, ConfigValue};

/// Merges configuration layers according to precedence rules.
///
/// # Examples
///
/// ```
/// use hocon::{ConfigMerger, ConfigObject, ConfigValue};
///
/// let low: ConfigObject = vec![("project", ConfigValue::from("low"))].into_iter().collect();
/// let high: ConfigObject = vec![("project", ConfigValue::from("high"))].into_iter().collect();
///
/// let mut result = low;
/// ConfigMerger::merge_into(&mut result, high);
/// assert_eq!(result.get("project"), Some(&ConfigValue::from("high")));
/// ```
pub struct ConfigMerger;

impl ConfigMerger {
    /// Merge layers into one tree.
    ///
    /// Layers are given from highest to lowest priority: the first layer
    /// overrides the second, which overrides the third, and so on. With
    /// priority `L1 > L2 > L3` this computes `merge(merge(L3, L2), L1)`.
    #[must_use]
    pub fn merge_layers(layers: Vec<ConfigObject>) -> ConfigObject {
        layers
            .into_iter()
            .rev()
            .fold(ConfigObject::new(), Self::merge_objects)
    }

    /// Merge `source` into `target`, `source` winning on conflicts.
    pub fn merge_into(target: &mut ConfigObject, source: ConfigObject) {
        let base = std::mem::take(target);
        *target = Self::merge_objects(base, source);
    }

    /// Merge two objects, `overriding` winning on conflicts.
    ///
    /// # Merging Rules
    ///
    /// - Keys only in `base` are kept in their original position
    /// - Keys only in `overriding` are appended in their order
    /// - Keys in both are merged with [`ConfigMerger::merge`]
    /// - Pending include directives of both sides are kept, `base` first
    #[must_use]
    pub fn merge_objects(base: ConfigObject, overriding: ConfigObject) -> ConfigObject {
        let mut result = base;
        let mut overriding = overriding;
        let includes = overriding.take_includes();

        for (key, value) in overriding {
            match result.get_mut(&key) {
                Some(slot) => {
                    let existing = std::mem::take(slot);
                    *slot = Self::merge(existing, value);
                }
                None => {
                    result.insert(key, value);
                }
            }
        }

        result.extend_includes(includes);
        result
    }

    /// Merge two values, `overriding` winning.
    ///
    /// Two objects merge recursively. An unresolved `overriding` value records
    /// `base` as its history. Any other combination yields `overriding`.
    #[must_use]
    pub fn merge(base: ConfigValue, overriding: ConfigValue) -> ConfigValue {
        match (base, overriding) {
            (ConfigValue::Object(base), ConfigValue::Object(overriding)) => {
                ConfigValue::Object(Self::merge_objects(base, overriding))
            }
            (base, ConfigValue::Unresolved(mut concat)) => {
                concat.push_oldest(base);
                ConfigValue::Unresolved(concat)
            }
            (_, overriding) => overriding,
        }
    }
}
