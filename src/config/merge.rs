//! Configuration merge logic
//!
//! Merge semantics:
//! - Tables: deep-merge by key
//! - Lists: REPLACE (last wins)
//! - Scalars: override (last wins)

use super::value::{ConfigTree, ConfigValue};

/// Merge `update` into `base` in place.
///
/// A key present in both as tables is merged recursively; in every other
/// case the update value replaces the base value outright, including a
/// table replaced by a scalar and vice versa. Keys only in `update` are kept.
pub fn deep_merge(base: &mut ConfigTree, update: ConfigTree) {
    for (key, update_value) in update {
        if let ConfigValue::Table(update_table) = update_value {
            match base.get_mut(&key) {
                Some(ConfigValue::Table(base_table)) => deep_merge(base_table, update_table),
                _ => {
                    base.insert(key, ConfigValue::Table(update_table));
                }
            }
        } else {
            // Lists land here too: no element-wise merge
            base.insert(key, update_value);
        }
    }
}
