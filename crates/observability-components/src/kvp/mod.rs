//! Validated Kubernetes key/value pairs, used for the labels and annotations
//! the resource planner stamps onto rendered objects.
use std::{collections::BTreeMap, fmt::Display};

mod key;
pub mod label;

pub use key::*;
pub use label::{
    Label, LabelError, LabelValue, LabelValueError, Labels, LabelsSelectorExt, sets, well_known,
};

/// A validated set of key/value pairs, ordered by key.
pub type KeyValuePairs<V> = BTreeMap<Key, V>;

/// Helpers for [`KeyValuePairs`].
pub trait KeyValuePairsExt {
    /// Clones `self` into plain strings, ready for use in `ObjectMeta::labels`.
    fn to_unvalidated(&self) -> BTreeMap<String, String>;

    /// Returns whether the set contains `key`. Unparsable keys are never contained.
    fn contains_str_key(&self, key: &str) -> bool;
}

impl<V: Display> KeyValuePairsExt for KeyValuePairs<V> {
    fn to_unvalidated(&self) -> BTreeMap<String, String> {
        self.iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    fn contains_str_key(&self, key: &str) -> bool {
        let Ok(key) = key.parse::<Key>() else {
            return false;
        };
        self.contains_key(&key)
    }
}
