//! Content addressing for structured state.
//!
//! [`hash`] produces a SHA-256 hex digest of a canonical JSON encoding, and
//! [`diff`] reports which top-level sections changed between two snapshots.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::app::Result;

/// Hash any serializable value.
///
/// The value is converted to a `serde_json::Value` and object keys are
/// re-inserted in sorted order, so map iteration order never affects the
/// digest. Values without a JSON representation fail with
/// [`TributaryError::Serialization`](crate::app::TributaryError::Serialization).
pub fn hash<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let canonical = canonicalize(serde_json::to_value(value)?);
    let bytes = serde_json::to_vec(&canonical)?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, canonicalize(v)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Read access to a keyed state snapshot.
pub trait StateView<V> {
    fn lookup(&self, key: &str) -> Option<&V>;
    fn entries<'a>(&'a self) -> impl Iterator<Item = (&'a String, &'a V)> where V: 'a;
}

impl<V> StateView<V> for HashMap<String, V> {
    fn lookup(&self, key: &str) -> Option<&V> {
        self.get(key)
    }

    fn entries<'a>(&'a self) -> impl Iterator<Item = (&'a String, &'a V)> where V: 'a {
        self.iter()
    }
}

impl<V> StateView<V> for BTreeMap<String, V> {
    fn lookup(&self, key: &str) -> Option<&V> {
        self.get(key)
    }

    fn entries<'a>(&'a self) -> impl Iterator<Item = (&'a String, &'a V)> where V: 'a {
        self.iter()
    }
}

/// Keys of `new_state` that are absent from `old_state` or whose value hashes
/// differently. Keys only present in `old_state` are not reported.
///
/// The result is sorted.
pub fn diff<V, M>(old_state: &M, new_state: &M) -> Result<Vec<String>>
where
    V: Serialize,
    M: StateView<V>,
{
    let mut changed = Vec::new();

    for (key, new_value) in new_state.entries() {
        let Some(old_value) = old_state.lookup(key) else {
            changed.push(key.clone());
            continue;
        };

        if hash(old_value)? != hash(new_value)? {
            changed.push(key.clone());
        }
    }

    changed.sort();
    Ok(changed)
}
