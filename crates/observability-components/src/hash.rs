//! Content hash of rendered configuration.
//!
//! Workloads pick up configuration from ConfigMaps and Secrets, which
//! Kubernetes doesn't roll out on change. The hash of those objects is
//! stamped onto every workload's pod template so that a config change
//! changes the pod template too.

use serde_json::Value;
use sha2::{Digest, Sha256};
use snafu::{ResultExt, Snafu};

use crate::object::RenderedObject;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to serialize {kind}/{name} for hashing"))]
    SerializeObject {
        source: serde_json::Error,
        kind: String,
        name: String,
    },
}

/// Fields of config objects which carry their content.
const CONTENT_FIELDS: &[&str] = &["data", "binaryData", "stringData"];

/// Returns the SHA-256 digest (lower case hex) of `input`.
pub fn sha256_hex(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    format!("{:x}", hasher.finalize())
}

/// Writes `value` as compact JSON with all object keys sorted.
///
/// Two values which only differ in key order produce the same output.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries = map.iter().collect::<Vec<_>>();
            entries.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));

            out.push('{');
            for (index, (key, value)) in entries.into_iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(value, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Hashes the content of every ConfigMap and Secret in `objects`.
///
/// Only the identity (kind, namespace, name) and the data fields contribute,
/// labels and annotations do not. The order of `objects` doesn't matter.
/// Returns [`None`] if there are no config objects at all.
pub fn content_hash<'a>(
    objects: impl IntoIterator<Item = &'a RenderedObject>,
) -> Result<Option<String>> {
    let mut entries = objects
        .into_iter()
        .filter(|object| object.is_config())
        .map(|object| {
            let value = serde_json::to_value(object).context(SerializeObjectSnafu {
                kind: object.kind(),
                name: object.name(),
            })?;

            let mut entry = serde_json::Map::new();
            entry.insert("kind".to_owned(), object.kind().into());
            entry.insert("namespace".to_owned(), object.namespace().into());
            entry.insert("name".to_owned(), object.name().into());
            for field in CONTENT_FIELDS {
                if let Some(content) = value.get(*field) {
                    entry.insert((*field).to_owned(), content.clone());
                }
            }

            Ok(canonical_json(&Value::Object(entry)))
        })
        .collect::<Result<Vec<_>>>()?;

    if entries.is_empty() {
        return Ok(None);
    }

    entries.sort_unstable();
    Ok(Some(sha256_hex(entries.join("\n").as_bytes())))
}
