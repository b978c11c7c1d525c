//! Utility functions for processing data in the YAML file format
use std::io::Write;

use serde::Serialize;
use snafu::{ResultExt, Snafu};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to serialize YAML"))]
    SerializeYaml { source: serde_yaml::Error },

    #[snafu(display("failed to write YAML document separator"))]
    WriteDocumentSeparator { source: std::io::Error },
}

/// Serializes the given data structure as an explicit YAML document.
///
/// # Errors
///
/// Serialization can fail if `T`'s implementation of `Serialize` decides to return an error.
pub fn serialize_to_explicit_document<T, W>(value: &T, mut writer: W) -> Result<()>
where
    T: ?Sized + Serialize,
    W: Write,
{
    writer
        .write_all(b"---\n")
        .context(WriteDocumentSeparatorSnafu)?;
    serde_yaml::to_writer(writer, value).context(SerializeYamlSnafu)
}

/// Like [`serialize_to_explicit_document`], but returns a [`String`].
pub fn to_explicit_document_string<T>(value: &T) -> Result<String>
where
    T: ?Sized + Serialize,
{
    let bare_document = serde_yaml::to_string(value).context(SerializeYamlSnafu)?;
    Ok(format!("---\n{bare_document}"))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;
    use crate::object::RenderedObject;

    #[test]
    fn value_can_be_serialized_to_an_explicit_document_string() {
        let value: BTreeMap<_, _> = [("key", "value")].into();

        let actual_yaml = to_explicit_document_string(&value).expect("serializable value");

        let expected_yaml = "\
            ---\n\
            key: value\n";

        assert_eq!(expected_yaml, actual_yaml);
    }

    #[test]
    fn rendered_objects_serialize_without_variant_tags() {
        let object = RenderedObject::from_value(json!({
            "apiVersion": "v1",
            "kind": "ServiceAccount",
            "metadata": { "name": "pl-vizier" },
        }))
        .unwrap();

        let mut buffer = Vec::new();
        serialize_to_explicit_document(&object, &mut buffer).unwrap();

        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "---\napiVersion: v1\nkind: ServiceAccount\nmetadata:\n  name: pl-vizier\n"
        );
    }
}
