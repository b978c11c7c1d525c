//! Validated Kubernetes labels and the label sets stamped onto every object
//! a component renders.
//!
//! See <https://kubernetes.io/docs/concepts/overview/working-with-objects/labels/>
//! for the rules keys and values have to follow.

use std::{fmt::Display, ops::Deref, str::FromStr, sync::LazyLock};

use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use regex::Regex;
use snafu::{ResultExt, Snafu, ensure};

use crate::kvp::{Key, KeyError, KeyValuePairs, KeyValuePairsExt};

const LABEL_VALUE_MAX_LEN: usize = 63;

static LABEL_VALUE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9A-Z]([a-z0-9A-Z-_.]*[a-z0-9A-Z]+)?$")
        .expect("failed to compile label value regex")
});

/// The error type for label value parsing.
#[derive(Debug, PartialEq, Snafu)]
pub enum LabelValueError {
    #[snafu(display(
        "value exceeds the maximum length - expected 63 characters or less, got {length}"
    ))]
    ValueTooLong { length: usize },

    #[snafu(display("value contains non-ascii characters"))]
    ValueNotAscii,

    #[snafu(display("value violates kubernetes format"))]
    ValueInvalid,
}

/// The error type for constructing a [`Label`] from raw input.
#[derive(Debug, PartialEq, Snafu)]
pub enum LabelError {
    #[snafu(display("failed to parse label key {key:?}"))]
    InvalidKey { source: KeyError, key: String },

    #[snafu(display("failed to parse label value {value:?} for key {key:?}"))]
    InvalidValue {
        source: LabelValueError,
        key: String,
        value: String,
    },
}

/// A validated label value. Unlike keys, values may be empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct LabelValue(String);

impl FromStr for LabelValue {
    type Err = LabelValueError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        ensure!(
            input.len() <= LABEL_VALUE_MAX_LEN,
            ValueTooLongSnafu {
                length: input.len()
            }
        );
        ensure!(input.is_ascii(), ValueNotAsciiSnafu);
        ensure!(
            input.is_empty() || LABEL_VALUE_REGEX.is_match(input),
            ValueInvalidSnafu
        );

        Ok(Self(input.to_owned()))
    }
}

impl Deref for LabelValue {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for LabelValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single validated label.
///
/// ```
/// # use observability_components::kvp::Label;
/// let label = Label::try_from(("app.kubernetes.io/component", "pixie")).unwrap();
/// assert_eq!(label.to_string(), "app.kubernetes.io/component=pixie");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Label {
    pub key: Key,
    pub value: LabelValue,
}

impl TryFrom<(&str, &str)> for Label {
    type Error = LabelError;

    fn try_from((key, value): (&str, &str)) -> Result<Self, Self::Error> {
        let parsed_key = Key::from_str(key).context(InvalidKeySnafu { key })?;
        let parsed_value = LabelValue::from_str(value).context(InvalidValueSnafu { key, value })?;

        Ok(Self {
            key: parsed_key,
            value: parsed_value,
        })
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// A validated set of labels, ordered by key.
pub type Labels = KeyValuePairs<LabelValue>;

impl Extend<Label> for Labels {
    fn extend<T: IntoIterator<Item = Label>>(&mut self, iter: T) {
        self.extend(iter.into_iter().map(|label| (label.key, label.value)));
    }
}

impl FromIterator<Label> for Labels {
    fn from_iter<T: IntoIterator<Item = Label>>(iter: T) -> Self {
        iter.into_iter()
            .map(|label| (label.key, label.value))
            .collect()
    }
}

/// Conversion of a [`Labels`] set into selectors the outer loop can list or
/// delete by.
pub trait LabelsSelectorExt {
    /// Renders the set as an equality-based selector string, e.g.
    /// `app.kubernetes.io/component=pixie,app.kubernetes.io/name=wavefront`.
    fn to_selector_string(&self) -> String;

    /// Converts the set into a [`LabelSelector`] using `matchLabels` only.
    fn to_label_selector(&self) -> LabelSelector;
}

impl LabelsSelectorExt for Labels {
    fn to_selector_string(&self) -> String {
        self.iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn to_label_selector(&self) -> LabelSelector {
        LabelSelector {
            match_labels: Some(self.to_unvalidated()),
            ..LabelSelector::default()
        }
    }
}

/// Well-known label keys shared by every component.
pub mod well_known {
    use const_format::concatcp;

    use super::{Label, LabelError};

    const K8S_APP_KEY_PREFIX: &str = "app.kubernetes.io/";

    /// `app.kubernetes.io/name`, the name of the product, e.g. `wavefront`.
    pub const K8S_APP_NAME_KEY: &str = concatcp!(K8S_APP_KEY_PREFIX, "name");

    /// `app.kubernetes.io/component`, the component owning the object, e.g. `pixie`.
    pub const K8S_APP_COMPONENT_KEY: &str = concatcp!(K8S_APP_KEY_PREFIX, "component");

    /// `app.kubernetes.io/managed-by`, the operator applying the object.
    pub const K8S_APP_MANAGED_BY_KEY: &str = concatcp!(K8S_APP_KEY_PREFIX, "managed-by");

    /// Name of the label (below the registry's prefix) marking the namespace
    /// the operator manages.
    pub const MANAGED_NAMESPACE_KEY_NAME: &str = "managed-namespace";

    pub fn name(app_name: &str) -> Result<Label, LabelError> {
        Label::try_from((K8S_APP_NAME_KEY, app_name))
    }

    pub fn component(component: &str) -> Result<Label, LabelError> {
        Label::try_from((K8S_APP_COMPONENT_KEY, component))
    }

    pub fn managed_by(operator_name: &str) -> Result<Label, LabelError> {
        Label::try_from((K8S_APP_MANAGED_BY_KEY, operator_name))
    }

    /// Creates the `<prefix>/managed-namespace` label.
    pub fn managed_namespace(prefix: &str, namespace: &str) -> Result<Label, LabelError> {
        Label::try_from((
            format!("{prefix}/{MANAGED_NAMESPACE_KEY_NAME}").as_str(),
            namespace,
        ))
    }
}

/// Label sets applied to rendered objects.
pub mod sets {
    use super::{LabelError, Labels, well_known};

    /// Identity of the object owner used to derive the common label set.
    #[derive(Clone, Copy, Debug)]
    pub struct ObjectLabels<'a> {
        /// The product name, such as `wavefront`.
        pub app_name: &'a str,

        /// The operator applying the object, such as `wavefront-controller-manager`.
        pub operator_name: &'a str,

        /// The component which rendered the object, such as `pixie`.
        pub component: &'a str,

        /// Prefix for operator-specific label keys, such as `wavefront.com`.
        pub key_prefix: &'a str,

        /// The namespace the operator manages.
        pub namespace: &'a str,
    }

    /// Returns the label set every rendered object carries:
    ///
    /// - `app.kubernetes.io/name`
    /// - `app.kubernetes.io/component`
    /// - `app.kubernetes.io/managed-by`
    /// - `<prefix>/managed-namespace`
    pub fn common(object_labels: ObjectLabels<'_>) -> Result<Labels, LabelError> {
        let mut labels = component_selector(object_labels.app_name, object_labels.component)?;
        labels.extend([
            well_known::managed_by(object_labels.operator_name)?,
            well_known::managed_namespace(object_labels.key_prefix, object_labels.namespace)?,
        ]);
        Ok(labels)
    }

    /// Returns the minimal label set selecting everything a component owns.
    pub fn component_selector(app_name: &str, component: &str) -> Result<Labels, LabelError> {
        Ok(Labels::from_iter([
            well_known::name(app_name)?,
            well_known::component(component)?,
        ]))
    }
}
