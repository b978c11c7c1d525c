//! Configuration value types shared by several components.
//!
//! The structs mirror the custom resource spec they are populated from, hence
//! the camelCase field names. Every field defaults to its empty value so a
//! disabled component can be described by `{ enable: false }` alone.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::quantity::Quantity;

/// Compute resources of a single container, in Kubernetes quantity syntax.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Resources {
    pub requests: Resource,
    pub limits: Resource,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Resource {
    pub cpu: String,
    pub memory: String,
    #[serde(rename = "ephemeral-storage")]
    pub ephemeral_storage: String,
}

impl Resources {
    /// Convenience constructor used mostly by tests and defaults.
    pub fn with_limits(cpu: impl Into<String>, memory: impl Into<String>) -> Self {
        Self {
            limits: Resource {
                cpu: cpu.into(),
                memory: memory.into(),
                ..Resource::default()
            },
            ..Self::default()
        }
    }

    /// Fills the unset cpu and memory requests with `cpu` and `memory`.
    ///
    /// A default never exceeds the limit set next to it: with a `100m` cpu
    /// limit a `400m` default request becomes `100m`. Unparsable values are
    /// left alone for validation to report.
    pub fn default_requests(&mut self, cpu: &str, memory: &str) {
        default_request(&mut self.requests.cpu, cpu, &self.limits.cpu);
        default_request(&mut self.requests.memory, memory, &self.limits.memory);
    }
}

fn default_request(request: &mut String, default: &str, limit: &str) {
    if !request.trim().is_empty() {
        return;
    }

    let value = match (Quantity::from_str(default), Quantity::from_str(limit)) {
        (Ok(default_quantity), Ok(limit_quantity)) if limit_quantity < default_quantity => limit,
        _ => default,
    };
    value.clone_into(request);
}

impl Resource {
    /// Returns `(name, value)` pairs in the order problems are reported.
    pub(crate) fn named_values(&self) -> [(&'static str, &str); 3] {
        [
            ("memory", &self.memory),
            ("cpu", &self.cpu),
            ("ephemeral-storage", &self.ephemeral_storage),
        ]
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use rstest::rstest;

    use super::*;

    #[test]
    fn deserialize_partial_resources() {
        let input = indoc! {"
            requests:
              memory: 500Mi
            limits:
              cpu: 100m
              ephemeral-storage: 1Gi
        "};

        let resources: Resources = serde_yaml::from_str(input).unwrap();

        assert_eq!(resources.requests.memory, "500Mi");
        assert_eq!(resources.requests.cpu, "");
        assert_eq!(resources.limits.cpu, "100m");
        assert_eq!(resources.limits.ephemeral_storage, "1Gi");
    }

    #[rstest]
    #[case::unset_limits("", "", "400m", "600Mi")]
    #[case::limits_above_defaults("1", "2Gi", "400m", "600Mi")]
    #[case::limits_below_defaults("100m", "512Mi", "100m", "512Mi")]
    #[case::unparsable_limits("lots", "1Gi", "400m", "600Mi")]
    fn default_requests_are_capped_at_limits(
        #[case] cpu_limit: &str,
        #[case] memory_limit: &str,
        #[case] cpu_request: &str,
        #[case] memory_request: &str,
    ) {
        let mut resources = Resources::with_limits(cpu_limit, memory_limit);
        resources.default_requests("400m", "600Mi");

        assert_eq!(resources.requests.cpu, cpu_request);
        assert_eq!(resources.requests.memory, memory_request);
        assert_eq!(resources.requests.ephemeral_storage, "");
    }

    #[test]
    fn explicit_requests_are_kept() {
        let mut resources = Resources::with_limits("100m", "512Mi");
        resources.requests.cpu = "2".into();
        resources.default_requests("400m", "600Mi");

        assert_eq!(resources.requests.cpu, "2");
        assert_eq!(resources.requests.memory, "512Mi");
    }
}
