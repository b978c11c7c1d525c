//! Canonical names shared by every component.
//!
//! The registry is plain data handed to each component at construction time.
//! Templates see it as `names`, e.g. `{{ names.pixieVizierPem }}`.

use serde::{Deserialize, Serialize};

/// Canonical object names, the operator namespace and the label key prefix.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NamingRegistry {
    /// Value of the `app.kubernetes.io/name` label on every object.
    pub app_name: String,

    /// Namespace namespaced objects are placed in unless a template says
    /// otherwise.
    pub namespace: String,

    /// Name of the operator's own Deployment, also used for
    /// `app.kubernetes.io/managed-by` and owner references.
    pub operator_name: String,

    pub proxy_name: String,
    pub logging_name: String,
    pub cluster_collector_name: String,
    pub node_collector_name: String,
    pub pixie_vizier_pem: String,
    pub pixie_kelvin: String,

    /// Prefix of the operator's own label and annotation keys.
    pub key_prefix: String,

    /// Longest tag key the Wavefront backend accepts.
    pub max_tag_length: usize,
}

impl Default for NamingRegistry {
    fn default() -> Self {
        Self {
            app_name: "wavefront".to_owned(),
            namespace: "observability-system".to_owned(),
            operator_name: "wavefront-controller-manager".to_owned(),
            proxy_name: "wavefront-proxy".to_owned(),
            logging_name: "wavefront-logging".to_owned(),
            cluster_collector_name: "wavefront-cluster-collector".to_owned(),
            node_collector_name: "wavefront-node-collector".to_owned(),
            pixie_vizier_pem: "vizier-pem".to_owned(),
            pixie_kelvin: "kelvin".to_owned(),
            key_prefix: "wavefront.com".to_owned(),
            max_tag_length: 255,
        }
    }
}

impl NamingRegistry {
    /// Same defaults, placed in another namespace.
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// The in-cluster address of the proxy, `<proxy>:<port>`.
    pub fn proxy_address(&self, port: u16) -> String {
        format!("{proxy}:{port}", proxy = self.proxy_name)
    }

    /// Annotation key carrying the content hash of the rendered config.
    pub fn config_hash_key(&self) -> String {
        format!("{prefix}/config-hash", prefix = self.key_prefix)
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn partial_override_keeps_defaults() {
        let registry: NamingRegistry = serde_yaml::from_str(indoc! {"
            namespace: custom-namespace
            keyPrefix: example.com
        "})
        .unwrap();

        assert_eq!(registry.namespace, "custom-namespace");
        assert_eq!(registry.key_prefix, "example.com");
        assert_eq!(registry.pixie_vizier_pem, "vizier-pem");
        assert_eq!(registry.config_hash_key(), "example.com/config-hash");
        assert_eq!(
            registry,
            NamingRegistry {
                namespace: "custom-namespace".into(),
                key_prefix: "example.com".into(),
                ..NamingRegistry::default()
            }
        );
    }

    #[test]
    fn proxy_address() {
        assert_eq!(
            NamingRegistry::default().proxy_address(2878),
            "wavefront-proxy:2878"
        );
    }
}
