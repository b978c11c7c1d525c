//! Metric collection: a node collector on every node and a single cluster
//! collector for cluster level metrics, both sending to the proxy.

use k8s_openapi::{Resource, api::core::v1::{ConfigMap, ObjectReference}};
use serde::{Deserialize, Serialize};

use super::{Component, Result, TemplatedComponent};
use crate::{
    config::Resources,
    plan::ResourcePlan,
    registry::NamingRegistry,
    template::TemplateSource,
    validation::{ValidationResult, Validator},
};

pub const NAME: &str = "collector";

/// Port the proxy accepts metrics on.
pub const PROXY_METRICS_PORT: u16 = 2878;

/// The single ConfigMap used before node and cluster collector were split.
const LEGACY_CONFIG_MAP: &str = "default-wavefront-collector-config";

/// Requests of both collectors when none are configured.
const DEFAULT_REQUESTS: (&str, &str) = ("200m", "10Mi");

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CollectorConfig {
    pub enable: bool,
    pub controller_manager_uid: String,
    pub cluster_name: String,
    pub cluster_uuid: String,

    /// `<host>:<port>` of the proxy, defaults to the operator's proxy.
    pub proxy_address: String,

    /// Collection interval of all sources, e.g. `60s`.
    pub default_collection_interval: String,

    /// Discovers and scrapes well-known workloads (annotated pods, common
    /// databases) automatically.
    pub enable_discovery: bool,

    pub node_collector_resources: Resources,
    pub cluster_collector_resources: Resources,
}

#[derive(Debug)]
pub struct CollectorComponent {
    inner: TemplatedComponent<CollectorConfig>,
}

impl CollectorComponent {
    pub fn new(
        source: &impl TemplateSource,
        registry: NamingRegistry,
        mut config: CollectorConfig,
    ) -> Result<Self> {
        if config.proxy_address.is_empty() {
            config.proxy_address = registry.proxy_address(PROXY_METRICS_PORT);
        }
        let (cpu, memory) = DEFAULT_REQUESTS;
        config.node_collector_resources.default_requests(cpu, memory);
        config.cluster_collector_resources.default_requests(cpu, memory);

        Ok(Self {
            inner: TemplatedComponent::load(source, NAME, registry, config)?,
        })
    }

    pub fn config(&self) -> &CollectorConfig {
        self.inner.config()
    }

    fn retired(&self) -> [ObjectReference; 1] {
        [ObjectReference {
            api_version: Some(ConfigMap::API_VERSION.to_owned()),
            kind: Some(ConfigMap::KIND.to_owned()),
            name: Some(LEGACY_CONFIG_MAP.to_owned()),
            namespace: Some(self.inner.registry().namespace.clone()),
            ..ObjectReference::default()
        }]
    }
}

impl Component for CollectorComponent {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn is_enabled(&self) -> bool {
        self.config().enable
    }

    fn validate(&self) -> ValidationResult {
        let config = self.config();
        if !config.enable {
            return ValidationResult::valid(NAME);
        }

        let registry = self.inner.registry();
        let mut validator = Validator::new(NAME);
        validator
            .require(
                &config.controller_manager_uid,
                "missing controller manager uid",
            )
            .require(&config.cluster_name, "missing cluster name")
            .require(&config.cluster_uuid, "missing cluster uuid")
            .require_limits(
                &config.node_collector_resources,
                &registry.node_collector_name,
            )
            .quantities(
                &config.node_collector_resources,
                &registry.node_collector_name,
            )
            .require_limits(
                &config.cluster_collector_resources,
                &registry.cluster_collector_name,
            )
            .quantities(
                &config.cluster_collector_resources,
                &registry.cluster_collector_name,
            );

        validator.finish()
    }

    fn resources(&self) -> Result<ResourcePlan> {
        let config = self.config();
        self.inner.plan(
            config.enable,
            &config.controller_manager_uid,
            self.retired(),
        )
    }
}
