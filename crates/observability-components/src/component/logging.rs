//! Log shipping: a fluentd DaemonSet tailing container logs on every node and
//! forwarding them to the Wavefront proxy.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Component, Result, TemplatedComponent};
use crate::{
    config::Resources,
    plan::ResourcePlan,
    registry::NamingRegistry,
    template::TemplateSource,
    validation::{ValidationResult, Validator},
};

pub const NAME: &str = "logging";

/// Port the proxy accepts logs on.
pub const PROXY_LOGS_PORT: u16 = 2878;

/// Requests of the fluentd container when none are configured.
const DEFAULT_REQUESTS: (&str, &str) = ("100m", "200Mi");

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggingConfig {
    pub enable: bool,
    pub controller_manager_uid: String,
    pub cluster_name: String,

    /// `<host>:<port>` of the proxy. Defaults to the proxy the operator
    /// deploys itself.
    pub proxy_address: String,

    /// Added to every log line.
    pub tags: BTreeMap<String, String>,

    pub resources: Resources,
}

#[derive(Debug)]
pub struct LoggingComponent {
    inner: TemplatedComponent<LoggingConfig>,
}

impl LoggingComponent {
    pub fn new(
        source: &impl TemplateSource,
        registry: NamingRegistry,
        mut config: LoggingConfig,
    ) -> Result<Self> {
        if config.proxy_address.is_empty() {
            config.proxy_address = registry.proxy_address(PROXY_LOGS_PORT);
        }
        let (cpu, memory) = DEFAULT_REQUESTS;
        config.resources.default_requests(cpu, memory);

        Ok(Self {
            inner: TemplatedComponent::load(source, NAME, registry, config)?,
        })
    }

    pub fn config(&self) -> &LoggingConfig {
        self.inner.config()
    }
}

impl Component for LoggingComponent {
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
        let max_tag_length = registry.max_tag_length;
        let mut validator = Validator::new(NAME);
        validator
            .require(
                &config.controller_manager_uid,
                "missing controller manager uid",
            )
            .require(&config.cluster_name, "missing cluster name")
            .single_line(&config.cluster_name, "cluster name")
            .single_line(&config.proxy_address, "proxy address");

        for (key, value) in &config.tags {
            validator
                .require(key, "invalid tag: key must not be empty")
                .check(
                    key.chars().count() <= max_tag_length,
                    format!("invalid tag key '{key}': longer than {max_tag_length} characters"),
                )
                .single_line(key, &format!("tag key {key:?}"))
                .single_line(value, &format!("value of tag {key:?}"));
        }

        validator
            .require_limits(&config.resources, &registry.logging_name)
            .quantities(&config.resources, &registry.logging_name);

        validator.finish()
    }

    fn resources(&self) -> Result<ResourcePlan> {
        let config = self.config();
        self.inner
            .plan(config.enable, &config.controller_manager_uid, [])
    }
}
