//! The Pixie profiling sub-system: the `vizier-pem` DaemonSet collecting
//! eBPF data on every node, and `kelvin` aggregating it.

use serde::{Deserialize, Serialize};

use super::{Component, Result, TemplatedComponent};
use crate::{
    config::Resources,
    plan::ResourcePlan,
    registry::NamingRegistry,
    template::TemplateSource,
    validation::{ValidationResult, Validator},
};

pub const NAME: &str = "pixie";

/// Requests of the `vizier-pem` container when none are configured.
const PEM_DEFAULT_REQUESTS: (&str, &str) = ("400m", "600Mi");

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PixieConfig {
    pub enable: bool,

    /// UID of the operator Deployment, owner of every rendered object.
    pub controller_manager_uid: String,

    /// Identifies the cluster towards Pixie cloud.
    pub cluster_uuid: String,
    pub cluster_name: String,

    /// Limits the PEM table store and the data sources, trading history
    /// for a smaller memory footprint.
    pub enable_op_apps_optimization: bool,

    /// Resources of the `vizier-pem` container. Requests fall back to
    /// defaults capped at the limits, limits must be set.
    pub pem_resources: Resources,
}

#[derive(Debug)]
pub struct PixieComponent {
    inner: TemplatedComponent<PixieConfig>,
}

impl PixieComponent {
    pub fn new(
        source: &impl TemplateSource,
        registry: NamingRegistry,
        mut config: PixieConfig,
    ) -> Result<Self> {
        let (cpu, memory) = PEM_DEFAULT_REQUESTS;
        config.pem_resources.default_requests(cpu, memory);

        Ok(Self {
            inner: TemplatedComponent::load(source, NAME, registry, config)?,
        })
    }

    pub fn config(&self) -> &PixieConfig {
        self.inner.config()
    }
}

impl Component for PixieComponent {
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

        let pem = &self.inner.registry().pixie_vizier_pem;
        let mut validator = Validator::new(NAME);
        validator
            .require(
                &config.controller_manager_uid,
                "missing controller manager uid",
            )
            .require(&config.cluster_uuid, "missing cluster uuid")
            .require(&config.cluster_name, "missing cluster name")
            .require_limits(&config.pem_resources, pem)
            .quantities(&config.pem_resources, pem);

        validator.finish()
    }

    fn resources(&self) -> Result<ResourcePlan> {
        let config = self.config();
        self.inner
            .plan(config.enable, &config.controller_manager_uid, [])
    }
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::{apps::v1::DaemonSet, core::v1::Container};
    use rstest::rstest;

    use super::*;
    use crate::{
        config::Resource,
        object::RenderedObjectsExt,
        template::{EmbeddedSource, InMemorySource},
    };

    fn valid_config() -> PixieConfig {
        PixieConfig {
            enable: true,
            controller_manager_uid: "controller-manager-uid".into(),
            cluster_uuid: "cluster-uuid".into(),
            cluster_name: "my-cluster".into(),
            enable_op_apps_optimization: true,
            pem_resources: Resources::with_limits("100Mi", "1Gi"),
        }
    }

    fn component(config: PixieConfig) -> PixieComponent {
        PixieComponent::new(&EmbeddedSource::default(), NamingRegistry::default(), config)
            .unwrap()
    }

    fn pem_container(daemon_set: &DaemonSet) -> &Container {
        &daemon_set
            .spec
            .as_ref()
            .unwrap()
            .template
            .spec
            .as_ref()
            .unwrap()
            .containers[0]
    }

    fn env_value<'a>(container: &'a Container, name: &str) -> Option<&'a str> {
        container
            .env
            .as_ref()?
            .iter()
            .find(|env| env.name == name)
            .map(|env| env.value.as_deref().unwrap_or_default())
    }

    #[test]
    fn valid_component_config() {
        assert!(component(valid_config()).validate().is_valid());
    }

    #[test]
    fn empty_disabled_component_config_is_valid() {
        let result = component(PixieConfig::default()).validate();
        assert!(result.is_valid());
    }

    #[test]
    fn empty_enabled_component_config_is_not_valid() {
        let result = component(PixieConfig {
            enable: true,
            ..PixieConfig::default()
        })
        .validate();

        assert!(!result.is_valid());
        assert_eq!(
            result.problems(),
            [
                "missing controller manager uid",
                "missing cluster uuid",
                "missing cluster name",
                "invalid vizier-pem.resources.limits.memory must be set",
                "invalid vizier-pem.resources.limits.cpu must be set",
            ]
        );
    }

    #[rstest]
    #[case::controller_manager_uid(
        |config: &mut PixieConfig| config.controller_manager_uid.clear(),
        "pixie: missing controller manager uid"
    )]
    #[case::cluster_uuid(
        |config: &mut PixieConfig| config.cluster_uuid.clear(),
        "pixie: missing cluster uuid"
    )]
    #[case::cluster_name(
        |config: &mut PixieConfig| config.cluster_name.clear(),
        "pixie: missing cluster name"
    )]
    #[case::pem_resources(
        |config: &mut PixieConfig| config.pem_resources = Resources::default(),
        "pixie: [invalid vizier-pem.resources.limits.memory must be set, invalid vizier-pem.resources.limits.cpu must be set]"
    )]
    #[case::pem_memory_limit(
        |config: &mut PixieConfig| config.pem_resources.limits.memory.clear(),
        "pixie: invalid vizier-pem.resources.limits.memory must be set"
    )]
    #[case::pem_request_above_limit(
        |config: &mut PixieConfig| config.pem_resources.requests.memory = "2Gi".into(),
        "pixie: invalid vizier-pem.resources.requests.memory: '2Gi' must be less than or equal to memory limit"
    )]
    fn invalid_config(#[case] change: fn(&mut PixieConfig), #[case] expected: &str) {
        let mut config = valid_config();
        change(&mut config);
        let component = component(config);

        let result = component.validate();
        assert!(!result.is_valid());
        assert_eq!(result.message(), expected);

        // Identical config, identical report.
        assert_eq!(component.validate(), result);
    }

    #[test]
    fn default_configuration() {
        let component = component(valid_config());
        let (to_apply, to_delete) = component.resources().unwrap().into_parts();

        assert!(!to_apply.is_empty());
        assert!(to_delete.is_empty());

        for object in &to_apply {
            let labels = object.metadata().labels.as_ref().unwrap();
            assert_eq!(labels["app.kubernetes.io/name"], "wavefront");
            assert_eq!(labels["app.kubernetes.io/component"], "pixie");
            assert_eq!(
                labels["wavefront.com/managed-namespace"],
                "observability-system"
            );
        }

        let config_map = to_apply.config_map("pl-cloud-config").unwrap();
        assert_eq!(
            config_map.data.as_ref().unwrap()["PL_CLUSTER_NAME"],
            "my-cluster"
        );

        let secret = to_apply.secret("pl-cluster-secrets").unwrap();
        let string_data = secret.string_data.as_ref().unwrap();
        assert_eq!(string_data["cluster-name"], "my-cluster");
        assert_eq!(string_data["cluster-id"], "cluster-uuid");

        assert!(to_apply.daemon_set("vizier-pem").is_some());
        assert!(to_apply.deployment("kelvin").is_some());
    }

    #[rstest]
    #[case(true, Some("150"), Some("90"), Some("kTracers"))]
    #[case(false, None, None, None)]
    fn op_apps_optimization(
        #[case] enabled: bool,
        #[case] data_limit: Option<&str>,
        #[case] http_events: Option<&str>,
        #[case] stirling_sources: Option<&str>,
    ) {
        let component = component(PixieConfig {
            enable_op_apps_optimization: enabled,
            ..valid_config()
        });
        let plan = component.resources().unwrap();

        let daemon_set = plan.to_apply().daemon_set("vizier-pem").unwrap();
        let container = pem_container(daemon_set);

        assert_eq!(
            env_value(container, "PL_TABLE_STORE_DATA_LIMIT_MB"),
            data_limit
        );
        assert_eq!(
            env_value(container, "PL_TABLE_STORE_HTTP_EVENTS_PERCENT"),
            http_events
        );
        assert_eq!(env_value(container, "PL_STIRLING_SOURCES"), stirling_sources);
        // Not gated by the flag.
        assert!(env_value(container, "PL_CLUSTER_NAME").is_some());
    }

    #[test]
    fn pem_resources_are_set_correctly() {
        let mut config = valid_config();
        config.pem_resources = Resources {
            requests: Resource {
                memory: "500Mi".into(),
                cpu: "50Mi".into(),
                ..Resource::default()
            },
            limits: Resource {
                memory: "1Gi".into(),
                cpu: "100Mi".into(),
                ..Resource::default()
            },
        };
        let plan = component(config).resources().unwrap();

        let daemon_set = plan.to_apply().daemon_set("vizier-pem").unwrap();
        let resources = pem_container(daemon_set).resources.as_ref().unwrap();
        let requests = resources.requests.as_ref().unwrap();
        let limits = resources.limits.as_ref().unwrap();

        assert_eq!(requests["memory"].0, "500Mi");
        assert_eq!(requests["cpu"].0, "50Mi");
        assert_eq!(limits["memory"].0, "1Gi");
        assert_eq!(limits["cpu"].0, "100Mi");
        assert!(!limits.contains_key("ephemeral-storage"));
    }

    #[test]
    fn pem_requests_fall_back_to_defaults() {
        let plan = component(valid_config()).resources().unwrap();

        let daemon_set = plan.to_apply().daemon_set("vizier-pem").unwrap();
        let resources = pem_container(daemon_set).resources.as_ref().unwrap();
        let requests = resources.requests.as_ref().unwrap();

        assert_eq!(requests["memory"].0, "600Mi");
        assert_eq!(requests["cpu"].0, "400m");
    }

    #[test]
    fn default_pem_requests_never_exceed_small_limits() {
        let component = component(PixieConfig {
            pem_resources: Resources::with_limits("100m", "512Mi"),
            ..valid_config()
        });
        assert!(component.validate().is_valid());

        let plan = component.resources().unwrap();
        let daemon_set = plan.to_apply().daemon_set("vizier-pem").unwrap();
        let resources = pem_container(daemon_set).resources.as_ref().unwrap();
        let requests = resources.requests.as_ref().unwrap();
        let limits = resources.limits.as_ref().unwrap();

        assert_eq!(requests["cpu"].0, "100m");
        assert_eq!(requests["memory"].0, "512Mi");
        assert_eq!(limits["cpu"].0, "100m");
        assert_eq!(limits["memory"].0, "512Mi");
    }

    #[test]
    fn objects_are_owned_by_the_controller_manager() {
        let plan = component(valid_config()).resources().unwrap();

        for object in plan.to_apply() {
            let owners = object.metadata().owner_references.as_ref().unwrap();
            assert_eq!(owners[0].uid, "controller-manager-uid");
        }
    }

    #[test]
    fn rendering_is_deterministic() {
        let first = component(valid_config()).resources().unwrap();
        let second = component(valid_config()).resources().unwrap();

        let yaml = |plan: &ResourcePlan| {
            plan.to_apply()
                .iter()
                .map(|object| serde_yaml::to_string(object).unwrap())
                .collect::<String>()
        };

        assert_eq!(yaml(&first), yaml(&second));
        assert!(first.config_hash().is_some());
        assert_eq!(first.config_hash(), second.config_hash());

        let renamed = component(PixieConfig {
            cluster_name: "other-cluster".into(),
            ..valid_config()
        })
        .resources()
        .unwrap();
        assert_ne!(first.config_hash(), renamed.config_hash());
    }

    #[test]
    fn disabled_component_deletes_what_it_would_create() {
        let enabled = component(valid_config()).resources().unwrap();
        let disabled = component(PixieConfig {
            enable: false,
            ..valid_config()
        })
        .resources()
        .unwrap();

        assert!(disabled.to_apply().is_empty());
        let expected = enabled
            .to_apply()
            .iter()
            .map(crate::object::RenderedObject::to_reference)
            .collect::<Vec<_>>();
        assert_eq!(disabled.to_delete(), expected);

        // Disabling with an otherwise empty config is just as safe.
        let empty = component(PixieConfig::default()).resources().unwrap();
        assert_eq!(empty.to_delete(), expected);
    }

    #[test]
    fn no_templates_is_a_no_op() {
        let source = InMemorySource::new().with_dir(NAME);
        let component =
            PixieComponent::new(&source, NamingRegistry::default(), valid_config()).unwrap();

        assert!(component.validate().is_valid());
        assert!(component.resources().unwrap().is_empty());
    }
}
