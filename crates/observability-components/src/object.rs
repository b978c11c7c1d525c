//! Rendered Kubernetes objects.
//!
//! Templates render into YAML documents, which are turned into one of the
//! typed objects the operator ships. Kinds without a typed variant are kept as
//! a [`DynamicObject`] so unusual templates still flow through the planner.

use k8s_openapi::{
    Resource,
    api::{
        apps::v1::{DaemonSet, Deployment, StatefulSet},
        core::v1::{ConfigMap, ObjectReference, PodTemplateSpec, Secret, Service, ServiceAccount},
        rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding},
    },
    apimachinery::pkg::apis::meta::v1::ObjectMeta,
};
use kube::core::DynamicObject;
use serde::Serialize;
use snafu::{OptionExt, ResultExt, Snafu};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("rendered document is missing the {field:?} field"))]
    MissingTypeField { field: &'static str },

    #[snafu(display("failed to deserialize rendered {api_version}/{kind} object"))]
    DeserializeObject {
        source: serde_json::Error,
        api_version: String,
        kind: String,
    },
}

/// Kinds which are not namespaced but have no typed variant.
const CLUSTER_SCOPED_DYNAMIC_KINDS: &[&str] = &[
    "APIService",
    "CustomResourceDefinition",
    "MutatingWebhookConfiguration",
    "Namespace",
    "PersistentVolume",
    "PriorityClass",
    "SecurityContextConstraints",
    "StorageClass",
    "ValidatingWebhookConfiguration",
];

macro_rules! rendered_objects {
    ($($variant:ident($ty:ty, namespaced = $namespaced:literal, $accessor:ident)),+ $(,)?) => {
        /// A fully rendered object, ready to be applied.
        #[derive(Clone, Debug, Serialize)]
        #[serde(untagged)]
        pub enum RenderedObject {
            $($variant($ty),)+
            Dynamic(DynamicObject),
        }

        impl RenderedObject {
            /// Converts one parsed YAML document into a typed object, based on
            /// its `apiVersion` and `kind`.
            pub fn from_value(value: serde_json::Value) -> Result<Self> {
                let api_version = value
                    .get("apiVersion")
                    .and_then(serde_json::Value::as_str)
                    .context(MissingTypeFieldSnafu { field: "apiVersion" })?
                    .to_owned();
                let kind = value
                    .get("kind")
                    .and_then(serde_json::Value::as_str)
                    .context(MissingTypeFieldSnafu { field: "kind" })?
                    .to_owned();

                $(
                    if api_version == <$ty as Resource>::API_VERSION
                        && kind == <$ty as Resource>::KIND
                    {
                        let object = serde_json::from_value(value)
                            .context(DeserializeObjectSnafu { api_version, kind })?;
                        return Ok(Self::$variant(object));
                    }
                )+

                serde_json::from_value(value)
                    .map(Self::Dynamic)
                    .context(DeserializeObjectSnafu { api_version, kind })
            }

            pub fn api_version(&self) -> &str {
                match self {
                    $(Self::$variant(_) => <$ty as Resource>::API_VERSION,)+
                    Self::Dynamic(object) => object
                        .types
                        .as_ref()
                        .map_or("", |types| types.api_version.as_str()),
                }
            }

            pub fn kind(&self) -> &str {
                match self {
                    $(Self::$variant(_) => <$ty as Resource>::KIND,)+
                    Self::Dynamic(object) => object
                        .types
                        .as_ref()
                        .map_or("", |types| types.kind.as_str()),
                }
            }

            pub fn metadata(&self) -> &ObjectMeta {
                match self {
                    $(Self::$variant(object) => &object.metadata,)+
                    Self::Dynamic(object) => &object.metadata,
                }
            }

            pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
                match self {
                    $(Self::$variant(object) => &mut object.metadata,)+
                    Self::Dynamic(object) => &mut object.metadata,
                }
            }

            /// Whether objects of this kind live in a namespace.
            pub fn is_namespaced(&self) -> bool {
                match self {
                    $(Self::$variant(_) => $namespaced,)+
                    Self::Dynamic(_) => !CLUSTER_SCOPED_DYNAMIC_KINDS.contains(&self.kind()),
                }
            }

            $(
                pub fn $accessor(&self) -> Option<&$ty> {
                    match self {
                        Self::$variant(object) => Some(object),
                        _ => None,
                    }
                }
            )+
        }
    };
}

rendered_objects! {
    ConfigMap(ConfigMap, namespaced = true, as_config_map),
    Secret(Secret, namespaced = true, as_secret),
    Service(Service, namespaced = true, as_service),
    ServiceAccount(ServiceAccount, namespaced = true, as_service_account),
    DaemonSet(DaemonSet, namespaced = true, as_daemon_set),
    Deployment(Deployment, namespaced = true, as_deployment),
    StatefulSet(StatefulSet, namespaced = true, as_stateful_set),
    Role(Role, namespaced = true, as_role),
    RoleBinding(RoleBinding, namespaced = true, as_role_binding),
    ClusterRole(ClusterRole, namespaced = false, as_cluster_role),
    ClusterRoleBinding(ClusterRoleBinding, namespaced = false, as_cluster_role_binding),
}

impl RenderedObject {
    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata().namespace.as_deref()
    }

    /// ConfigMaps and Secrets carry the configuration workloads consume.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::ConfigMap(_) | Self::Secret(_))
    }

    /// The pod template of workload kinds.
    pub fn pod_template_mut(&mut self) -> Option<&mut PodTemplateSpec> {
        match self {
            Self::DaemonSet(daemon_set) => daemon_set.spec.as_mut().map(|spec| &mut spec.template),
            Self::Deployment(deployment) => {
                deployment.spec.as_mut().map(|spec| &mut spec.template)
            }
            Self::StatefulSet(stateful_set) => {
                stateful_set.spec.as_mut().map(|spec| &mut spec.template)
            }
            _ => None,
        }
    }

    /// The reference the outer loop uses to address (and delete) this object.
    pub fn to_reference(&self) -> ObjectReference {
        ObjectReference {
            api_version: Some(self.api_version().to_owned()),
            kind: Some(self.kind().to_owned()),
            name: self.metadata().name.clone(),
            namespace: self.metadata().namespace.clone(),
            ..ObjectReference::default()
        }
    }
}

/// Lookup helpers over a set of rendered objects.
pub trait RenderedObjectsExt {
    fn find(&self, kind: &str, name: &str) -> Option<&RenderedObject>;

    fn config_map(&self, name: &str) -> Option<&ConfigMap> {
        self.find(ConfigMap::KIND, name)
            .and_then(RenderedObject::as_config_map)
    }

    fn secret(&self, name: &str) -> Option<&Secret> {
        self.find(Secret::KIND, name).and_then(RenderedObject::as_secret)
    }

    fn daemon_set(&self, name: &str) -> Option<&DaemonSet> {
        self.find(DaemonSet::KIND, name)
            .and_then(RenderedObject::as_daemon_set)
    }

    fn deployment(&self, name: &str) -> Option<&Deployment> {
        self.find(Deployment::KIND, name)
            .and_then(RenderedObject::as_deployment)
    }
}

impl RenderedObjectsExt for [RenderedObject] {
    fn find(&self, kind: &str, name: &str) -> Option<&RenderedObject> {
        self.iter()
            .find(|object| object.kind() == kind && object.name() == name)
    }
}
