//! Turns rendered objects into the apply/delete sets of a component.

use std::collections::BTreeSet;

use k8s_openapi::{
    Resource,
    api::{apps::v1::Deployment, core::v1::ObjectReference},
    apimachinery::pkg::apis::meta::v1::OwnerReference,
};
use snafu::{ResultExt, Snafu};
use tracing::instrument;

use crate::{
    hash,
    kvp::{KeyValuePairsExt, LabelError, Labels, sets},
    object::RenderedObject,
    registry::NamingRegistry,
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to build the common labels of component {component:?}"))]
    CommonLabels {
        source: LabelError,
        component: String,
    },

    #[snafu(display("failed to hash the rendered config of component {component:?}"))]
    ConfigHash {
        source: hash::Error,
        component: String,
    },
}

/// The objects to create or update and the objects to remove.
///
/// An object never shows up in both sets.
#[derive(Clone, Debug, Default)]
pub struct ResourcePlan {
    to_apply: Vec<RenderedObject>,
    to_delete: Vec<ObjectReference>,
    config_hash: Option<String>,
}

impl ResourcePlan {
    pub fn to_apply(&self) -> &[RenderedObject] {
        &self.to_apply
    }

    pub fn to_delete(&self) -> &[ObjectReference] {
        &self.to_delete
    }

    /// Hash of all rendered ConfigMaps and Secrets, if the component renders any.
    pub fn config_hash(&self) -> Option<&str> {
        self.config_hash.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.to_apply.is_empty() && self.to_delete.is_empty()
    }

    pub fn into_parts(self) -> (Vec<RenderedObject>, Vec<ObjectReference>) {
        (self.to_apply, self.to_delete)
    }
}

/// The fields identifying an object in a cluster.
type Identity = (String, String, String, String);

fn identity(reference: &ObjectReference) -> Identity {
    let field = |value: &Option<String>| value.clone().unwrap_or_default();
    (
        field(&reference.api_version),
        field(&reference.kind),
        field(&reference.namespace),
        field(&reference.name),
    )
}

/// Computes the [`ResourcePlan`] of one component.
///
/// ```
/// # use observability_components::{plan::ResourcePlanner, registry::NamingRegistry};
/// let registry = NamingRegistry::default();
/// let plan = ResourcePlanner::new(&registry, "noop").plan(true, Vec::new()).unwrap();
///
/// assert!(plan.is_empty());
/// ```
#[derive(Clone, Debug)]
pub struct ResourcePlanner<'a> {
    registry: &'a NamingRegistry,
    component: &'a str,
    owner_uid: Option<&'a str>,
    retired: Vec<ObjectReference>,
}

impl<'a> ResourcePlanner<'a> {
    pub fn new(registry: &'a NamingRegistry, component: &'a str) -> Self {
        Self {
            registry,
            component,
            owner_uid: None,
            retired: Vec::new(),
        }
    }

    /// Makes the operator Deployment with `uid` the owner of every object
    /// in the operator namespace. An empty `uid` adds no owner.
    pub fn owned_by(mut self, uid: &'a str) -> Self {
        self.owner_uid = Some(uid).filter(|uid| !uid.is_empty());
        self
    }

    /// Objects earlier releases of the component created and which must go
    /// while the component is enabled.
    pub fn retire(mut self, references: impl IntoIterator<Item = ObjectReference>) -> Self {
        self.retired.extend(references);
        self
    }

    /// The labels selecting everything this component owns.
    pub fn selector(&self) -> Result<Labels> {
        sets::component_selector(&self.registry.app_name, self.component)
            .context(CommonLabelsSnafu {
                component: self.component,
            })
    }

    fn common_labels(&self) -> Result<Labels> {
        sets::common(sets::ObjectLabels {
            app_name: &self.registry.app_name,
            operator_name: &self.registry.operator_name,
            component: self.component,
            key_prefix: &self.registry.key_prefix,
            namespace: &self.registry.namespace,
        })
        .context(CommonLabelsSnafu {
            component: self.component,
        })
    }

    fn owner_reference(&self, uid: &str) -> OwnerReference {
        OwnerReference {
            api_version: Deployment::API_VERSION.to_owned(),
            kind: Deployment::KIND.to_owned(),
            name: self.registry.operator_name.clone(),
            uid: uid.to_owned(),
            ..OwnerReference::default()
        }
    }

    /// Labels, places and (optionally) owns every object.
    fn normalize(&self, objects: &mut [RenderedObject]) -> Result<()> {
        let labels = self.common_labels()?.to_unvalidated();

        for object in objects {
            let namespaced = object.is_namespaced();
            let metadata = object.metadata_mut();

            metadata
                .labels
                .get_or_insert_default()
                .extend(labels.clone());

            if namespaced && metadata.namespace.is_none() {
                metadata.namespace = Some(self.registry.namespace.clone());
            }

            // Owner references can't cross namespaces.
            if let Some(uid) = self.owner_uid
                && namespaced
                && metadata.namespace.as_ref() == Some(&self.registry.namespace)
            {
                metadata
                    .owner_references
                    .get_or_insert_default()
                    .push(self.owner_reference(uid));
            }
        }

        Ok(())
    }

    fn annotate_config_hash(&self, objects: &mut [RenderedObject], config_hash: &str) {
        let key = self.registry.config_hash_key();

        for object in objects {
            let Some(template) = object.pod_template_mut() else {
                continue;
            };
            template
                .metadata
                .get_or_insert_default()
                .annotations
                .get_or_insert_default()
                .insert(key.clone(), config_hash.to_owned());

            object
                .metadata_mut()
                .annotations
                .get_or_insert_default()
                .insert(key.clone(), config_hash.to_owned());
        }
    }

    /// Splits `objects`, the rendered templates of the component, into
    /// the objects to apply and the objects to delete.
    ///
    /// A disabled component applies nothing and deletes every object it
    /// renders. An enabled one applies every object and deletes only retired
    /// objects it doesn't also apply.
    #[instrument(skip(self, objects), fields(component = self.component))]
    pub fn plan(&self, enabled: bool, mut objects: Vec<RenderedObject>) -> Result<ResourcePlan> {
        self.normalize(&mut objects)?;

        if !enabled {
            let to_delete = objects
                .iter()
                .map(RenderedObject::to_reference)
                .collect::<Vec<_>>();
            tracing::debug!(to_delete = to_delete.len(), "component disabled");

            return Ok(ResourcePlan {
                to_delete,
                ..ResourcePlan::default()
            });
        }

        let config_hash = hash::content_hash(&objects).context(ConfigHashSnafu {
            component: self.component,
        })?;
        if let Some(config_hash) = &config_hash {
            self.annotate_config_hash(&mut objects, config_hash);
        }

        let applied = objects
            .iter()
            .map(|object| identity(&object.to_reference()))
            .collect::<BTreeSet<_>>();
        let to_delete = self
            .retired
            .iter()
            .filter(|reference| !applied.contains(&identity(reference)))
            .cloned()
            .collect::<Vec<_>>();

        tracing::debug!(
            to_apply = objects.len(),
            to_delete = to_delete.len(),
            config_hash = config_hash.as_deref(),
            "computed resource plan"
        );

        Ok(ResourcePlan {
            to_apply: objects,
            to_delete,
            config_hash,
        })
    }
}
