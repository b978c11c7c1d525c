//! Pluggable sub-systems of the operator.
//!
//! Every component is built from a [`TemplateSource`], the [`NamingRegistry`]
//! and its own configuration struct. Construction only fails if the templates
//! can't be read. Problems with the configuration itself are reported by
//! [`Component::validate`], never as an [`Err`].

use k8s_openapi::api::core::v1::ObjectReference;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

use crate::{
    plan::{self, ResourcePlan, ResourcePlanner},
    registry::NamingRegistry,
    template::{
        self, TemplateSet, TemplateSource,
        render::{self, RenderContext, Renderer},
    },
    validation::ValidationResult,
};

pub mod collector;
pub mod logging;
pub mod pixie;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to load the templates of component {component:?}"))]
    LoadTemplates {
        source: template::Error,
        component: String,
    },

    #[snafu(display("failed to render the templates of component {component:?}"))]
    RenderTemplates {
        source: render::Error,
        component: String,
    },

    #[snafu(display("failed to plan the resources of component {component:?}"))]
    PlanResources {
        source: plan::Error,
        component: String,
    },
}

/// The contract every component fulfils.
///
/// Both operations are pure functions of the configuration and the templates
/// read at construction, calling them repeatedly yields identical results.
pub trait Component {
    /// The component name, used as prefix of validation messages and as the
    /// `app.kubernetes.io/component` label.
    fn name(&self) -> &str;

    /// Whether the component should be installed at all.
    fn is_enabled(&self) -> bool;

    /// Validates the configuration. Disabled components are always valid.
    fn validate(&self) -> ValidationResult;

    /// Renders the component into the objects to apply and to delete.
    fn resources(&self) -> Result<ResourcePlan>;
}

/// The parts shared by all components rendered from a template directory.
#[derive(Debug)]
pub(crate) struct TemplatedComponent<C> {
    name: &'static str,
    registry: NamingRegistry,
    templates: TemplateSet,
    renderer: Renderer,
    config: C,
}

impl<C: Serialize> TemplatedComponent<C> {
    /// Reads the templates in the `name` directory of `source`.
    pub(crate) fn load(
        source: &impl TemplateSource,
        name: &'static str,
        registry: NamingRegistry,
        config: C,
    ) -> Result<Self> {
        let templates =
            TemplateSet::load(source, name).context(LoadTemplatesSnafu { component: name })?;

        Ok(Self {
            name,
            registry,
            templates,
            renderer: Renderer::new(),
            config,
        })
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn registry(&self) -> &NamingRegistry {
        &self.registry
    }

    pub(crate) fn config(&self) -> &C {
        &self.config
    }

    /// Renders all templates and plans them.
    ///
    /// Disabled components still render, the delete set is derived from what
    /// the templates would create.
    pub(crate) fn plan(
        &self,
        enabled: bool,
        owner_uid: &str,
        retired: impl IntoIterator<Item = ObjectReference>,
    ) -> Result<ResourcePlan> {
        let objects = self
            .renderer
            .render(&self.templates, RenderContext {
                config: &self.config,
                names: &self.registry,
            })
            .context(RenderTemplatesSnafu {
                component: self.name,
            })?;

        ResourcePlanner::new(&self.registry, self.name)
            .owned_by(owner_uid)
            .retire(retired)
            .plan(enabled, objects)
            .context(PlanResourcesSnafu {
                component: self.name,
            })
    }
}

/// The configuration of all built-in components, as found in the operator's
/// custom resource.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ComponentsConfig {
    pub pixie: pixie::PixieConfig,
    pub logging: logging::LoggingConfig,
    pub collector: collector::CollectorConfig,
}

/// One of the built-in components.
#[derive(Debug)]
pub enum AnyComponent {
    Pixie(pixie::PixieComponent),
    Logging(logging::LoggingComponent),
    Collector(collector::CollectorComponent),
}

impl AnyComponent {
    /// Builds every built-in component, in a fixed order.
    pub fn all(
        source: &impl TemplateSource,
        registry: &NamingRegistry,
        config: ComponentsConfig,
    ) -> Result<Vec<Self>> {
        let ComponentsConfig {
            pixie,
            logging,
            collector,
        } = config;

        Ok(vec![
            Self::Collector(collector::CollectorComponent::new(
                source,
                registry.clone(),
                collector,
            )?),
            Self::Logging(logging::LoggingComponent::new(
                source,
                registry.clone(),
                logging,
            )?),
            Self::Pixie(pixie::PixieComponent::new(
                source,
                registry.clone(),
                pixie,
            )?),
        ])
    }

    fn inner(&self) -> &dyn Component {
        match self {
            Self::Pixie(component) => component,
            Self::Logging(component) => component,
            Self::Collector(component) => component,
        }
    }
}

impl Component for AnyComponent {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn is_enabled(&self) -> bool {
        self.inner().is_enabled()
    }

    fn validate(&self) -> ValidationResult {
        self.inner().validate()
    }

    fn resources(&self) -> Result<ResourcePlan> {
        self.inner().resources()
    }
}
