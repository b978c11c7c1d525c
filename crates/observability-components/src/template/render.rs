//! Rendering of manifest templates into [`RenderedObject`]s.
//!
//! Templates are [minijinja] templates producing one or more YAML documents.
//! Undefined variables are a hard error, so a template referring to a config
//! field that does not exist fails loudly instead of rendering an empty value.

use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

use crate::{
    object::{self, RenderedObject},
    registry::NamingRegistry,
    template::{Template, TemplateSet},
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to render template {path:?}"))]
    Render {
        source: minijinja::Error,
        path: String,
    },

    #[snafu(display("template {path:?} did not render to valid YAML"))]
    ParseDocument {
        source: serde_yaml::Error,
        path: String,
    },

    #[snafu(display("template {path:?} rendered an invalid object"))]
    ConvertObject { source: object::Error, path: String },
}

/// The values every template can refer to.
///
/// `config` is the component configuration, `names` the [`NamingRegistry`].
#[derive(Debug, Serialize)]
pub struct RenderContext<'a, C> {
    pub config: &'a C,
    pub names: &'a NamingRegistry,
}

/// Renders templates with a fixed, strict environment.
#[derive(Debug)]
pub struct Renderer {
    env: Environment<'static>,
}

impl Default for Renderer {
    fn default() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_keep_trailing_newline(true);

        Self { env }
    }
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders every template of `templates` in path order and returns all
    /// objects the templates produced, in document order.
    pub fn render(
        &self,
        templates: &TemplateSet,
        ctx: impl Serialize,
    ) -> Result<Vec<RenderedObject>> {
        let ctx = minijinja::Value::from_serialize(ctx);
        let mut objects = Vec::new();

        for template in templates.iter() {
            objects.extend(self.render_template(template, &ctx)?);
        }

        tracing::debug!(
            dir = templates.dir(),
            templates = templates.len(),
            objects = objects.len(),
            "rendered component templates"
        );

        Ok(objects)
    }

    fn render_template(
        &self,
        template: &Template,
        ctx: &minijinja::Value,
    ) -> Result<Vec<RenderedObject>> {
        let path = &template.path;
        let output = self
            .env
            .render_named_str(path, &template.body, ctx)
            .context(RenderSnafu { path })?;

        parse_documents(&output, path)
    }
}

/// Splits rendered output into YAML documents, skipping documents which
/// rendered to nothing (e.g. because a feature flag gated them off).
fn parse_documents(output: &str, path: &str) -> Result<Vec<RenderedObject>> {
    let mut objects = Vec::new();

    for document in serde_yaml::Deserializer::from_str(output) {
        let value = serde_json::Value::deserialize(document).context(ParseDocumentSnafu { path })?;
        if value.is_null() {
            continue;
        }

        objects.push(RenderedObject::from_value(value).context(ConvertObjectSnafu { path })?);
    }

    Ok(objects)
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::{object::RenderedObjectsExt, template::InMemorySource};

    fn template_set(templates: &[(&str, &str)]) -> TemplateSet {
        let source = templates
            .iter()
            .fold(InMemorySource::new().with_dir("test"), |source, (path, body)| {
                source.with_template(format!("test/{path}"), *body)
            });

        TemplateSet::load(&source, "test").unwrap()
    }

    #[test]
    fn substitutes_config_and_names() {
        let templates = template_set(&[(
            "configmap.yaml",
            indoc! {r#"
                apiVersion: v1
                kind: ConfigMap
                metadata:
                  name: pl-cloud-config
                  namespace: {{ names.namespace }}
                data:
                  PL_CLUSTER_NAME: {{ config.clusterName | tojson }}
            "#},
        )]);

        let names = NamingRegistry::default();
        let objects = Renderer::new()
            .render(&templates, RenderContext {
                config: &json!({ "clusterName": "prod: eu" }),
                names: &names,
            })
            .unwrap();

        let config_map = objects.config_map("pl-cloud-config").unwrap();
        assert_eq!(
            config_map.metadata.namespace.as_deref(),
            Some("observability-system")
        );
        assert_eq!(
            config_map.data.as_ref().unwrap()["PL_CLUSTER_NAME"],
            "prod: eu"
        );
    }

    #[test]
    fn renders_multiple_documents_and_skips_empty_ones() {
        let templates = template_set(&[(
            "objects.yaml",
            indoc! {"
                ---
                apiVersion: v1
                kind: ServiceAccount
                metadata:
                  name: first
                ---
                {% if config.extra %}
                apiVersion: v1
                kind: ServiceAccount
                metadata:
                  name: extra
                {% endif %}
                ---
                apiVersion: v1
                kind: ServiceAccount
                metadata:
                  name: last
            "},
        )]);

        let names = NamingRegistry::default();
        let renderer = Renderer::new();
        let render = |extra: bool| {
            renderer
                .render(&templates, RenderContext {
                    config: &json!({ "extra": extra }),
                    names: &names,
                })
                .unwrap()
                .iter()
                .map(|object| object.name().to_owned())
                .collect::<Vec<_>>()
        };

        assert_eq!(render(false), ["first", "last"]);
        assert_eq!(render(true), ["first", "extra", "last"]);
    }

    #[test]
    fn renders_templates_in_path_order() {
        let service_account = |name: &str| {
            format!("apiVersion: v1\nkind: ServiceAccount\nmetadata:\n  name: {name}\n")
        };
        let second = service_account("second");
        let first = service_account("first");
        let templates = template_set(&[
            ("2-second.yaml", second.as_str()),
            ("1-first.yaml", first.as_str()),
        ]);

        let objects = Renderer::new()
            .render(&templates, RenderContext {
                config: &json!({}),
                names: &NamingRegistry::default(),
            })
            .unwrap();

        let names = objects.iter().map(RenderedObject::name).collect::<Vec<_>>();
        assert_eq!(names, ["first", "second"]);
    }

    #[rstest]
    #[case::undefined_variable("name: {{ config.missing.field }}")]
    #[case::syntax("name: {% if %}")]
    fn render_errors(#[case] body: &str) {
        let templates = template_set(&[("broken.yaml", body)]);

        let err = Renderer::new()
            .render(&templates, RenderContext {
                config: &json!({}),
                names: &NamingRegistry::default(),
            })
            .unwrap_err();

        assert!(matches!(err, Error::Render { path, .. } if path == "test/broken.yaml"));
    }

    #[rstest]
    #[case::not_yaml("kind: [unclosed", "ParseDocument")]
    #[case::no_kind("apiVersion: v1\nmetadata: {}", "ConvertObject")]
    fn invalid_documents(#[case] body: &str, #[case] expected: &str) {
        let templates = template_set(&[("broken.yaml", body)]);

        let err = Renderer::new()
            .render(&templates, RenderContext {
                config: &json!({}),
                names: &NamingRegistry::default(),
            })
            .unwrap_err();

        let variant = match err {
            Error::Render { .. } => "Render",
            Error::ParseDocument { .. } => "ParseDocument",
            Error::ConvertObject { .. } => "ConvertObject",
        };
        assert_eq!(variant, expected);
    }
}
