use std::{
    io::Write,
    path::{Path, PathBuf},
};

use observability_components::{
    component::{self, AnyComponent, Component, ComponentsConfig},
    registry::NamingRegistry,
    template::{self, EmbeddedSource, FileSystemSource, Template, TemplateSource},
    yaml,
};
use serde::de::DeserializeOwned;
use snafu::{ResultExt, Snafu, ensure};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to read {path:?}"))]
    ReadFile {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to parse {path:?} as YAML"))]
    ParseYaml {
        source: serde_yaml::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to build components"))]
    BuildComponents { source: component::Error },

    #[snafu(display("unknown component {name:?}, expected one of {known:?}"))]
    UnknownComponent { name: String, known: Vec<String> },

    #[snafu(display("invalid component configuration: {message}"))]
    InvalidConfig { message: String },

    #[snafu(display("failed to compute the resources of component {name:?}"))]
    PlanComponent {
        source: component::Error,
        name: String,
    },

    #[snafu(display("failed to serialize rendered object"))]
    SerializeObject { source: yaml::Error },

    #[snafu(display("failed to write output"))]
    WriteOutput { source: std::io::Error },
}

/// Where templates are read from.
#[derive(Debug)]
enum Templates {
    Embedded(EmbeddedSource),
    FileSystem(FileSystemSource),
}

impl TemplateSource for Templates {
    fn templates(&self, dir: &str) -> template::Result<Vec<Template>> {
        match self {
            Self::Embedded(source) => source.templates(dir),
            Self::FileSystem(source) => source.templates(dir),
        }
    }
}

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
    serde_yaml::from_str(&contents).context(ParseYamlSnafu { path })
}

#[derive(Debug)]
pub struct Preview {
    components: Vec<AnyComponent>,
}

impl Preview {
    /// Reads the component config (and optionally the registry) from disk.
    pub fn load(
        config: &Path,
        registry: Option<&Path>,
        templates: Option<PathBuf>,
    ) -> Result<Self> {
        let config = read_yaml::<ComponentsConfig>(config)?;
        let registry = registry
            .map(read_yaml::<NamingRegistry>)
            .transpose()?
            .unwrap_or_default();
        let templates = match templates {
            Some(dir) => {
                tracing::info!(dir = %dir.display(), "reading templates from disk");
                Templates::FileSystem(FileSystemSource::new(dir))
            }
            None => Templates::Embedded(EmbeddedSource::default()),
        };

        Self::new(&templates, &registry, config)
    }

    pub fn new(
        source: &impl TemplateSource,
        registry: &NamingRegistry,
        config: ComponentsConfig,
    ) -> Result<Self> {
        let components =
            AnyComponent::all(source, registry, config).context(BuildComponentsSnafu)?;
        Ok(Self { components })
    }

    /// Writes one line per component and fails if any of them is invalid.
    pub fn validate(&self, mut writer: impl Write) -> Result<()> {
        let mut problems = Vec::new();

        for component in &self.components {
            let result = component.validate();
            let line = match (component.is_enabled(), result.is_valid()) {
                (false, _) => format!("{}: disabled", component.name()),
                (true, true) => format!("{}: valid", component.name()),
                (true, false) => {
                    problems.push(result.message());
                    result.message()
                }
            };
            writeln!(writer, "{line}").context(WriteOutputSnafu)?;
        }

        ensure!(problems.is_empty(), InvalidConfigSnafu {
            message: problems.join("; ")
        });
        Ok(())
    }

    /// Writes the objects to apply of every component, or only of `only`, as
    /// explicit YAML documents. Objects to delete are logged.
    pub fn render(&self, only: Option<&str>, mut writer: impl Write) -> Result<()> {
        let selected = self
            .components
            .iter()
            .filter(|component| only.is_none_or(|name| component.name() == name))
            .collect::<Vec<_>>();

        if let Some(name) = only {
            ensure!(!selected.is_empty(), UnknownComponentSnafu {
                name,
                known: self
                    .components
                    .iter()
                    .map(|component| component.name().to_owned())
                    .collect::<Vec<_>>(),
            });
        }

        for component in selected {
            let result = component.validate();
            ensure!(result.is_valid(), InvalidConfigSnafu {
                message: result.message()
            });

            let plan = component.resources().context(PlanComponentSnafu {
                name: component.name(),
            })?;

            for reference in plan.to_delete() {
                tracing::info!(
                    component = component.name(),
                    kind = reference.kind.as_deref().unwrap_or_default(),
                    namespace = reference.namespace.as_deref().unwrap_or_default(),
                    name = reference.name.as_deref().unwrap_or_default(),
                    "object would be deleted"
                );
            }

            for object in plan.to_apply() {
                yaml::serialize_to_explicit_document(object, &mut writer)
                    .context(SerializeObjectSnafu)?;
            }
        }

        Ok(())
    }
}
