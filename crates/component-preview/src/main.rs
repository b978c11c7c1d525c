use std::path::PathBuf;

use clap::{Parser, Subcommand};
use observability_components::logging::initialize_logging;
use snafu::{ResultExt, Snafu};

mod preview;

const APP_NAME: &str = "component-preview";

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to initialize logging"))]
    InitializeLogging {
        source: observability_components::logging::Error,
    },

    #[snafu(display("failed to preview components"))]
    Preview { source: preview::Error },
}

/// Validates the configuration of the operator's components and prints the
/// objects they would apply.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// YAML file with the configuration of all components.
    #[arg(long, short)]
    config: PathBuf,

    /// YAML file overriding names of the naming registry.
    #[arg(long)]
    registry: Option<PathBuf>,

    /// Read templates from this directory instead of the built-in ones.
    #[arg(long, env = "COMPONENT_TEMPLATES_DIR")]
    templates: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate the configuration of every component.
    Validate,

    /// Print the objects to apply as YAML documents.
    Render {
        /// Only render this component.
        #[arg(long)]
        component: Option<String>,
    },
}

#[snafu::report]
fn main() -> Result<(), Error> {
    let cli = Cli::parse();
    initialize_logging("COMPONENT_PREVIEW_LOG", APP_NAME).context(InitializeLoggingSnafu)?;

    let preview = preview::Preview::load(&cli.config, cli.registry.as_deref(), cli.templates)
        .context(PreviewSnafu)?;
    let stdout = std::io::stdout().lock();

    match cli.command {
        Command::Validate => preview.validate(stdout),
        Command::Render { component } => preview.render(component.as_deref(), stdout),
    }
    .context(PreviewSnafu)
}
