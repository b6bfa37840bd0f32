//! Command-line front end for svgrework.
//!
//! ## Usage
//!
//! ```bash
//! # Rewrite a stylesheet, resolving image files under ./assets
//! svgrework process site.css --base-path assets -o site.out.css
//!
//! # Only touch background-image declarations, settings from a file
//! svgrework process site.css --config svgrework.json --property background-image
//!
//! # Print the data URI for one restyled image
//! svgrework inline icons/star.svg --style 'path fill gold'
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use svgrework_common::{init_logging, LogConfig, LogFormat};
use svgrework_engine::{render_directive, SvgRework, TransformConfig};
use tracing::info;

#[derive(Parser)]
#[command(name = "svgrework")]
#[command(about = "Inline restyled SVG images into stylesheets as data URIs")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite every `svgurl(...) svg(...)` directive in a stylesheet
    Process {
        /// Input stylesheet
        input: PathBuf,
        /// Output path (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Directory image file references are resolved against
        #[arg(long)]
        base_path: Option<PathBuf>,
        /// JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Only rewrite declarations of this property (repeatable)
        #[arg(long = "property")]
        properties: Vec<String>,
    },

    /// Print the data URI of one restyled image
    Inline {
        /// Image file or SVG data URI
        image: String,
        /// Style spec, e.g. `rect fill red, path$logo stroke none`
        #[arg(short, long, default_value = "")]
        style: String,
        /// Directory the image path is resolved against
        #[arg(long)]
        base_path: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_verbosity(cli.verbose);
    if cli.log_json {
        log_config = log_config.with_format(LogFormat::Json);
    }
    init_logging(&log_config)?;

    match cli.command {
        Commands::Process {
            input,
            output,
            base_path,
            config,
            properties,
        } => {
            let mut transform_config = match config {
                Some(path) => TransformConfig::load(&path)?,
                None => TransformConfig::new(),
            };
            if let Some(base_path) = base_path {
                transform_config = transform_config.with_base_path(base_path);
            }
            if !properties.is_empty() {
                transform_config = transform_config.with_properties(properties);
            }

            let css = std::fs::read_to_string(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let out = SvgRework::new(transform_config)
                .process(&css)
                .with_context(|| format!("transforming {}", input.display()))?;

            match output {
                Some(path) => {
                    std::fs::write(&path, out)
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!(output = %path.display(), "stylesheet written");
                }
                None => print!("{out}"),
            }
        }

        Commands::Inline {
            image,
            style,
            base_path,
        } => {
            let mut config = TransformConfig::new();
            if let Some(base_path) = base_path {
                config = config.with_base_path(base_path);
            }
            let uri = render_directive(&image, &style, &config)?;
            println!("{uri}");
        }
    }

    Ok(())
}
