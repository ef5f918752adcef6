//! Kubeflow Upgrade Planner CLI
//!
//! Views juju Kubeflow bundles and compares two bundles for possible upgrades.
//!
//! Usage:
//!   kup check -f bundle.yaml                  # view a local bundle
//!   kup check -t 1.8/stable                   # view a published bundle
//!   kup check -f bundle.yaml -t 1.8/stable    # plan an upgrade
//!   kup check -f old.yaml -f new.yaml         # compare two local bundles
//!   kup config show

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use kf_upgrade_planner::render::{render_bundle, render_classification, write_output};
use kf_upgrade_planner::{
    ComparisonReport, HttpFetcher, JujuResolver, OutputFormat, Outcome, PlanRequest, Planner,
    PlannerConfig,
};
use tracing_subscriber::EnvFilter;

const CHECK_EPILOG: &str = "\
To view a local bundle, extract it with
  juju export-bundle -o filename
and then run
  kup check -f filename

To view a bundle from the kubeflow git repo, run with only the -t flag
followed by a channel, e.g. kup check -t 1.7/stable

When both a local and a target bundle are given, an upgrade check runs,
e.g. kup check -f localbundle -t 1.7/edge";

#[derive(Parser)]
#[command(name = "kup")]
#[command(about = "A collection of handy tools for operators of kubeflow environments")]
struct Cli {
    /// Config file to load (optional)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// View kubeflow bundles or compare 2 bundles for possible upgrades
    #[command(after_help = CHECK_EPILOG)]
    Check {
        /// Input juju kubeflow bundle yaml; give it twice to compare two
        /// local files, the first one is the source
        #[arg(short, long = "file", value_name = "FILE")]
        files: Vec<PathBuf>,

        /// Target version of kubeflow bundle, e.g. 1.7/stable, 1.7/beta or self
        #[arg(short, long, value_name = "TARGET_VERSION")]
        target: Option<String>,

        /// Output format: table, yaml, json or csv
        #[arg(long)]
        format: Option<OutputFormat>,

        /// File to store output
        #[arg(short, long, value_name = "OUTPUT_FILE")]
        output: Option<PathBuf>,

        /// Application whose channel decides the bundle version
        #[arg(long)]
        anchor: Option<String>,
    },

    /// View and manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Initialize a new config file
    Init {
        /// Output path
        #[arg(short, long, default_value = "kup.toml")]
        output: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = PlannerConfig::load_from(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Check {
            files,
            target,
            format,
            output,
            anchor,
        } => {
            let request = PlanRequest::from_inputs(&files, target.as_deref())?;
            let format = format.unwrap_or(config.output.format);
            let anchor = anchor.unwrap_or_else(|| config.bundle.anchor.clone());

            let fetcher = HttpFetcher::new(config.source.repo_root.clone())?;
            let resolver = JujuResolver::new(config.resolver.juju_path.clone());
            let planner = Planner::new(anchor, config.upgrade_docs_url(), &fetcher, &resolver);

            match planner.execute(&request)? {
                Outcome::View(view) => {
                    let body = render_bundle(&view.bundle, format)?;
                    write_output(&body, output.as_deref())?;
                }
                Outcome::Comparison(report) => {
                    let body = render_classification(&report.classification, format)?;
                    write_output(&body, output.as_deref())?;
                    print_summary(&report, format)?;
                }
            }
            Ok(())
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show { json } => {
                if json {
                    println!("{}", serde_json::to_string_pretty(&config)?);
                } else {
                    println!("{}", toml::to_string_pretty(&config)?);
                }
                Ok(())
            }
            ConfigCommands::Init { output } => {
                PlannerConfig::default()
                    .save(&output)
                    .with_context(|| format!("writing {}", output))?;
                println!("Config written to {}", output);
                Ok(())
            }
        },
    }
}

/// Upgrade summary; kept off stdout for machine-readable formats
fn print_summary(report: &ComparisonReport, format: OutputFormat) -> std::io::Result<()> {
    let mut out: Box<dyn Write> = match format {
        OutputFormat::Table => Box::new(std::io::stdout()),
        _ => Box::new(std::io::stderr()),
    };

    let classification = &report.classification;
    writeln!(out)?;
    writeln!(out, "{} charms need upgrades!", classification.changed_count)?;

    let removed = &classification.removed_components;
    if !removed.is_empty() {
        writeln!(
            out,
            "{} charms not found in target bundle: {}",
            removed.len(),
            removed.join(", ")
        )?;
    }

    if report.downgrade {
        writeln!(
            out,
            "Downgrade detected! ({} -> {})",
            report.source_version, report.target_version
        )?;
    }

    writeln!(
        out,
        "Also check upgrade docs at {} for any relevant steps and caveats!",
        report.upgrade_docs
    )
}
