//
// cli.rs
// ct-organ-prep
//
// Defines the CLI surface with Clap and dispatches the selected preparation run.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use tracing::info;

use crate::config::ConfigStore;
use crate::fs_utils::remove_tree;
use crate::logging;
use crate::models::TrainingLayout;
use crate::pipeline;

/// Command-line interface glue code: defines the available verbs and dispatches to modules.
#[derive(Parser)]
#[command(name = "ct-organ-prep")]
#[command(
    about = "Prepare CT series and organ annotations for segmentation training",
    long_about = None
)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build image volumes, organ label volumes and slice indexes from an annotated dataset
    Train {
        /// Dataset root holding one directory per case
        #[arg(short, long)]
        dataset: PathBuf,
        #[arg(long, default_value = "imagesTr")]
        images: PathBuf,
        #[arg(long, default_value = "labelsTr")]
        labels: PathBuf,
        #[arg(long, default_value = "slicesTr")]
        slices: PathBuf,
        /// Configuration store receiving scale_min / scale_max
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
        /// Remove existing output directories before starting
        #[arg(long)]
        clean: bool,
    },
    /// Build image volumes and slice indexes for unannotated case directories
    Infer {
        #[arg(required = true)]
        cases: Vec<PathBuf>,
        #[arg(long, default_value = "imagesTs")]
        images: PathBuf,
        #[arg(long, default_value = "slicesTs")]
        slices: PathBuf,
        /// Write the run result as JSON to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub fn run() -> anyhow::Result<()> {
    // Parse the raw CLI arguments once and dispatch to a subcommand handler.
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    match cli.command {
        Commands::Train {
            dataset,
            images,
            labels,
            slices,
            config,
            clean,
        } => {
            if clean {
                for dir in [&images, &labels, &slices] {
                    info!("Removing {:?}", dir);
                    remove_tree(dir).with_context(|| format!("Failed to remove {:?}", dir))?;
                }
            }
            let layout = TrainingLayout {
                dataset_dir: dataset,
                images_dir: images,
                labels_dir: labels,
                slices_dir: slices,
            };
            let mut store = ConfigStore::load(&config)?;
            pipeline::prepare_training(&layout, &mut store)?;
        }
        Commands::Infer {
            cases,
            images,
            slices,
            output,
        } => {
            let outputs = pipeline::prepare_inference(&cases, &images, &slices)?;
            let json = serde_json::to_string_pretty(&outputs)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {:?}", path))?;
                    info!("Inference outputs saved to {:?}", path);
                }
                None => println!("{}", json),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn train_defaults_follow_dataset_layout() {
        let cli = Cli::parse_from(["ct-organ-prep", "-v", "train", "--dataset", "CT_organ"]);
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Train {
                images,
                labels,
                slices,
                config,
                clean,
                ..
            } => {
                assert_eq!(images, PathBuf::from("imagesTr"));
                assert_eq!(labels, PathBuf::from("labelsTr"));
                assert_eq!(slices, PathBuf::from("slicesTr"));
                assert_eq!(config, PathBuf::from("config.toml"));
                assert!(!clean);
            }
            Commands::Infer { .. } => panic!("expected train"),
        }
    }

    #[test]
    fn infer_requires_case_directories() {
        assert!(Cli::try_parse_from(["ct-organ-prep", "infer"]).is_err());
        let cli = Cli::try_parse_from(["ct-organ-prep", "infer", "case1", "case2"]).expect("parse");
        match cli.command {
            Commands::Infer { cases, output, .. } => {
                assert_eq!(cases.len(), 2);
                assert!(output.is_none());
            }
            Commands::Train { .. } => panic!("expected infer"),
        }
    }
}
