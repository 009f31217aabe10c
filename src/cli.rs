// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use relay::layout::CONFIG_FILENAME;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Atomic single-host releases with lifecycle hooks and automatic rollback")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print final results and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print results as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an app directory with releases/, shared/, logs/ and app.yml
    Init {
        /// Application name, used as the directory name
        #[arg(short, long)]
        name: String,

        /// Repository to deploy from
        #[arg(long)]
        repo: Option<String>,

        /// Branch to track
        #[arg(long)]
        branch: Option<String>,

        /// Overwrite an existing app.yml
        #[arg(long)]
        force: bool,
    },

    /// Deploy the latest revision if it changed
    #[command(alias = "start")]
    Run {
        /// Path to the app's configuration file
        #[arg(short, long, default_value = CONFIG_FILENAME)]
        file: PathBuf,

        /// Deploy even if the revision is unchanged
        #[arg(long)]
        force: bool,
    },

    /// Make the previous release live again
    Rollback {
        /// Path to the app's configuration file
        #[arg(short, long, default_value = CONFIG_FILENAME)]
        file: PathBuf,
    },

    /// Show the live release and all staged releases
    Status {
        /// Path to the app's configuration file
        #[arg(short, long, default_value = CONFIG_FILENAME)]
        file: PathBuf,
    },

    /// Remove a deploy lock left behind by an interrupted run
    Unlock {
        /// Path to the app's configuration file
        #[arg(short, long, default_value = CONFIG_FILENAME)]
        file: PathBuf,
    },
}

impl Commands {
    /// Config file for commands that change the app directory.
    ///
    /// These are the commands whose activity goes into `logs/`.
    pub fn logged_config_file(&self) -> Option<&Path> {
        match self {
            Commands::Run { file, .. }
            | Commands::Rollback { file }
            | Commands::Unlock { file } => Some(file),
            Commands::Init { .. } | Commands::Status { .. } => None,
        }
    }
}
