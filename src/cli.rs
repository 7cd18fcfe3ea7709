use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::domain::FieldFilter;

/// Command-line interface for managing stored policy rules.
#[derive(Debug, Parser)]
#[command(name = "rulestore")]
#[command(about = "Store and load authorization policy rules in a document store")]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Apply pending database migrations
    Migrate,

    /// Print stored rules as policy lines
    Load {
        /// Filter clause such as `ptype==p` or `v0!=alice` (repeatable, ANDed)
        #[arg(long = "filter", short = 'f')]
        filters: Vec<FieldFilter>,
    },

    /// Save every rule of a policy file in one atomic batch
    Import {
        /// Policy file with one `ptype, v0, v1, ...` rule per line
        path: PathBuf,
    },

    /// Add one rule
    Add {
        ptype: String,
        #[arg(required = true)]
        fields: Vec<String>,
    },

    /// Remove every rule whose set fields equal the given ones
    Remove {
        ptype: String,
        #[arg(required = true)]
        fields: Vec<String>,
    },

    /// Remove rules matching values starting at a field index
    RemoveFiltered {
        ptype: String,
        #[arg(allow_negative_numbers = true)]
        field_index: i32,
        fields: Vec<String>,
    },
}
