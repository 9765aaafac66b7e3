use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use shelfrank_core::{rank, Scorer, SortKey};

#[derive(Parser, Debug)]
#[command(name = "shelfrank")]
#[command(about = "Rank your board game collection by rating, plays and freshness")]
#[command(version)]
pub struct Cli {
    /// Configuration file (default: platform config dir)
    #[arg(long, global = true, env = "SHELFRANK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Bypass the response cache for this run
    #[arg(long, global = true)]
    pub no_cache: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rank rated games in a user's collection
    Ratings {
        #[command(flatten)]
        output: OutputArgs,

        /// Catalog username
        #[arg(short, long)]
        user: String,

        /// Scoring function: weighted, bayesian or freshness
        #[arg(short, long, default_value_t = Scorer::Freshness)]
        scorer: Scorer,

        /// Sort keys as field[:asc|desc], comma separated
        #[arg(long, value_delimiter = ',', default_values_t = rank::DEFAULT_KEYS.to_vec())]
        sort: Vec<SortKey>,
    },

    /// Rank games by plays logged in the last months
    Played {
        #[command(flatten)]
        output: OutputArgs,

        /// Catalog username
        #[arg(short, long)]
        user: String,

        /// Length of the history window in months
        #[arg(short, long, default_value_t = 12)]
        months: u32,
    },

    /// Show the catalog's current hot list
    Hot {
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args, Debug, Clone, Copy)]
pub struct OutputArgs {
    /// Number of results to show
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    pub count: Option<u32>,

    /// Show all columns
    #[arg(short, long)]
    pub detailed: bool,
}

impl OutputArgs {
    pub fn limit(&self) -> Option<usize> {
        self.count.map(|count| count as usize)
    }
}
