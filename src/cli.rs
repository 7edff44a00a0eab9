use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ServiceConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub config: ServiceConfig,

    /// Seed an in-memory data store from this JSON file instead of calling the data service
    #[arg(long, global = true)]
    pub fixture: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a weekly meal plan, spending one credit
    Plan {
        /// Account the credit is charged to
        #[arg(short, long)]
        account: String,

        /// First day of the planned week (YYYY-MM-DD)
        #[arg(short, long)]
        week_start: NaiveDate,

        /// Path to a JSON file with meal plan preferences
        #[arg(short, long)]
        preferences: Option<PathBuf>,

        /// Plan for a shared home instead of the account's own recipes
        #[arg(long)]
        home: Option<String>,
    },
    /// Structure a recipe from a text file, spending one credit
    ImportRecipe {
        #[arg(short, long)]
        account: String,

        /// Path to the recipe text file
        #[arg(short, long)]
        recipe_file: PathBuf,
    },
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
