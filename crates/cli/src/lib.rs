pub mod commands;
pub mod logging;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "loanscout",
    about = "Natural-language loan search",
    long_about = "Search consumer, housing and vehicle loan offers from a free-text request, \
                  and inspect the configuration the search runs with.",
    after_help = "Examples:\n  loanscout search \"5 milyon 48 ay vadeli konut kredisi\"\n  \
                  loanscout search --json \"750k car loan over 3 years\"\n  loanscout doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Parse a free-text loan request and list matching offers by interest rate")]
    Search {
        #[arg(required = true, num_args = 1.., help = "Loan request in plain language")]
        query: Vec<String>,
        #[arg(long, help = "Emit the search result as JSON")]
        json: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, completion-service credentials and provider endpoints")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Search { query, json } => commands::search::run(&query.join(" "), json),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
