use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "billing-assistant")]
#[command(about = "Ask questions about the office's receivables and overdue clients")]
#[command(version)]
pub struct Cli {
    /// Contracts exported by the host application (JSON array or database dump)
    #[arg(long, global = true, env = "ASSISTANT_CONTRACTS_PATH", default_value = "contracts.json")]
    pub contracts: PathBuf,

    /// Debug logs for the assistant crates (stderr)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Interactive chat thread
    #[command(after_help = "\
In the thread:
  Enter submits; end a line with \\ to continue on the next line.
  /models            list models available to the stored key
  /model NAME        use NAME as the default model
  /settings          show key and model status
  /quit              leave")]
    Chat {
        /// Do not re-validate the stored key on startup
        #[arg(long)]
        skip_validation: bool,
    },

    /// Ask a single question and print the answer
    Ask {
        /// The question, e.g. "who are the top 5 overdue clients?"
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Print the financial context that would be sent with a question
    Context,

    /// Manage the stored API key and model
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Show the stored model and whether a key is configured
    Show,
    /// Validate KEY and store it only if it can generate content
    SetKey { key: String },
    /// Re-validate the stored key and report the outcome
    Validate,
    /// List generation models available to the stored key
    Models,
    /// Use NAME as the default model
    UseModel { name: String },
    /// Forget the stored key
    ClearKey,
}
