//! charfsa - inspect probabilistic character automata
//!
//! Builds charset elements, enumerates their completions, and shows which
//! characters may follow a prefix.

mod config;

use charfsa_core::{walk, Charset, GrammarElement, JsonPersist};
use clap::{Parser, Subcommand};
use colored::Colorize;
use config::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "charfsa")]
#[command(about = "Inspect probabilistic character automata")]
#[command(version)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, env = "CHARFSA_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a charset element and print or save its JSON
    Charset {
        /// Admissible characters; repeating one increases its weight
        chars: String,

        /// Minimum repeat count
        #[arg(long, default_value_t = 1)]
        min: u32,

        /// Maximum repeat count (unbounded if omitted)
        #[arg(long)]
        max: Option<u32>,

        /// Write the element to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List admissible completions of an element
    Enumerate {
        /// Element JSON file
        file: PathBuf,

        /// Maximum number of completions
        #[arg(short, long)]
        limit: Option<usize>,

        /// Maximum completion length
        #[arg(long)]
        max_length: Option<usize>,
    },

    /// Show which characters may follow a prefix
    Next {
        /// Element JSON file
        file: PathBuf,

        /// Prefix already consumed
        #[arg(default_value = "")]
        prefix: String,
    },

    /// Print an element in pattern notation
    Show {
        /// Element JSON file
        file: PathBuf,
    },
}

/// Takes up to `limit` completions and reports whether any were left over.
fn take_completions<I>(completions: I, limit: usize) -> (Vec<(String, f64)>, bool)
where
    I: Iterator<Item = (String, f64)>,
{
    let mut completions = completions.peekable();
    let shown: Vec<_> = completions.by_ref().take(limit).collect();
    let truncated = completions.peek().is_some();
    (shown, truncated)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            return Err(e.into());
        }
    };
    if !config.output.color {
        colored::control::set_override(false);
    }

    match cli.command {
        Commands::Charset {
            chars,
            min,
            max,
            output,
        } => {
            let element = GrammarElement::from(Charset::new(&chars, min, max)?);
            match output {
                Some(path) => {
                    element.save_to_file(&path)?;
                    tracing::info!("Saved {} to {}", element, path.display());
                }
                None => println!("{}", element.save_to_string()?),
            }
        }

        Commands::Enumerate {
            file,
            limit,
            max_length,
        } => {
            let element = GrammarElement::from_file(&file)?;
            let limit = limit.unwrap_or(config.enumeration.max_results);
            let max_length = max_length.unwrap_or(config.enumeration.max_length);
            tracing::debug!("Enumerating {} (limit {}, max length {})", element, limit, max_length);

            let (shown, truncated) =
                take_completions(element.enumerate().max_length(max_length), limit);
            for (word, score) in shown {
                if config.output.show_scores {
                    println!("{:<24} {}", format!("{:?}", word), format!("{:.6}", score).dimmed());
                } else {
                    println!("{}", word);
                }
            }
            if truncated {
                tracing::info!("Stopped after {} completions", limit);
            }
        }

        Commands::Next { file, prefix } => {
            let element = GrammarElement::from_file(&file)?;
            let root = element.initial_state();

            let Some(state) = walk(&root, &prefix) else {
                println!("{} prefix {:?} is not admissible", "✗".red(), prefix);
                return Ok(());
            };

            if state.word_end() {
                println!(
                    "{} prefix {:?} may end here (p={:.4})",
                    "✓".green(),
                    prefix,
                    state.word_end_probability()
                );
            } else {
                println!("{} prefix {:?} may not end here", "·".yellow(), prefix);
            }

            match state.next_states() {
                Some(next) => {
                    for (ch, successor) in next.iter() {
                        let marker = if successor.word_end() {
                            "end".green().to_string()
                        } else {
                            String::new()
                        };
                        println!(
                            "  {:<6} {:.4}  {}",
                            format!("{:?}", ch).cyan(),
                            successor.char_probability(),
                            marker
                        );
                    }
                }
                None => println!("  {}", "(no continuation)".dimmed()),
            }
        }

        Commands::Show { file } => {
            let element = GrammarElement::from_file(&file)?;
            println!("{}", element);
        }
    }

    Ok(())
}
