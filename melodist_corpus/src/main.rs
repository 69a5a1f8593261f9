// Melodist corpus CLI.
//
// Usage:
//   cargo run -p melodist_corpus --bin corpus -- extract [--midi-folder DIR] [--output FILE]
//   cargo run -p melodist_corpus --bin corpus -- train [--notes FILE]
//     [--model-out FILE] [--vocab-out FILE] [--window-len N] [--order N]

use clap::{Parser, Subcommand};
use melodist_corpus::CorpusError;
use melodist_corpus::extract::{extract_to_file, load_tokens};
use melodist_corpus::train::{TrainConfig, train_to_files};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "corpus")]
#[command(about = "Prepare the Melodist model artifact from a MIDI corpus")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract note and chord tokens from a folder of MIDI files
    Extract {
        #[arg(long, default_value = "midi_data")]
        midi_folder: PathBuf,

        #[arg(long, default_value = "notes.json")]
        output: PathBuf,
    },
    /// Train the backoff model on an extracted token list
    Train {
        #[arg(long, default_value = "notes.json")]
        notes: PathBuf,

        #[arg(long, default_value = "model/model.json")]
        model_out: PathBuf,

        #[arg(long, default_value = "model/vocab.json")]
        vocab_out: PathBuf,

        #[arg(long)]
        window_len: Option<usize>,

        #[arg(long)]
        order: Option<usize>,
    },
}

fn run(command: Command) -> melodist_corpus::Result<()> {
    match command {
        Command::Extract {
            midi_folder,
            output,
        } => {
            let count = extract_to_file(&midi_folder, &output)?;
            info!("saved {count} tokens to {}", output.display());
        }
        Command::Train {
            notes,
            model_out,
            vocab_out,
            window_len,
            order,
        } => {
            let defaults = TrainConfig::default();
            let config = TrainConfig {
                window_len: window_len.unwrap_or(defaults.window_len),
                order: order.unwrap_or(defaults.order),
            };
            let tokens = load_tokens(&notes)?;
            train_to_files(&tokens, &config, &model_out, &vocab_out)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(Args::parse().command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CorpusError::NoTokens) => {
            warn!("no tokens extracted; check your MIDI files");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
