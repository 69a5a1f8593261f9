// Melodist Music Generator: CLI entry point.
//
// Serves one generation request and prints the JSON response to stdout:
// `{"instrument_label": ..., "path": ...}` on success, `{"error": ...}` with a
// non-zero exit on failure. The request comes either from `--request` (a JSON
// body, parsed as leniently as any inbound request) or from `--length` and
// repeated `--instrument` flags.
//
// Usage:
//   cargo run -p melodist_music --bin generate -- [--config FILE] [--length SECS]
//     [--instrument NAME]... [--request JSON] [--seed N] [--output-dir DIR]
//     [--model PATH] [--vocab PATH]

use clap::Parser;
use melodist_music::config::GeneratorConfig;
use melodist_music::generate::Generator;
use melodist_music::request::{ErrorResponse, GenerationRequest, handle};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "generate")]
#[command(about = "Generate a piece and render it to WAV")]
#[command(version)]
struct Args {
    /// JSON config file; flags below override its values
    #[arg(short, long, env = "MELODIST_CONFIG")]
    config: Option<PathBuf>,

    /// Duration in seconds
    #[arg(short, long)]
    length: Option<i64>,

    /// Instrument name (repeatable); `mixed` alone gives per-note timbres
    #[arg(short, long = "instrument")]
    instruments: Vec<String>,

    /// Raw request body, e.g. '{"length": 30, "instruments": ["Piano"]}'
    #[arg(long, conflicts_with_all = ["length", "instruments"])]
    request: Option<String>,

    /// Fixed seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    output_dir: Option<PathBuf>,

    #[arg(long)]
    model: Option<PathBuf>,

    #[arg(long)]
    vocab: Option<PathBuf>,
}

impl Args {
    fn config(&self) -> melodist_music::Result<GeneratorConfig> {
        let mut config = match &self.config {
            Some(path) => GeneratorConfig::load(path)?,
            None => GeneratorConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(path) = &self.model {
            config.model_path = path.clone();
        }
        if let Some(path) = &self.vocab {
            config.vocab_path = path.clone();
        }
        Ok(config)
    }

    fn request(&self) -> GenerationRequest {
        match &self.request {
            Some(body) => GenerationRequest::from_json(body),
            None => GenerationRequest {
                length: self.length.unwrap_or(GenerationRequest::default().length),
                instruments: self.instruments.clone(),
            },
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("cannot encode response: {e}"),
    }
}

fn fail(err: &melodist_music::MusicError) -> ExitCode {
    print_json(&ErrorResponse::from(err));
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = match args.config() {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let request = args.request();
    info!(
        length = request.length,
        instruments = ?request.instruments,
        output_dir = %config.output_dir.display(),
        "starting"
    );

    let generator = match Generator::open(&config) {
        Ok(g) => g,
        Err(e) => return fail(&e),
    };

    match handle(&generator, &request) {
        Ok(audio) => {
            print_json(&audio);
            ExitCode::SUCCESS
        }
        Err(response) => {
            print_json(&response);
            ExitCode::FAILURE
        }
    }
}
