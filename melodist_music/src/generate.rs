// Generation orchestrator.
//
// Turns a request (instrument names + length in seconds) into a rendered
// waveform:
//
//   1. token budget: two tokens per second, never fewer than ten; requests
//      longer than the configured maximum are refused before any work;
//   2. routing: no names gives one part with a random timbre, the lone
//      sentinel `mixed` gives one mixed part, otherwise each name gets its
//      own independently sampled part;
//   3. per part: sampler -> score builder;
//   4. merge parts into one score, render MIDI + WAV under a fresh UUID;
//   5. confirm the WAV landed on disk and report its path and the label of
//      the instruments actually used.
//
// The model artifact is loaded once in `Generator::open` and shared
// read-only; everything else belongs to a single request. The request's UUID
// names the output files and, unless a fixed seed is configured, seeds its
// random source.

use crate::artifact::ModelArtifact;
use crate::config::GeneratorConfig;
use crate::error::{MusicError, Result};
use crate::instrument::{InstrumentPolicy, MIXED_SENTINEL};
use crate::model::SequenceModel;
use crate::render::AudioRenderer;
use crate::sampler::sample_tokens;
use crate::score::{Score, build_part};
use crate::vocab::Vocabulary;
use melodist_prng::{RandomSource, SeededRng};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Seconds of audio per sampled token.
pub const SECONDS_PER_TOKEN: f64 = 0.5;

/// Fewest tokens sampled per part, however short the request.
pub const MIN_TOKENS: usize = 10;

/// Token budget for a requested duration.
pub fn note_count(length_seconds: i64) -> usize {
    let wanted = (length_seconds as f64 / SECONDS_PER_TOKEN).round();
    if wanted <= MIN_TOKENS as f64 {
        MIN_TOKENS
    } else {
        wanted as usize
    }
}

/// One policy per part to sample.
pub fn plan_parts<S: AsRef<str>>(instrument_names: &[S]) -> Vec<InstrumentPolicy> {
    match instrument_names {
        [] => vec![InstrumentPolicy::Random],
        [only] if only.as_ref().trim().eq_ignore_ascii_case(MIXED_SENTINEL) => {
            vec![InstrumentPolicy::Mixed]
        }
        names => names
            .iter()
            .map(|n| InstrumentPolicy::from_name(n.as_ref()))
            .collect(),
    }
}

/// Sample and build every part of a request. Returns the merged score and
/// the comma-joined label of the parts in request order.
pub fn compose<S: AsRef<str>>(
    model: &dyn SequenceModel,
    vocabulary: &Vocabulary,
    instrument_names: &[S],
    token_count: usize,
    rng: &mut impl RandomSource,
) -> Result<(Score, String)> {
    let mut parts = Vec::new();
    let mut labels = Vec::new();
    for policy in plan_parts(instrument_names) {
        let tokens = sample_tokens(model, vocabulary, token_count, rng)?;
        let (part, label) = build_part(&tokens, policy, rng);
        info!(label = %label, events = part.len(), "built part");
        parts.push(part);
        labels.push(label);
    }
    Ok((Score::merge(parts), labels.join(", ")))
}

/// Fail with `OutputMissing` unless the renderer's waveform is on disk.
fn confirm_output(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(MusicError::OutputMissing(path.to_path_buf()))
    }
}

/// What one successful request produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub request_id: Uuid,
    pub wav_path: PathBuf,
    pub midi_path: PathBuf,
    /// Instruments actually used, e.g. `Piano, Flute` or `Mixed`.
    pub label: String,
    pub part_count: usize,
    pub event_count: usize,
}

pub struct Generator {
    artifact: Arc<ModelArtifact>,
    renderer: AudioRenderer,
    output_dir: PathBuf,
    seed: Option<u64>,
    max_length_seconds: i64,
}

impl Generator {
    /// Load the artifact named by `config`. Fails with `ArtifactMissing`
    /// before anything is sampled.
    pub fn open(config: &GeneratorConfig) -> Result<Self> {
        config.validate()?;
        let artifact = ModelArtifact::load(&config.model_path, &config.vocab_path)?;
        Self::with_artifact(Arc::new(artifact), config)
    }

    /// Build around an already loaded artifact.
    pub fn with_artifact(artifact: Arc<ModelArtifact>, config: &GeneratorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Generator {
            artifact,
            renderer: AudioRenderer::new(config.render.clone()),
            output_dir: config.output_dir.clone(),
            seed: config.seed,
            max_length_seconds: config.max_length_seconds,
        })
    }

    /// Serve one request with a fresh id and its own random source.
    pub fn generate<S: AsRef<str>>(
        &self,
        instrument_names: &[S],
        length_seconds: i64,
    ) -> Result<Generated> {
        let request_id = Uuid::new_v4();
        let seed = self.seed.unwrap_or(request_id.as_u128() as u64);
        let mut rng = SeededRng::new(seed);
        self.generate_with(request_id, instrument_names, length_seconds, &mut rng)
    }

    /// Serve one request with a caller-supplied id and random source.
    pub fn generate_with<S: AsRef<str>>(
        &self,
        request_id: Uuid,
        instrument_names: &[S],
        length_seconds: i64,
        rng: &mut impl RandomSource,
    ) -> Result<Generated> {
        if length_seconds > self.max_length_seconds {
            return Err(MusicError::LengthTooLong {
                requested: length_seconds,
                max: self.max_length_seconds,
            });
        }
        let token_count = note_count(length_seconds);
        info!(
            %request_id,
            length_seconds,
            token_count,
            instruments = instrument_names.len(),
            "generating"
        );

        let (score, label) = compose(
            self.artifact.model(),
            self.artifact.vocabulary(),
            instrument_names,
            token_count,
            rng,
        )?;

        std::fs::create_dir_all(&self.output_dir)?;
        let midi_path = self.output_dir.join(format!("generated_{request_id}.mid"));
        let wav_path = self.output_dir.join(format!("generated_{request_id}.wav"));
        self.renderer.render(&score, &midi_path, &wav_path)?;
        confirm_output(&wav_path)?;

        info!(%request_id, label = %label, path = %wav_path.display(), "generation complete");
        Ok(Generated {
            request_id,
            wav_path,
            midi_path,
            label,
            part_count: score.parts().len(),
            event_count: score.event_count(),
        })
    }
}

/// Load the artifact and serve a single request.
pub fn generate_and_save<S: AsRef<str>>(
    config: &GeneratorConfig,
    instrument_names: &[S],
    length_seconds: i64,
) -> Result<Generated> {
    Generator::open(config)?.generate(instrument_names, length_seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::Timbre;
    use crate::model::BackoffModel;
    use crate::score::Part;

    fn artifact() -> ModelArtifact {
        let corpus = ["C4", "E4", "G4", "0.4.7", "D4", "F4", "A4", "2.5.9", "junk"];
        let vocab = Vocabulary::from_corpus(&corpus);
        let seq: Vec<usize> = (0..60)
            .map(|i| vocab.index_of(corpus[i % corpus.len()]).unwrap())
            .collect();
        let mut model = BackoffModel::new(4, vocab.size(), 2);
        for i in 0..seq.len() - 4 {
            model.observe(&seq[i..i + 4], seq[i + 4]);
        }
        ModelArtifact::new(model, vocab).unwrap()
    }

    #[test]
    fn token_budget() {
        assert_eq!(note_count(1), 10);
        assert_eq!(note_count(5), 10);
        assert_eq!(note_count(6), 12);
        assert_eq!(note_count(60), 120);
        assert_eq!(note_count(0), 10);
        assert_eq!(note_count(-30), 10);
        assert_eq!(note_count(i64::MIN), 10);
        let mut last = 0;
        for secs in -10..200 {
            let n = note_count(secs);
            assert!(n >= last && n >= 10);
            last = n;
        }
    }

    #[test]
    fn routing() {
        let none: [&str; 0] = [];
        assert_eq!(plan_parts(&none), vec![InstrumentPolicy::Random]);
        assert_eq!(plan_parts(&["mixed"]), vec![InstrumentPolicy::Mixed]);
        assert_eq!(
            plan_parts(&["Piano", "UnknownInstr", "Piano"]),
            vec![
                InstrumentPolicy::Named(Timbre::Piano),
                InstrumentPolicy::Random,
                InstrumentPolicy::Named(Timbre::Piano),
            ]
        );
        assert_eq!(
            plan_parts(&["mixed", "Tuba"]),
            vec![InstrumentPolicy::Mixed, InstrumentPolicy::Named(Timbre::Tuba)]
        );
    }

    #[test]
    fn empty_request_builds_one_random_timbre_part() {
        let art = artifact();
        let none: [&str; 0] = [];
        for seed in 0..20 {
            let mut rng = SeededRng::new(seed);
            let (score, label) =
                compose(art.model(), art.vocabulary(), &none, 10, &mut rng).unwrap();
            assert_eq!(score.parts().len(), 1);
            assert_ne!(label, "Mixed");
            assert!(Timbre::ALL.iter().any(|t| t.name() == label));
            assert!(matches!(score, Score::Single(Part::Solo { .. })));
        }
    }

    #[test]
    fn lone_sentinel_builds_one_mixed_part() {
        let art = artifact();
        let mut rng = SeededRng::new(4);
        let (score, label) =
            compose(art.model(), art.vocabulary(), &["MIXED"], 10, &mut rng).unwrap();
        assert_eq!(label, "Mixed");
        assert!(matches!(score, Score::Single(Part::Mixed { .. })));
    }

    #[test]
    fn unknown_name_falls_back_to_random_timbre() {
        let art = artifact();
        for seed in 0..10 {
            let mut rng = SeededRng::new(seed);
            let (score, label) = compose(
                art.model(),
                art.vocabulary(),
                &["Piano", "UnknownInstr"],
                12,
                &mut rng,
            )
            .unwrap();
            assert_eq!(score.parts().len(), 2);
            let fallback = score.parts()[1].nominal_timbre();
            assert_eq!(label, format!("Piano, {fallback}"));
            assert_eq!(score.parts()[0].nominal_timbre(), Timbre::Piano);
        }
    }

    #[test]
    fn duplicate_names_are_sampled_independently() {
        let art = artifact();
        let mut rng = SeededRng::new(21);
        let (score, label) = compose(
            art.model(),
            art.vocabulary(),
            &["Oboe", "Oboe"],
            10,
            &mut rng,
        )
        .unwrap();
        assert_eq!(label, "Oboe, Oboe");
        assert_eq!(score.parts().len(), 2);
    }

    #[test]
    fn generate_writes_uniquely_named_pair() {
        let dir = tempfile::tempdir().unwrap();
        let config = GeneratorConfig {
            output_dir: dir.path().join("audio"),
            seed: Some(3),
            ..GeneratorConfig::default()
        };
        let generator = Generator::with_artifact(Arc::new(artifact()), &config).unwrap();

        let a = generator.generate(&["Flute"], 1).unwrap();
        let b = generator.generate(&["Flute"], 1).unwrap();
        assert_ne!(a.wav_path, b.wav_path);
        assert_ne!(a.midi_path, a.wav_path);
        assert!(a.wav_path.exists() && a.midi_path.exists());
        assert_eq!(a.label, "Flute");
        assert_eq!(a.part_count, 1);
        let name = a.wav_path.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(name, format!("generated_{}.wav", a.request_id));
    }

    #[test]
    fn over_long_request_is_refused_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let config = GeneratorConfig {
            output_dir: dir.path().join("audio"),
            max_length_seconds: 30,
            ..GeneratorConfig::default()
        };
        let generator = Generator::with_artifact(Arc::new(artifact()), &config).unwrap();
        for length in [31, 86_400, i64::MAX] {
            match generator.generate(&["Piano"], length) {
                Err(MusicError::LengthTooLong { requested, max }) => {
                    assert_eq!((requested, max), (length, 30));
                }
                other => panic!("expected LengthTooLong, got {other:?}"),
            }
        }
        assert!(!config.output_dir.exists());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = GeneratorConfig {
            max_length_seconds: 0,
            ..GeneratorConfig::default()
        };
        assert!(matches!(
            Generator::with_artifact(Arc::new(artifact()), &config),
            Err(MusicError::InvalidConfig(_))
        ));
    }

    #[test]
    fn absent_waveform_is_output_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("generated_x.wav");
        match confirm_output(&path) {
            Err(MusicError::OutputMissing(p)) => assert_eq!(p, path),
            other => panic!("expected OutputMissing, got {other:?}"),
        }
        // A directory at the output path is not a waveform either.
        std::fs::create_dir(&path).unwrap();
        assert!(matches!(
            confirm_output(&path),
            Err(MusicError::OutputMissing(_))
        ));
        std::fs::remove_dir(&path).unwrap();
        std::fs::write(&path, b"RIFF").unwrap();
        assert!(confirm_output(&path).is_ok());
    }

    #[test]
    fn open_without_artifact_fails_before_sampling() {
        let dir = tempfile::tempdir().unwrap();
        let config = GeneratorConfig {
            model_path: dir.path().join("model.json"),
            vocab_path: dir.path().join("vocab.json"),
            output_dir: dir.path().join("audio"),
            ..GeneratorConfig::default()
        };
        let err = generate_and_save(&config, &["Piano"], 10).unwrap_err();
        assert!(matches!(err, MusicError::ArtifactMissing(_)));
        assert!(!config.output_dir.exists());
    }
}
