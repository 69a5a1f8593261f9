// MIDI corpus -> tokens -> trained artifact -> generated audio.

use melodist_corpus::extract::{extract_to_file, load_tokens};
use melodist_corpus::train::{TrainConfig, train_to_files};
use melodist_music::config::GeneratorConfig;
use melodist_music::generate::Generator;
use melodist_music::instrument::Timbre;
use melodist_music::midi::score_to_smf;
use melodist_music::score::{Part, Score};
use melodist_music::token::{Sound, parse_token};

fn write_midi(path: &std::path::Path, events: Vec<Sound>) {
    let score = Score::Single(Part::Solo {
        timbre: Timbre::Guitar,
        events,
    });
    let mut buf = Vec::new();
    score_to_smf(&score, 100).write_std(&mut buf).unwrap();
    std::fs::write(path, buf).unwrap();
}

#[test]
fn trained_corpus_drives_generation() {
    let dir = tempfile::tempdir().unwrap();
    let midi_dir = dir.path().join("midi_data");
    std::fs::create_dir(&midi_dir).unwrap();

    let phrase = || {
        vec![
            Sound::Note(60),
            Sound::Note(62),
            Sound::Chord(vec![60, 64, 67]),
            Sound::Note(65),
            Sound::Note(63),
            Sound::Chord(vec![55, 59, 62]),
        ]
    };
    for i in 0..3 {
        let events = (0..4).flat_map(|_| phrase()).collect();
        write_midi(&midi_dir.join(format!("piece{i}.mid")), events);
    }

    let notes = dir.path().join("notes.json");
    assert_eq!(extract_to_file(&midi_dir, &notes).unwrap(), 72);
    let tokens = load_tokens(&notes).unwrap();
    assert_eq!(&tokens[..6], ["C4", "D4", "0.4.7", "F4", "E-4", "7.11.2"]);
    assert!(tokens.iter().all(|t| parse_token(t).is_ok()));

    let config = GeneratorConfig {
        model_path: dir.path().join("model/model.json"),
        vocab_path: dir.path().join("model/vocab.json"),
        output_dir: dir.path().join("static/audio"),
        seed: Some(5),
        ..GeneratorConfig::default()
    };
    let train_config = TrainConfig {
        window_len: 12,
        order: 3,
    };
    train_to_files(&tokens, &train_config, &config.model_path, &config.vocab_path).unwrap();

    let generator = Generator::open(&config).unwrap();
    let generated = generator.generate(&["Clarinet"], 5).unwrap();
    assert_eq!(generated.label, "Clarinet");
    // Every trained token parses, so no sampled event is dropped.
    assert_eq!(generated.event_count, 10);
    assert!(generated.wav_path.exists());
}
