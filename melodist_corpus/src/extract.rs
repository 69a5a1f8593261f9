// Corpus token extraction from MIDI files.
//
// Walks a folder of `.mid`/`.midi` files in path order and flattens every
// track into tokens, one per onset: all note-ons that start on the same tick
// form one group. A group with a single distinct pitch becomes its pitch name
// (`C#4`, `E-4`); two or more pitches become the chord's normal order, its
// pitch classes in the most compact rotation, joined with `.` (`0.4.7`).
//
// These are exactly the token shapes the score builder understands, so a
// model trained on the output generates tokens that parse.

use crate::error::{CorpusError, Result};
use melodist_music::token::CHORD_SEPARATOR;
use midly::{MidiMessage, Smf, TrackEventKind};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Pitch-class spellings: sharps for C#, F#, G#; flats (written `-`) for E-
/// and B-.
const PITCH_CLASS_NAMES: [&str; 12] = [
    "C", "C#", "D", "E-", "E", "F", "F#", "G", "G#", "A", "B-", "B",
];

/// Name of a MIDI pitch, e.g. 61 -> `C#4`, 70 -> `B-4`.
pub fn pitch_name(pitch: u8) -> String {
    let octave = i32::from(pitch / 12) - 1;
    format!("{}{octave}", PITCH_CLASS_NAMES[usize::from(pitch % 12)])
}

/// Normal order of a set of pitches: the distinct pitch classes rotated so
/// the span from first to last is smallest. Ties go to the rotation packed
/// tightest toward the start, then to the lowest first pitch class.
pub fn normal_order(pitches: &[u8]) -> Vec<u8> {
    let mut classes: Vec<u8> = pitches.iter().map(|p| p % 12).collect();
    classes.sort_unstable();
    classes.dedup();
    let n = classes.len();
    if n < 2 {
        return classes;
    }

    let rotations = (0..n).map(|start| {
        (0..n)
            .map(|i| classes[(start + i) % n])
            .collect::<Vec<u8>>()
    });
    // Intervals above the first pitch class, outermost first.
    let profile = |rot: &[u8]| -> Vec<u8> {
        rot.iter()
            .skip(1)
            .rev()
            .map(|&pc| (pc + 12 - rot[0]) % 12)
            .collect()
    };
    rotations
        .min_by(|a, b| profile(a).cmp(&profile(b)).then(a[0].cmp(&b[0])))
        .unwrap_or(classes)
}

/// Token for one onset group.
fn group_token(pitches: &[u8]) -> Option<String> {
    let mut distinct = pitches.to_vec();
    distinct.sort_unstable();
    distinct.dedup();
    match distinct.as_slice() {
        [] => None,
        [single] => Some(pitch_name(*single)),
        many => Some(
            normal_order(many)
                .iter()
                .map(u8::to_string)
                .collect::<Vec<_>>()
                .join(&CHORD_SEPARATOR.to_string()),
        ),
    }
}

/// Tokens from one Standard MIDI File, track by track.
pub fn tokens_from_midi(bytes: &[u8]) -> Result<Vec<String>> {
    let smf = Smf::parse(bytes).map_err(|e| CorpusError::Midi(e.to_string()))?;
    let mut tokens = Vec::new();

    for track in &smf.tracks {
        let mut tick: u64 = 0;
        let mut group_tick: u64 = 0;
        let mut group: Vec<u8> = Vec::new();

        for ev in track {
            tick += u64::from(ev.delta.as_int());
            let TrackEventKind::Midi {
                message: MidiMessage::NoteOn { key, vel },
                ..
            } = ev.kind
            else {
                continue;
            };
            if vel.as_int() == 0 {
                continue;
            }
            if !group.is_empty() && tick != group_tick {
                tokens.extend(group_token(&group));
                group.clear();
            }
            group_tick = tick;
            group.push(key.as_int());
        }
        tokens.extend(group_token(&group));
    }

    Ok(tokens)
}

/// MIDI files directly inside `folder`, sorted by path.
pub fn midi_files(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(folder)? {
        let path = entry?.path();
        let is_midi = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("mid") || e.eq_ignore_ascii_case("midi"));
        if is_midi && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Extract tokens from every MIDI file in `folder`. Files that cannot be read
/// or parsed are logged and skipped.
pub fn extract_tokens(folder: &Path) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    for path in midi_files(folder)? {
        let extracted = std::fs::read(&path)
            .map_err(CorpusError::from)
            .and_then(|bytes| tokens_from_midi(&bytes));
        match extracted {
            Ok(found) => {
                info!(path = %path.display(), tokens = found.len(), "extracted tokens");
                tokens.extend(found);
            }
            Err(e) => warn!(path = %path.display(), "skipping file: {e}"),
        }
    }
    Ok(tokens)
}

pub fn save_tokens(tokens: &[String], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string(tokens)?)?;
    Ok(())
}

pub fn load_tokens(path: &Path) -> Result<Vec<String>> {
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

/// Extract `folder` and write the token list to `output`. Writes nothing and
/// returns `NoTokens` if the folder yielded no tokens.
pub fn extract_to_file(folder: &Path, output: &Path) -> Result<usize> {
    let tokens = extract_tokens(folder)?;
    if tokens.is_empty() {
        return Err(CorpusError::NoTokens);
    }
    save_tokens(&tokens, output)?;
    info!(count = tokens.len(), path = %output.display(), "saved tokens");
    Ok(tokens.len())
}
