// MIDI output from scores, and reading it back for synthesis.
//
// Converts a Score into a Standard MIDI File (SMF) for playback and for the
// synthesizer. Track 0 carries the tempo; each part maps to its own track on
// its own channel (the percussion channel 9 is skipped). Every event lasts one
// quarter note and follows the previous one directly. Mixed parts emit a
// program change in front of every event so the per-event timbre survives in
// the file.
//
// The reader goes the other way: it flattens an SMF into absolute-time notes
// with the program that was active on their channel at note-on. Only
// metrical timing and a single tempo are supported, which is all the writer
// ever produces.
//
// Uses the `midly` crate. Output is SMF Format 1 (multi-track).

use crate::error::{MusicError, Result};
use crate::score::Score;
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Ticks per quarter note in MIDI output.
pub const TICKS_PER_QUARTER: u16 = 480;

/// Velocity of every note-on.
const VELOCITY: u8 = 80;

/// Slowest tempo whose microseconds-per-quarter fits the 24-bit tempo field.
pub const MIN_TEMPO_BPM: u16 = 4;

/// Microseconds per quarter note when a file carries no tempo event.
const DEFAULT_TEMPO_US: u32 = 500_000;

const PERCUSSION_CHANNEL: u8 = 9;

/// Channel for the n-th part: 0..=15 skipping 9, wrapping after 15 parts.
fn channel_for(part_index: usize) -> u4 {
    let usable: Vec<u8> = (0..16u8).filter(|&c| c != PERCUSSION_CHANNEL).collect();
    u4::new(usable[part_index % usable.len()])
}

/// Convert a Score to MIDI and write it to a new file. Fails if the file
/// already exists.
pub fn write_midi(score: &Score, tempo_bpm: u16, path: &Path) -> Result<()> {
    let smf = score_to_smf(score, tempo_bpm);
    let mut buf = Vec::new();
    smf.write_std(&mut buf)?;
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(&buf)?;
    Ok(())
}

fn note_event(channel: u4, delta: u32, message: MidiMessage) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Midi { channel, message },
    }
}

/// Convert a Score to an in-memory SMF.
pub fn score_to_smf(score: &Score, tempo_bpm: u16) -> Smf<'static> {
    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));

    // Track 0: tempo track
    let tempo_us = 60_000_000 / u32::from(tempo_bpm.max(MIN_TEMPO_BPM));
    smf.tracks.push(vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo_us))),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        },
    ]);

    for (pi, part) in score.parts().iter().enumerate() {
        let channel = channel_for(pi);
        let mut track: Track<'static> = Vec::new();

        track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::TrackName(part.track_name().as_bytes())),
        });
        let nominal = part.nominal_timbre();
        track.push(note_event(
            channel,
            0,
            MidiMessage::ProgramChange {
                program: u7::new(nominal.program()),
            },
        ));

        let mut current = nominal;
        for (sound, timbre) in part.events() {
            if timbre != current {
                track.push(note_event(
                    channel,
                    0,
                    MidiMessage::ProgramChange {
                        program: u7::new(timbre.program()),
                    },
                ));
                current = timbre;
            }

            let pitches = sound.pitches();
            for &pitch in pitches {
                track.push(note_event(
                    channel,
                    0,
                    MidiMessage::NoteOn {
                        key: u7::new(pitch),
                        vel: u7::new(VELOCITY),
                    },
                ));
            }
            // First note-off carries the full beat; the rest land with it.
            for (i, &pitch) in pitches.iter().enumerate() {
                let delta = if i == 0 { u32::from(TICKS_PER_QUARTER) } else { 0 };
                track.push(note_event(
                    channel,
                    delta,
                    MidiMessage::NoteOff {
                        key: u7::new(pitch),
                        vel: u7::new(0),
                    },
                ));
            }
        }

        track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });
        smf.tracks.push(track);
    }

    smf
}

/// One sounding note read back from a MIDI file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedNote {
    pub pitch: u8,
    pub program: u8,
    pub start_secs: f64,
    pub end_secs: f64,
}

/// Parse SMF bytes into timed notes, sorted by start time.
pub fn read_notes(bytes: &[u8]) -> Result<Vec<TimedNote>> {
    let smf = Smf::parse(bytes).map_err(|e| MusicError::render(format!("malformed MIDI: {e}")))?;
    let ticks_per_quarter = match smf.header.timing {
        Timing::Metrical(t) if t.as_int() > 0 => f64::from(t.as_int()),
        Timing::Metrical(_) => return Err(MusicError::render("MIDI has zero ticks per beat")),
        Timing::Timecode(..) => return Err(MusicError::render("SMPTE timing is not supported")),
    };

    let tempo_us = smf
        .tracks
        .iter()
        .flatten()
        .find_map(|ev| match ev.kind {
            TrackEventKind::Meta(MetaMessage::Tempo(t)) => Some(t.as_int()),
            _ => None,
        })
        .unwrap_or(DEFAULT_TEMPO_US);
    let secs_per_tick = f64::from(tempo_us) / 1_000_000.0 / ticks_per_quarter;

    let mut notes = Vec::new();
    for track in &smf.tracks {
        let mut tick: u64 = 0;
        let mut programs = [0u8; 16];
        // (channel, key) -> (start tick, program at note-on)
        let mut sounding: Vec<(u8, u8, u64, u8)> = Vec::new();

        for ev in track {
            tick += u64::from(ev.delta.as_int());
            let TrackEventKind::Midi { channel, message } = ev.kind else {
                continue;
            };
            let ch = channel.as_int();
            match message {
                MidiMessage::ProgramChange { program } => programs[ch as usize] = program.as_int(),
                MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                    sounding.push((ch, key.as_int(), tick, programs[ch as usize]));
                }
                MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                    let key = key.as_int();
                    let held = sounding.iter().position(|&(c, k, _, _)| c == ch && k == key);
                    if let Some(pos) = held {
                        let (_, _, start, program) = sounding.remove(pos);
                        notes.push(TimedNote {
                            pitch: key,
                            program,
                            start_secs: start as f64 * secs_per_tick,
                            end_secs: tick as f64 * secs_per_tick,
                        });
                    }
                }
                _ => {}
            }
        }

        // Notes never released end with their track.
        for (_, key, start, program) in sounding {
            notes.push(TimedNote {
                pitch: key,
                program,
                start_secs: start as f64 * secs_per_tick,
                end_secs: tick as f64 * secs_per_tick,
            });
        }
    }

    notes.sort_by(|a, b| a.start_secs.total_cmp(&b.start_secs));
    Ok(notes)
}
