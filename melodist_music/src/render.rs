// Audio renderer: score -> MIDI file -> WAV file.
//
// Rendering is two steps with a file in between, the same shape as handing a
// MIDI file to an external synthesizer: the score is serialized to a new MIDI
// file, and that file (read back from disk) is synthesized into a new WAV
// file at a distinct path. Both files are created with create-new semantics
// so an existing output is never overwritten. Any failure along the way is a
// `RenderFailure`; there is no second renderer to fall back to.

use crate::error::{MusicError, Result};
use crate::midi::{MIN_TEMPO_BPM, read_notes, write_midi};
use crate::score::Score;
use crate::synth::{synthesize, to_i16};
use hound::{SampleFormat, WavSpec, WavWriter};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

/// Output sample rate of every rendered waveform.
pub const SAMPLE_RATE: u32 = 44_100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Quarter notes per minute; each score event lasts one quarter.
    pub tempo_bpm: u16,
    /// Peak level of the normalized mix, in (0, 1].
    pub gain: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            tempo_bpm: 120,
            gain: 0.9,
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tempo_bpm < MIN_TEMPO_BPM {
            return Err(MusicError::InvalidConfig(format!(
                "tempo_bpm must be at least {MIN_TEMPO_BPM}, got {}",
                self.tempo_bpm
            )));
        }
        if !(self.gain > 0.0 && self.gain <= 1.0) {
            return Err(MusicError::InvalidConfig(format!(
                "gain must be in (0, 1], got {}",
                self.gain
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct AudioRenderer {
    config: RenderConfig,
}

impl AudioRenderer {
    pub fn new(config: RenderConfig) -> Self {
        AudioRenderer { config }
    }

    /// Write `score` to `midi_path`, then synthesize it to `wav_path`.
    pub fn render(&self, score: &Score, midi_path: &Path, wav_path: &Path) -> Result<()> {
        write_midi(score, self.config.tempo_bpm, midi_path).map_err(|e| match e {
            MusicError::Io(io) => MusicError::render(format!(
                "cannot write score {}: {io}",
                midi_path.display()
            )),
            other => other,
        })?;
        self.synthesize_file(midi_path, wav_path)
    }

    /// Synthesize an existing MIDI file into a new WAV file.
    pub fn synthesize_file(&self, midi_path: &Path, wav_path: &Path) -> Result<()> {
        let bytes = std::fs::read(midi_path).map_err(|e| {
            MusicError::render(format!("cannot read score {}: {e}", midi_path.display()))
        })?;
        let notes = read_notes(&bytes)?;
        let samples = synthesize(&notes, SAMPLE_RATE, self.config.gain)?;
        self.write_wav(&samples, wav_path)?;

        info!(
            notes = notes.len(),
            seconds = samples.len() as f64 / f64::from(SAMPLE_RATE),
            path = %wav_path.display(),
            "rendered waveform"
        );
        Ok(())
    }

    fn write_wav(&self, samples: &[f32], path: &Path) -> Result<()> {
        let spec = WavSpec {
            channels: 1,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| MusicError::render(format!("cannot create {}: {e}", path.display())))?;
        let mut writer = WavWriter::new(BufWriter::new(file), spec).map_err(MusicError::render)?;
        for &s in samples {
            writer.write_sample(to_i16(s)).map_err(MusicError::render)?;
        }
        writer.finalize().map_err(MusicError::render)?;
        Ok(())
    }
}
