// Additive synthesizer for rendering timed notes to PCM.
//
// Each timbre in the built-in bank is a small stack of harmonics shaped by an
// ADSR envelope. A note's voice is looked up from the MIDI program it was
// played with; a program that has no voice in the bank is a render failure
// (there is no fallback voice). Notes are mixed into one mono buffer, which
// is peak-normalized before quantization.

use crate::error::{MusicError, Result};
use crate::instrument::Timbre;
use crate::midi::TimedNote;
use std::f32::consts::TAU;

/// Attack-Decay-Sustain-Release envelope, times in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adsr {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl Adsr {
    /// Envelope level `t` seconds after note-on for a note held `held`
    /// seconds. Returns 0 once the release has finished.
    pub fn level(&self, t: f32, held: f32) -> f32 {
        if t < 0.0 {
            return 0.0;
        }
        if t < held {
            return self.held_level(t);
        }
        let from = self.held_level(held);
        let since = t - held;
        if since >= self.release {
            0.0
        } else {
            from * (1.0 - since / self.release)
        }
    }

    fn held_level(&self, t: f32) -> f32 {
        if t < self.attack {
            t / self.attack
        } else if t < self.attack + self.decay {
            let k = (t - self.attack) / self.decay;
            1.0 - k * (1.0 - self.sustain)
        } else {
            self.sustain
        }
    }
}

/// One timbre's recipe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voice {
    /// Relative amplitude of harmonics 1, 2, 3, ...
    pub harmonics: &'static [f32],
    pub envelope: Adsr,
}

const fn adsr(attack: f32, decay: f32, sustain: f32, release: f32) -> Adsr {
    Adsr {
        attack,
        decay,
        sustain,
        release,
    }
}

impl Voice {
    pub fn for_timbre(timbre: Timbre) -> Voice {
        match timbre {
            Timbre::Piano => Voice {
                harmonics: &[1.0, 0.5, 0.25, 0.12, 0.06],
                envelope: adsr(0.005, 0.4, 0.2, 0.3),
            },
            Timbre::Violin => Voice {
                harmonics: &[1.0, 0.6, 0.45, 0.3, 0.2, 0.15],
                envelope: adsr(0.08, 0.1, 0.85, 0.2),
            },
            Timbre::Guitar => Voice {
                harmonics: &[1.0, 0.7, 0.3, 0.2, 0.1],
                envelope: adsr(0.003, 0.3, 0.1, 0.25),
            },
            Timbre::Flute => Voice {
                harmonics: &[1.0, 0.2, 0.05],
                envelope: adsr(0.06, 0.05, 0.9, 0.15),
            },
            Timbre::Trumpet => Voice {
                harmonics: &[1.0, 0.9, 0.7, 0.5, 0.35, 0.2],
                envelope: adsr(0.03, 0.08, 0.8, 0.12),
            },
            Timbre::Clarinet => Voice {
                // Odd harmonics dominate.
                harmonics: &[1.0, 0.05, 0.6, 0.05, 0.35, 0.03, 0.2],
                envelope: adsr(0.04, 0.05, 0.85, 0.12),
            },
            Timbre::Oboe => Voice {
                harmonics: &[0.6, 1.0, 0.8, 0.5, 0.3],
                envelope: adsr(0.03, 0.05, 0.85, 0.1),
            },
            Timbre::Tuba => Voice {
                harmonics: &[1.0, 0.7, 0.3, 0.1],
                envelope: adsr(0.05, 0.1, 0.8, 0.15),
            },
            Timbre::Bassoon => Voice {
                harmonics: &[0.7, 1.0, 0.6, 0.4, 0.2],
                envelope: adsr(0.04, 0.08, 0.8, 0.12),
            },
        }
    }

    /// Voice for a MIDI program, if the bank has one.
    pub fn for_program(program: u8) -> Option<Voice> {
        Timbre::from_program(program).map(Voice::for_timbre)
    }

    /// Sample at fundamental `freq`, `t` seconds into a note held `held`
    /// seconds.
    fn sample(&self, freq: f32, t: f32, held: f32) -> f32 {
        let env = self.envelope.level(t, held);
        if env == 0.0 {
            return 0.0;
        }
        let norm: f32 = self.harmonics.iter().sum();
        let mut acc = 0.0;
        for (h, &amp) in self.harmonics.iter().enumerate() {
            acc += amp * (TAU * freq * (h as f32 + 1.0) * t).sin();
        }
        env * acc / norm
    }
}

/// Equal-tempered frequency, A4 = 440 Hz.
pub fn midi_to_freq(pitch: u8) -> f32 {
    440.0 * 2.0_f32.powf((f32::from(pitch) - 69.0) / 12.0)
}

/// Mix notes into a mono buffer at `sample_rate`, peak-normalized to `gain`.
pub fn synthesize(notes: &[TimedNote], sample_rate: u32, gain: f32) -> Result<Vec<f32>> {
    if sample_rate == 0 {
        return Err(MusicError::render("sample rate must be positive"));
    }
    let rate = sample_rate as f64;

    let mut voiced = Vec::with_capacity(notes.len());
    for note in notes {
        let voice = Voice::for_program(note.program).ok_or_else(|| {
            MusicError::render(format!("no voice for MIDI program {}", note.program))
        })?;
        voiced.push((note, voice));
    }

    let end_secs = voiced
        .iter()
        .map(|(n, v)| n.end_secs + f64::from(v.envelope.release))
        .fold(0.0, f64::max);
    let mut buffer = vec![0.0f32; (end_secs * rate).ceil() as usize];

    for (note, voice) in voiced {
        let freq = midi_to_freq(note.pitch);
        let held = (note.end_secs - note.start_secs).max(0.0) as f32;
        let first = (note.start_secs * rate).round() as usize;
        let last = ((note.end_secs + f64::from(voice.envelope.release)) * rate).ceil() as usize;
        let end = last.min(buffer.len());
        for (i, slot) in buffer.iter_mut().enumerate().take(end).skip(first) {
            let t = ((i - first) as f64 / rate) as f32;
            *slot += voice.sample(freq, t, held);
        }
    }

    let peak = buffer.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    if peak > 0.0 {
        let scale = gain / peak;
        for s in &mut buffer {
            *s *= scale;
        }
    }
    Ok(buffer)
}

/// Quantize a [-1, 1] sample to 16-bit PCM.
pub fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(pitch: u8, program: u8, start: f64, end: f64) -> TimedNote {
        TimedNote {
            pitch,
            program,
            start_secs: start,
            end_secs: end,
        }
    }

    #[test]
    fn a4_is_440() {
        assert!((midi_to_freq(69) - 440.0).abs() < 1e-3);
        assert!((midi_to_freq(60) - 261.63).abs() < 0.01);
    }

    #[test]
    fn envelope_shape() {
        let env = adsr(0.1, 0.1, 0.5, 0.2);
        assert_eq!(env.level(-0.1, 1.0), 0.0);
        assert!((env.level(0.05, 1.0) - 0.5).abs() < 1e-6);
        assert!((env.level(0.5, 1.0) - 0.5).abs() < 1e-6);
        assert!((env.level(1.1, 1.0) - 0.25).abs() < 1e-6);
        assert_eq!(env.level(1.3, 1.0), 0.0);
    }

    #[test]
    fn every_timbre_has_a_voice() {
        for t in Timbre::ALL {
            assert!(Voice::for_program(t.program()).is_some());
        }
    }

    #[test]
    fn buffer_covers_notes_and_release() {
        let notes = [note(60, 0, 0.0, 0.5), note(64, 0, 0.5, 1.0)];
        let buf = synthesize(&notes, 8000, 0.9).unwrap();
        let release = Voice::for_timbre(Timbre::Piano).envelope.release as f64;
        assert_eq!(buf.len(), ((1.0 + release) * 8000.0).ceil() as usize);
        let peak = buf.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!((peak - 0.9).abs() < 1e-4);
    }

    #[test]
    fn unknown_program_is_render_failure() {
        let notes = [note(60, 127, 0.0, 0.5)];
        assert!(matches!(
            synthesize(&notes, 8000, 0.9),
            Err(MusicError::RenderFailure(_))
        ));
    }

    #[test]
    fn no_notes_renders_empty_buffer() {
        assert!(synthesize(&[], 44_100, 0.9).unwrap().is_empty());
    }

    #[test]
    fn quantization_clamps() {
        assert_eq!(to_i16(2.0), i16::MAX);
        assert_eq!(to_i16(-2.0), -i16::MAX);
        assert_eq!(to_i16(0.0), 0);
    }
}
