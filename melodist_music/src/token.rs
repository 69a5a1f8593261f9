// Token grammar: turning vocabulary strings into sounding events.
//
// A token is either a named pitch (`C4`, `F#3`, `B-2`, with `-` for flat the
// way the corpus extractor spells it) or a chord written as dot-joined pitch
// class offsets (`0.4.7`). Offsets, and bare integers that fail to parse as a
// named pitch, resolve relative to middle C: MIDI pitch `60 + offset`.
//
// Malformed input never fails a build. A bad chord member is dropped from
// its chord; a bad single-note token is dropped from the part. Both come back
// as `TokenSkip` so the caller can log them, and are otherwise discarded.

use thiserror::Error;

/// Base pitch for relative offsets (middle C).
pub const OFFSET_BASE: i32 = 60;

/// Separator between chord members.
pub const CHORD_SEPARATOR: char = '.';

/// One resolved musical event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sound {
    Note(u8),
    Chord(Vec<u8>),
}

impl Sound {
    pub fn pitches(&self) -> &[u8] {
        match self {
            Sound::Note(p) => std::slice::from_ref(p),
            Sound::Chord(ps) => ps,
        }
    }
}

/// A token (or chord member) that was recovered by omission.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("skipped token `{token}`: {reason}")]
pub struct TokenSkip {
    pub token: String,
    pub reason: &'static str,
}

impl TokenSkip {
    fn new(token: &str, reason: &'static str) -> Self {
        TokenSkip {
            token: token.to_string(),
            reason,
        }
    }
}

/// Parse one token. `Ok` carries the event plus any chord members that were
/// dropped along the way.
pub fn parse_token(token: &str) -> Result<(Sound, Vec<TokenSkip>), TokenSkip> {
    if token.contains(CHORD_SEPARATOR) {
        let mut pitches = Vec::new();
        let mut skipped = Vec::new();
        for member in token.split(CHORD_SEPARATOR) {
            match parse_offset(member) {
                Some(p) => pitches.push(p),
                None => skipped.push(TokenSkip::new(member, "chord member is not an offset")),
            }
        }
        if pitches.is_empty() {
            return Err(TokenSkip::new(token, "chord has no valid members"));
        }
        return Ok((Sound::Chord(pitches), skipped));
    }

    parse_pitch_name(token)
        .or_else(|| parse_offset(token))
        .map(|p| (Sound::Note(p), Vec::new()))
        .ok_or_else(|| TokenSkip::new(token, "neither a pitch name nor an offset"))
}

/// `60 + n` for an integer `n`, if that lands in MIDI range.
pub fn parse_offset(text: &str) -> Option<u8> {
    let offset: i32 = text.trim().parse().ok()?;
    midi_in_range(OFFSET_BASE.checked_add(offset)?)
}

/// Parse a pitch name: letter A-G, any number of `#` (sharp) or `-`/`b`
/// (flat), then an optional octave (default 4). C4 is MIDI 60.
pub fn parse_pitch_name(text: &str) -> Option<u8> {
    let text = text.trim();
    let mut chars = text.char_indices();
    let (_, letter) = chars.next()?;
    let pitch_class: i32 = match letter {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let mut alter = 0i32;
    let mut octave_start = text.len();
    for (i, c) in chars {
        match c {
            '#' => alter += 1,
            '-' | 'b' => alter -= 1,
            _ => {
                octave_start = i;
                break;
            }
        }
    }

    let octave_text = &text[octave_start..];
    let octave: i32 = if octave_text.is_empty() {
        4
    } else {
        octave_text.parse().ok()?
    };

    let midi = octave
        .checked_add(1)?
        .checked_mul(12)?
        .checked_add(pitch_class + alter)?;
    midi_in_range(midi)
}

fn midi_in_range(value: i32) -> Option<u8> {
    u8::try_from(value).ok().filter(|&p| p <= 127)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sound(token: &str) -> Option<Sound> {
        parse_token(token).ok().map(|(s, _)| s)
    }

    #[test]
    fn chord_offsets_resolve_from_middle_c() {
        assert_eq!(sound("3.7.11"), Some(Sound::Chord(vec![63, 67, 71])));
        assert_eq!(sound("0.4.7"), Some(Sound::Chord(vec![60, 64, 67])));
    }

    #[test]
    fn bad_chord_member_is_dropped() {
        let (s, skipped) = parse_token("3.x.11").unwrap();
        assert_eq!(s, Sound::Chord(vec![63, 71]));
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].token, "x");
    }

    #[test]
    fn chord_without_valid_members_is_skipped() {
        assert!(parse_token("x.y").is_err());
        assert!(parse_token(".").is_err());
    }

    #[test]
    fn named_pitches() {
        assert_eq!(parse_pitch_name("C4"), Some(60));
        assert_eq!(parse_pitch_name("A4"), Some(69));
        assert_eq!(parse_pitch_name("F#3"), Some(54));
        assert_eq!(parse_pitch_name("B-2"), Some(46));
        assert_eq!(parse_pitch_name("Eb5"), Some(75));
        assert_eq!(parse_pitch_name("C##4"), Some(62));
        assert_eq!(parse_pitch_name("G"), Some(67));
        assert_eq!(parse_pitch_name("C-1"), Some(23));
        assert_eq!(parse_pitch_name("H4"), None);
        assert_eq!(parse_pitch_name("C4x"), None);
        assert_eq!(parse_pitch_name("G9"), Some(127));
        assert_eq!(parse_pitch_name("A9"), None);
    }

    #[test]
    fn single_note_falls_back_to_offset() {
        assert_eq!(sound("C4"), Some(Sound::Note(60)));
        assert_eq!(sound("5"), Some(Sound::Note(65)));
        assert_eq!(sound("-12"), Some(Sound::Note(48)));
    }

    #[test]
    fn unparseable_single_note_is_skipped() {
        let err = parse_token("rest").unwrap_err();
        assert_eq!(err.token, "rest");
        assert!(parse_token("").is_err());
        assert!(parse_token("500").is_err());
    }

    #[test]
    fn pitches_view() {
        assert_eq!(Sound::Note(60).pitches(), &[60]);
        assert_eq!(Sound::Chord(vec![60, 64]).pitches(), &[60, 64]);
    }
}
