/// Sound engine: procedural chiptune cues via rodio.
///
/// Every cue is rendered once at init into an in-memory WAV buffer.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// Compile without the "sound" feature to disable audio entirely
/// (the stub SoundEngine does nothing).

use crate::sim::event::GameEvent;

/// One sound per kind of thing that happens on the track.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cue {
    Lane,
    Gate,
    Hit,
    Strike,
    Victory,
    Defeat,
}

#[cfg_attr(not(feature = "sound"), allow(dead_code))]
const CUE_COUNT: usize = 6;

pub fn cue_for(event: &GameEvent) -> Option<Cue> {
    match event {
        GameEvent::LaneChanged { .. } => Some(Cue::Lane),
        GameEvent::GateApplied { .. } => Some(Cue::Gate),
        GameEvent::ObstacleHit { .. } => Some(Cue::Hit),
        GameEvent::EnemyStruck { .. } => Some(Cue::Strike),
        GameEvent::LevelCleared { .. } => Some(Cue::Victory),
        GameEvent::ArmyDefeated { .. } => Some(Cue::Defeat),
        GameEvent::EnemyEngaged => None,
    }
}

#[cfg(feature = "sound")]
mod inner {
    use std::f32::consts::TAU;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};
    use tracing::debug;

    use super::{Cue, CUE_COUNT};

    const SAMPLE_RATE: u32 = 22050;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        buffers: [Arc<Vec<u8>>; CUE_COUNT],
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    debug!(error = %e, "no audio output, sound disabled");
                    return None;
                }
            };
            let buffers = [Cue::Lane, Cue::Gate, Cue::Hit, Cue::Strike, Cue::Victory, Cue::Defeat]
                .map(|cue| Arc::new(make_wav(&render(score(cue)))));
            Some(SoundEngine { _stream: stream, handle, buffers })
        }

        pub fn play(&self, cue: Cue) {
            let buf = &self.buffers[cue as usize];
            if let Ok(sink) = Sink::try_new(&self.handle) {
                if let Ok(src) = rodio::Decoder::new(Cursor::new(buf.as_ref().clone())) {
                    sink.append(src);
                    sink.detach();
                }
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Synth
    // ════════════════════════════════════════════════════════════

    #[derive(Clone, Copy)]
    enum Wave {
        Sine,
        Square,
        Noise,
    }

    /// A single note, optionally sliding in pitch.
    #[derive(Clone, Copy)]
    struct Note {
        from: f32,
        to: f32,
        secs: f32,
        wave: Wave,
        volume: f32,
    }

    const fn note(freq: f32, secs: f32, wave: Wave, volume: f32) -> Note {
        Note { from: freq, to: freq, secs, wave, volume }
    }

    const fn slide(from: f32, to: f32, secs: f32, wave: Wave, volume: f32) -> Note {
        Note { from, to, secs, wave, volume }
    }

    use Wave::*;

    const LANE: &[Note] = &[slide(500.0, 700.0, 0.04, Sine, 0.15)];
    // C6 E6 G6
    const GATE: &[Note] = &[
        note(1047.0, 0.04, Square, 0.15),
        note(1319.0, 0.04, Square, 0.15),
        note(1568.0, 0.06, Square, 0.15),
    ];
    const HIT: &[Note] = &[slide(300.0, 120.0, 0.14, Noise, 0.3)];
    const STRIKE: &[Note] = &[slide(180.0, 90.0, 0.07, Square, 0.2)];
    // C5 E5 G5 C6, last one held
    const VICTORY: &[Note] = &[
        note(523.0, 0.1, Square, 0.2),
        note(659.0, 0.1, Square, 0.2),
        note(784.0, 0.1, Square, 0.2),
        note(1047.0, 0.3, Sine, 0.3),
    ];
    // A4 F#4 Eb4 C4
    const DEFEAT: &[Note] = &[
        note(440.0, 0.12, Sine, 0.3),
        note(370.0, 0.12, Sine, 0.3),
        note(311.0, 0.12, Sine, 0.3),
        slide(261.0, 200.0, 0.3, Sine, 0.3),
    ];

    fn score(cue: Cue) -> &'static [Note] {
        match cue {
            Cue::Lane => LANE,
            Cue::Gate => GATE,
            Cue::Hit => HIT,
            Cue::Strike => STRIKE,
            Cue::Victory => VICTORY,
            Cue::Defeat => DEFEAT,
        }
    }

    /// Render notes back to back into mono samples. Each note fades out
    /// linearly so consecutive notes don't click.
    fn render(notes: &[Note]) -> Vec<f32> {
        let mut samples = Vec::new();
        let mut rng: u32 = 0x2545_F491;
        for n in notes {
            let len = (SAMPLE_RATE as f32 * n.secs) as usize;
            let mut phase = 0.0_f32;
            for i in 0..len {
                let t = i as f32 / len as f32;
                let freq = n.from + (n.to - n.from) * t;
                phase = (phase + freq / SAMPLE_RATE as f32).fract();
                let s = match n.wave {
                    Wave::Sine => (phase * TAU).sin(),
                    Wave::Square => if phase < 0.5 { 0.6 } else { -0.6 },
                    Wave::Noise => {
                        rng ^= rng << 13;
                        rng ^= rng >> 17;
                        rng ^= rng << 5;
                        let noise = rng as f32 / u32::MAX as f32 * 2.0 - 1.0;
                        noise * 0.6 + (phase * TAU).sin() * 0.4
                    }
                };
                samples.push(s * (1.0 - t) * n.volume);
            }
        }
        samples
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: 16-bit mono PCM
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        const BITS: u16 = 16;
        const CHANNELS: u16 = 1;
        let block_align = CHANNELS * BITS / 8;
        let byte_rate = SAMPLE_RATE * block_align as u32;
        let data_size = samples.len() as u32 * block_align as u32;

        fn chunk(buf: &mut Vec<u8>, id: &[u8; 4], size: u32) {
            buf.extend_from_slice(id);
            buf.extend_from_slice(&size.to_le_bytes());
        }

        let mut buf = Vec::with_capacity(44 + data_size as usize);
        chunk(&mut buf, b"RIFF", 36 + data_size);
        buf.extend_from_slice(b"WAVE");
        chunk(&mut buf, b"fmt ", 16);
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&CHANNELS.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&BITS.to_le_bytes());
        chunk(&mut buf, b"data", data_size);

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }
        buf
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn wav_header_matches_payload() {
            let wav = make_wav(&[0.0, 0.5, -1.0]);
            assert_eq!(wav.len(), 44 + 6);
            assert_eq!(&wav[0..4], b"RIFF");
            assert_eq!(u32::from_le_bytes([wav[4], wav[5], wav[6], wav[7]]), 36 + 6);
            assert_eq!(&wav[36..40], b"data");
            assert_eq!(i16::from_le_bytes([wav[48], wav[49]]), -i16::MAX);
        }

        #[test]
        fn every_cue_renders_bounded_audio() {
            for cue in [Cue::Lane, Cue::Gate, Cue::Hit, Cue::Strike, Cue::Victory, Cue::Defeat] {
                let samples = render(score(cue));
                assert!(!samples.is_empty());
                assert!(samples.iter().all(|s| s.abs() <= 1.0));
            }
        }
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: no-ops when the sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play(&self, _cue: Cue) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rules::Lane;

    #[test]
    fn outcomes_have_cues() {
        assert_eq!(cue_for(&GameEvent::LevelCleared { level: 0, score: 1000 }), Some(Cue::Victory));
        assert_eq!(cue_for(&GameEvent::ArmyDefeated { level: 2 }), Some(Cue::Defeat));
        assert_eq!(cue_for(&GameEvent::LaneChanged { lane: Lane::Left }), Some(Cue::Lane));
        assert_eq!(cue_for(&GameEvent::EnemyEngaged), None);
    }
}
