use nom::{
    combinator::map,
    number::complete::{be_i16, be_u16, i8, u8},
    sequence::tuple,
    IResult,
};

#[cfg(feature = "json_dump")]
use serde::Serialize;

/// Represents an `INST` (instrument) chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json_dump", derive(Serialize))]
pub struct InstrumentChunk {
    /// MIDI note number.
    pub base_note: u8,
    /// Cents, -50..=50.
    pub detune: i8,
    pub low_note: u8,
    pub high_note: u8,
    pub low_velocity: u8,
    pub high_velocity: u8,
    /// Decibels.
    pub gain: i16,
    pub sustain_loop: Loop,
    pub release_loop: Loop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "json_dump", derive(Serialize))]
pub struct Loop {
    /// 0: no looping, 1: forward, 2: forward/backward.
    pub play_mode: u16,
    /// Marker ids.
    pub begin: u16,
    pub end: u16,
}

impl Loop {
    fn parse(input: &[u8]) -> IResult<&[u8], Loop> {
        map(tuple((be_u16, be_u16, be_u16)), |(play_mode, begin, end)| {
            Loop {
                play_mode,
                begin,
                end,
            }
        })(input)
    }
}

impl InstrumentChunk {
    pub(crate) fn parse(body: &[u8]) -> IResult<&[u8], InstrumentChunk> {
        let (remain, (base_note, detune, low_note, high_note, low_velocity, high_velocity)) =
            tuple((u8, i8, u8, u8, u8, u8))(body)?;
        let (remain, (gain, sustain_loop, release_loop)) =
            tuple((be_i16, Loop::parse, Loop::parse))(remain)?;

        Ok((
            remain,
            InstrumentChunk {
                base_note,
                detune,
                low_note,
                high_note,
                low_velocity,
                high_velocity,
                gain,
                sustain_loop,
                release_loop,
            },
        ))
    }
}
