use super::{Charset, CoderOutcome, CoderStatus, Decoder, Encoder};

/// Substituted for every character which has no ASCII representation.
const ENCODER_REPLACEMENT: u8 = b'?';
/// Substituted for every byte which is not valid ASCII.
const DECODER_REPLACEMENT: u16 = 0xFFFD;

fn is_high_surrogate(unit: u16) -> bool {
    (0xD800..=0xDBFF).contains(&unit)
}

fn is_low_surrogate(unit: u16) -> bool {
    (0xDC00..=0xDFFF).contains(&unit)
}

/// The 7 bit US-ASCII charset. Every character maps to exactly one byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsAscii;

impl Charset for UsAscii {
    type Encoder = AsciiEncoder;
    type Decoder = AsciiDecoder;

    fn name(&self) -> &'static str {
        "US-ASCII"
    }

    fn max_bytes_per_char(&self) -> usize {
        1
    }

    fn new_encoder(&self) -> AsciiEncoder {
        AsciiEncoder
    }

    fn new_decoder(&self) -> AsciiDecoder {
        AsciiDecoder
    }
}

/// Encoder of [`UsAscii`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AsciiEncoder;

impl Encoder for AsciiEncoder {
    fn encode(&mut self, input: &[u16], output: &mut [u8], end_of_input: bool) -> CoderOutcome {
        let mut consumed = 0;
        let mut produced = 0;
        while consumed < input.len() {
            if produced == output.len() {
                return CoderOutcome {
                    consumed,
                    produced,
                    status: CoderStatus::Overflow,
                };
            }
            let unit = input[consumed];
            let width = if unit < 0x80 {
                output[produced] = unit as u8;
                1
            } else if is_high_surrogate(unit) {
                match input.get(consumed + 1) {
                    // A well formed pair is a single unmappable character.
                    Some(&next) if is_low_surrogate(next) => {
                        output[produced] = ENCODER_REPLACEMENT;
                        2
                    }
                    // Malformed: high surrogate followed by something else.
                    Some(_) => {
                        output[produced] = ENCODER_REPLACEMENT;
                        1
                    }
                    // The low surrogate may still arrive with the next chunk of input.
                    None if !end_of_input => break,
                    None => {
                        output[produced] = ENCODER_REPLACEMENT;
                        1
                    }
                }
            } else {
                output[produced] = ENCODER_REPLACEMENT;
                1
            };
            consumed += width;
            produced += 1;
        }
        CoderOutcome {
            consumed,
            produced,
            status: CoderStatus::Underflow,
        }
    }
}

/// Decoder of [`UsAscii`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AsciiDecoder;

impl Decoder for AsciiDecoder {
    fn decode(&mut self, input: &[u8], output: &mut [u16], _end_of_input: bool) -> CoderOutcome {
        let n = input.len().min(output.len());
        for (target, &byte) in output.iter_mut().zip(&input[..n]) {
            *target = if byte < 0x80 {
                byte.into()
            } else {
                DECODER_REPLACEMENT
            };
        }
        CoderOutcome {
            consumed: n,
            produced: n,
            status: if n < input.len() {
                CoderStatus::Overflow
            } else {
                CoderStatus::Underflow
            },
        }
    }
}
