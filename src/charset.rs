//! Incremental transcoding between the UTF-16 code units stored in character large objects and
//! the bytes handed out by the byte oriented stream views.
//!
//! Encoders and decoders never fail. Malformed input and characters which can not be mapped are
//! substituted with a replacement.

mod ascii;

pub use self::ascii::{AsciiDecoder, AsciiEncoder, UsAscii};

/// Reason an encoder or decoder stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoderStatus {
    /// All input which could be transcoded has been consumed. The coder may need more input to
    /// make progress, e.g. if the input ends in the middle of a surrogate pair.
    Underflow,
    /// The output buffer is full.
    Overflow,
}

/// Result of a single call to [`Encoder::encode`] or [`Decoder::decode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoderOutcome {
    /// Number of input units consumed.
    pub consumed: usize,
    /// Number of output units written.
    pub produced: usize,
    pub status: CoderStatus,
}

/// Turns UTF-16 code units into bytes of a specific charset.
pub trait Encoder {
    /// Encode as much of `input` into `output` as possible.
    ///
    /// If `end_of_input` is `false` the encoder may leave a trailing incomplete sequence (a high
    /// surrogate) unconsumed and report [`CoderStatus::Underflow`]. The caller is expected to
    /// present it again together with more input.
    fn encode(&mut self, input: &[u16], output: &mut [u8], end_of_input: bool) -> CoderOutcome;
}

/// Turns bytes of a specific charset into UTF-16 code units.
pub trait Decoder {
    /// Decode as much of `input` into `output` as possible. Same contract as [`Encoder::encode`]
    /// regarding incomplete trailing sequences.
    fn decode(&mut self, input: &[u8], output: &mut [u16], end_of_input: bool) -> CoderOutcome;
}

/// A charset the byte views of a character large object can be transcoded to.
pub trait Charset {
    type Encoder: Encoder;
    type Decoder: Decoder;

    /// Human readable name, used in log messages.
    fn name(&self) -> &'static str;

    /// Maximum number of bytes a single character may be encoded to.
    fn max_bytes_per_char(&self) -> usize;

    fn new_encoder(&self) -> Self::Encoder;

    fn new_decoder(&self) -> Self::Decoder;
}
