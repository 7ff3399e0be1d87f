//! Run-length image compression
//!
//! Bitmap pages travel in the sample domain: one byte per pixel bit-plane
//! sample, value 0 or 1, consumed by the label's own bit-unpacker. The
//! encoder emits the first sample's literal value once, then for every run
//! a unary-prefixed count: `bitlength(n) - 1` zero bytes followed by the
//! `bitlength(n)` binary digits of `n`, most significant first, one byte
//! per digit. Run values are implied by alternation, so no further
//! literals appear. A trailing run of length 1 is not encoded at all.
//!
//! Compression is only kept when strictly smaller than the raw sample
//! buffer; ties fall back to raw, which is cheaper for the label to
//! decode.

use heapless::Vec;

/// Maximum number of samples per page (both bit planes combined).
pub const MAX_SAMPLES: usize = 16384;

/// Longest encodable run; longer runs are split.
///
/// 14-bit counter headroom: a count of 16383 uses 13 zero markers plus
/// 14 digit bytes.
pub const MAX_RUN: usize = 16383;

/// How an encoded page is represented on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Compression {
    /// Raw sample bytes, no encoding
    Raw,
    /// Unary-prefixed run-length coding
    RunLength,
}

impl Compression {
    /// Tag byte carried in the parameters frame.
    pub const fn wire_tag(self) -> u8 {
        match self {
            Compression::Raw => 0x00,
            Compression::RunLength => 0x02,
        }
    }
}

/// Errors from encoding a sample buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CompressError {
    /// Sample buffer is empty
    Empty,
    /// Sample buffer exceeds [`MAX_SAMPLES`]
    TooLarge,
    /// A sample byte was neither 0 nor 1
    InvalidSample,
}

/// Errors from decoding a run-length stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Stream ended before the expected sample count was reached
    Truncated,
    /// Stream contains bytes outside the 0/1 sample domain, or runs past
    /// the expected sample count
    Malformed,
}

/// An encoded page: the chosen byte buffer plus its compression tag.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Encoded {
    data: Vec<u8, MAX_SAMPLES>,
    compression: Compression,
}

impl Encoded {
    /// Encode a sample buffer, choosing run-length coding only when it is
    /// strictly smaller than the raw samples.
    pub fn from_samples(samples: &[u8]) -> Result<Self, CompressError> {
        if samples.is_empty() {
            return Err(CompressError::Empty);
        }
        if samples.len() > MAX_SAMPLES {
            return Err(CompressError::TooLarge);
        }
        if samples.iter().any(|&s| s > 1) {
            return Err(CompressError::InvalidSample);
        }

        let mut data = Vec::new();
        match run_length_encode(samples, &mut data) {
            Ok(()) if data.len() < samples.len() => Ok(Self {
                data,
                compression: Compression::RunLength,
            }),
            _ => {
                // No savings (or outright expansion): keep the raw samples
                data.clear();
                data.extend_from_slice(samples)
                    .map_err(|_| CompressError::TooLarge)?;
                Ok(Self {
                    data,
                    compression: Compression::Raw,
                })
            }
        }
    }

    /// Encoded bytes as chosen (raw samples or run-length stream).
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Encoded length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the encoded buffer is empty (never true for a valid page).
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The chosen representation.
    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Encoded length rounded up to a multiple of 8 samples, the label's
    /// addressing granularity.
    pub fn padded_len(&self) -> usize {
        (self.data.len() + 7) & !7
    }
}

/// Encoding gave up: the stream reached the raw length.
struct NotSmaller;

fn run_length_encode(samples: &[u8], out: &mut Vec<u8, MAX_SAMPLES>) -> Result<(), NotSmaller> {
    let limit = samples.len();
    let mut current = samples[0];
    let mut run = 1usize;

    push_limited(out, current, limit)?;

    for &sample in &samples[1..] {
        if sample == current && run < MAX_RUN {
            run += 1;
        } else if sample == current {
            // Counter headroom exhausted: split the run
            push_run(out, run, limit)?;
            run = 1;
        } else {
            push_run(out, run, limit)?;
            current = sample;
            run = 1;
        }
    }

    // A trailing run of 1 is implied by the sample count
    if run > 1 {
        push_run(out, run, limit)?;
    }

    Ok(())
}

/// Emit one unary-prefixed run count.
fn push_run(out: &mut Vec<u8, MAX_SAMPLES>, run: usize, limit: usize) -> Result<(), NotSmaller> {
    let bits = usize::BITS - run.leading_zeros();
    for _ in 1..bits {
        push_limited(out, 0, limit)?;
    }
    for i in (0..bits).rev() {
        push_limited(out, ((run >> i) & 1) as u8, limit)?;
    }
    Ok(())
}

fn push_limited(out: &mut Vec<u8, MAX_SAMPLES>, byte: u8, limit: usize) -> Result<(), NotSmaller> {
    if out.len() >= limit {
        return Err(NotSmaller);
    }
    out.push(byte).map_err(|_| NotSmaller)
}

/// Expand a run-length stream back into `expected_len` samples.
///
/// This is the reference for the label-side unpacker and the round-trip
/// check for the encoder. Split runs (a run longer than [`MAX_RUN`]) are
/// not reconstructible here because the value alternation they break is
/// exactly what the stream relies on.
pub fn run_length_decode(
    encoded: &[u8],
    expected_len: usize,
    out: &mut Vec<u8, MAX_SAMPLES>,
) -> Result<(), DecodeError> {
    out.clear();
    if expected_len == 0 {
        return Ok(());
    }
    if expected_len > MAX_SAMPLES {
        return Err(DecodeError::Malformed);
    }

    let first = *encoded.first().ok_or(DecodeError::Truncated)?;
    if first > 1 {
        return Err(DecodeError::Malformed);
    }

    let mut value = first;
    let mut pos = 1;

    while out.len() < expected_len {
        if pos >= encoded.len() {
            // The encoder omits a trailing run of 1
            out.push(value).map_err(|_| DecodeError::Malformed)?;
            if out.len() == expected_len {
                break;
            }
            return Err(DecodeError::Truncated);
        }

        let mut zeros = 0usize;
        while pos < encoded.len() && encoded[pos] == 0 {
            zeros += 1;
            pos += 1;
        }
        let width = zeros + 1;
        if pos + width > encoded.len() {
            return Err(DecodeError::Truncated);
        }

        let mut count = 0usize;
        for _ in 0..width {
            let bit = encoded[pos];
            pos += 1;
            if bit > 1 {
                return Err(DecodeError::Malformed);
            }
            count = (count << 1) | usize::from(bit);
        }

        if out.len() + count > expected_len {
            return Err(DecodeError::Malformed);
        }
        for _ in 0..count {
            out.push(value).map_err(|_| DecodeError::Malformed)?;
        }
        value ^= 1;
    }

    Ok(())
}
