//! Image update job
//!
//! One image update is an atomic multi-frame sequence:
//! wake ping → parameters → data chunks → refresh. Every frame is built
//! before the first one is transmitted, so a failed attempt can replay the
//! whole sequence from the precomputed frames without recomputation. The
//! receiving label reassembles chunks by their explicit frame index, not
//! by arrival order.

use embedded_hal::delay::DelayNs;
use heapless::Vec;

use lumitag_protocol::{
    CompressError, Compression, DeviceId, Encoded, Frame, FrameError, MAX_SAMPLES, MCU_CMD_DATA,
    MCU_CMD_PARAMS, MCU_CMD_REFRESH,
};

use crate::traits::{FrameTransmitter, TxError};

/// Payload bytes per data frame
pub const DATA_CHUNK_SIZE: usize = 20;

/// Repeat count for the wake ping that precedes an update
pub const WAKE_REPEATS: u16 = 400;

/// Highest addressable page
pub const MAX_PAGE: u8 = 15;

/// Attempts per job before the update is reported failed
pub const RETRY_ATTEMPTS: u32 = 3;

/// Base backoff; attempt *n* waits `n * RETRY_BACKOFF_MS` first
pub const RETRY_BACKOFF_MS: u32 = 250;

/// Upper bound on data frames per job
pub const MAX_DATA_FRAMES: usize = (MAX_SAMPLES + DATA_CHUNK_SIZE - 1) / DATA_CHUNK_SIZE;

/// Upper bound on frames per job (wake + parameters + data + refresh)
pub const MAX_JOB_FRAMES: usize = MAX_DATA_FRAMES + 3;

/// Update flag byte: 0x80 = update, 0x08 = set base page
const UPDATE_FLAGS: u8 = 0x88;
const PARAMS_PAYLOAD_SIZE: usize = 22;

/// An image update request as handed over by the image decoder.
///
/// The sample buffer itself travels separately: one byte per pixel
/// bit-plane sample, already dithered to two tone levels, with the second
/// plane appended when `color` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ImageRequest {
    /// Target page (0..=15)
    pub page: u8,
    /// Image width in pixels
    pub width: u16,
    /// Image height in pixels
    pub height: u16,
    /// Horizontal placement
    pub pos_x: u16,
    /// Vertical placement
    pub pos_y: u16,
    /// Whether a second bit plane is present
    pub color: bool,
    /// Force the narrow (PP4) physical layer
    pub force_narrow: bool,
}

/// Which frame of the sequence failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdateStage {
    /// Wake ping
    Wake,
    /// Parameters frame
    Parameters,
    /// Data chunk with this index
    Data(u16),
    /// Final refresh frame
    Refresh,
}

/// Errors terminating an image update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdateError {
    /// Pixel count is not a multiple of 8 (label addressing constraint)
    PixelCountNotByteAligned,
    /// Sample buffer length does not match width x height x planes
    SampleCountMismatch,
    /// Page outside 0..=15
    PageOutOfRange,
    /// Sample buffer rejected by the compressor
    Compress(CompressError),
    /// A frame could not be built
    Frame(FrameError),
    /// All attempts exhausted; carries the stage that failed last
    Transmit { stage: UpdateStage, error: TxError },
}

impl From<CompressError> for UpdateError {
    fn from(err: CompressError) -> Self {
        UpdateError::Compress(err)
    }
}

impl From<FrameError> for UpdateError {
    fn from(err: FrameError) -> Self {
        UpdateError::Frame(err)
    }
}

/// A fully precomputed image update.
///
/// Atomic from the caller's perspective: [`UpdateJob::run`] either
/// completes the whole wake→refresh sequence or reports failure after
/// exhausting its retry budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateJob {
    frames: Vec<Frame, MAX_JOB_FRAMES>,
    compression: Compression,
    encoded_len: usize,
}

impl UpdateJob {
    /// Validate the request, compress the samples, and build every frame
    /// of the sequence.
    pub fn prepare(
        plid: &DeviceId,
        samples: &[u8],
        request: &ImageRequest,
    ) -> Result<Self, UpdateError> {
        if request.page > MAX_PAGE {
            return Err(UpdateError::PageOutOfRange);
        }

        let pixels = u32::from(request.width) * u32::from(request.height);
        if pixels % 8 != 0 {
            return Err(UpdateError::PixelCountNotByteAligned);
        }
        let planes: u32 = if request.color { 2 } else { 1 };
        if pixels * planes != samples.len() as u32 {
            return Err(UpdateError::SampleCountMismatch);
        }

        let encoded = Encoded::from_samples(samples)?;
        let wide = !request.force_narrow;

        let mut frames: Vec<Frame, MAX_JOB_FRAMES> = Vec::new();
        // Capacity bounds follow from MAX_SAMPLES; pushes cannot fail
        let _ = frames.push(Frame::ping(plid, wide, WAKE_REPEATS));
        let _ = frames.push(Frame::mcu(
            plid,
            MCU_CMD_PARAMS,
            &params_payload(&encoded, request),
            wide,
            1,
        )?);

        for (index, chunk) in encoded.data().chunks(DATA_CHUNK_SIZE).enumerate() {
            let mut payload = [0u8; 2 + DATA_CHUNK_SIZE];
            // Explicit frame index, little-endian, so the label can
            // reassemble chunks independent of arrival order
            payload[0] = index as u8;
            payload[1] = (index >> 8) as u8;
            payload[2..2 + chunk.len()].copy_from_slice(chunk);
            let _ = frames.push(Frame::mcu(
                plid,
                MCU_CMD_DATA,
                &payload[..2 + chunk.len()],
                wide,
                1,
            )?);
        }

        let _ = frames.push(Frame::mcu(
            plid,
            MCU_CMD_REFRESH,
            &[0u8; PARAMS_PAYLOAD_SIZE],
            wide,
            1,
        )?);

        Ok(Self {
            frames,
            compression: encoded.compression(),
            encoded_len: encoded.len(),
        })
    }

    /// Transmit the sequence, retrying the whole attempt on failure.
    ///
    /// Before retry attempt *n* (1-based) the job backs off
    /// `n * RETRY_BACKOFF_MS`. A frame failure aborts the remaining frames
    /// of that attempt; the next attempt replays from the wake ping.
    pub fn run<T, D>(&self, tx: &mut T, delay: &mut D) -> Result<(), UpdateError>
    where
        T: FrameTransmitter,
        D: DelayNs,
    {
        let mut attempt = 0;
        loop {
            match self.transmit_once(tx) {
                Ok(()) => return Ok(()),
                Err(err) => {
                    attempt += 1;
                    if attempt >= RETRY_ATTEMPTS {
                        return Err(err);
                    }
                    delay.delay_ms(attempt * RETRY_BACKOFF_MS);
                }
            }
        }
    }

    fn transmit_once<T: FrameTransmitter>(&self, tx: &mut T) -> Result<(), UpdateError> {
        for (index, frame) in self.frames.iter().enumerate() {
            tx.transmit(frame).map_err(|error| UpdateError::Transmit {
                stage: self.stage_of(index),
                error,
            })?;
        }
        Ok(())
    }

    fn stage_of(&self, index: usize) -> UpdateStage {
        match index {
            0 => UpdateStage::Wake,
            1 => UpdateStage::Parameters,
            i if i == self.frames.len() - 1 => UpdateStage::Refresh,
            i => UpdateStage::Data((i - 2) as u16),
        }
    }

    /// The precomputed frames in transmission order.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Number of data chunk frames in the job.
    pub fn data_frame_count(&self) -> usize {
        self.frames.len() - 3
    }

    /// The compression chosen for the page data.
    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Encoded page size in bytes (before chunking).
    pub fn encoded_len(&self) -> usize {
        self.encoded_len
    }
}

/// Build the 22-byte parameters payload.
///
/// Multi-byte fields keep the label firmware's big-endian layout; the
/// total is the padded size in 8-sample units.
fn params_payload(encoded: &Encoded, request: &ImageRequest) -> [u8; PARAMS_PAYLOAD_SIZE] {
    let mut payload = [0u8; PARAMS_PAYLOAD_SIZE];
    put_word(&mut payload, 0, (encoded.padded_len() / 8) as u16);
    payload[3] = encoded.compression().wire_tag();
    payload[4] = request.page;
    put_word(&mut payload, 5, request.width);
    put_word(&mut payload, 7, request.height);
    put_word(&mut payload, 9, request.pos_x);
    put_word(&mut payload, 11, request.pos_y);
    // 13..15: keycode, zero
    payload[15] = UPDATE_FLAGS;
    // 16..18: enabled pages, zero; 18..22: reserved
    payload
}

fn put_word(buffer: &mut [u8], offset: usize, value: u16) {
    buffer[offset] = (value >> 8) as u8;
    buffer[offset + 1] = value as u8;
}

/// Prepare and run an image update in one call.
pub fn update_image<T, D>(
    plid: &DeviceId,
    samples: &[u8],
    request: &ImageRequest,
    tx: &mut T,
    delay: &mut D,
) -> Result<UpdateJob, UpdateError>
where
    T: FrameTransmitter,
    D: DelayNs,
{
    let job = UpdateJob::prepare(plid, samples, request)?;
    job.run(tx, delay)?;
    Ok(job)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_plid() -> DeviceId {
        DeviceId::from_barcode("AA12345678900000X")
    }

    fn small_request() -> ImageRequest {
        ImageRequest {
            page: 3,
            width: 8,
            height: 8,
            pos_x: 4,
            pos_y: 6,
            color: false,
            force_narrow: false,
        }
    }

    /// Transmitter that fails on scripted call numbers (1-based).
    struct ScriptedTx {
        sent: Vec<Frame, 32>,
        calls: u32,
        fail_calls: Vec<u32, 4>,
        passes: u32,
    }

    impl ScriptedTx {
        fn new(fail_calls: &[u32]) -> Self {
            Self {
                sent: Vec::new(),
                calls: 0,
                fail_calls: Vec::from_slice(fail_calls).unwrap(),
                passes: 0,
            }
        }
    }

    impl FrameTransmitter for ScriptedTx {
        fn transmit(&mut self, frame: &Frame) -> Result<(), TxError> {
            self.calls += 1;
            if self.fail_calls.contains(&self.calls) {
                return Err(TxError::Busy);
            }
            self.passes += u32::from(frame.repeats());
            self.sent.push(frame.clone()).unwrap();
            Ok(())
        }

        fn is_busy(&self) -> bool {
            false
        }

        fn frames_sent(&self) -> u32 {
            self.passes
        }
    }

    /// Delay recording backoff calls in milliseconds.
    struct RecordingDelay {
        ms_calls: Vec<u32, 8>,
    }

    impl DelayNs for RecordingDelay {
        fn delay_ns(&mut self, _ns: u32) {}

        fn delay_ms(&mut self, ms: u32) {
            self.ms_calls.push(ms).unwrap();
        }
    }

    fn alternating_samples<const N: usize>() -> [u8; N] {
        let mut samples = [0u8; N];
        for (i, s) in samples.iter_mut().enumerate() {
            *s = (i & 1) as u8;
        }
        samples
    }

    #[test]
    fn test_prepare_frame_sequence() {
        // 96 alternating samples stay raw -> 5 data chunks of 20,20,20,20,16
        let samples = alternating_samples::<96>();
        let request = ImageRequest {
            width: 12,
            ..small_request()
        };
        let job = UpdateJob::prepare(&test_plid(), &samples, &request).unwrap();

        assert_eq!(job.compression(), Compression::Raw);
        assert_eq!(job.encoded_len(), 96);
        assert_eq!(job.data_frame_count(), 5);
        assert_eq!(job.frames().len(), 8);

        let wake = &job.frames()[0];
        assert_eq!(wake.repeats(), WAKE_REPEATS);
        assert!(wake.is_wide());
        assert_eq!(wake.len(), 38);

        // Data frames: MCU 0x20, sequential little-endian indices,
        // concatenated chunks reproduce the encoded buffer
        let mut reassembled: Vec<u8, 96> = Vec::new();
        for (i, frame) in job.frames()[2..7].iter().enumerate() {
            let bytes = frame.as_bytes();
            // wide frame: body starts after the 4-byte header
            assert_eq!(bytes[13], MCU_CMD_DATA);
            assert_eq!(bytes[14], i as u8);
            assert_eq!(bytes[15], 0);
            let payload = &bytes[16..bytes.len() - 2];
            reassembled.extend_from_slice(payload).unwrap();
        }
        assert_eq!(&reassembled[..], &samples[..]);

        let refresh = job.frames().last().unwrap();
        assert_eq!(refresh.as_bytes()[13], MCU_CMD_REFRESH);
    }

    #[test]
    fn test_chunk_count_follows_encoded_size() {
        for (samples_len, expected_chunks) in [(8usize, 1usize), (40, 2), (96, 5), (200, 10)] {
            let mut samples: Vec<u8, 200> = Vec::new();
            for i in 0..samples_len {
                samples.push((i & 1) as u8).unwrap();
            }
            let request = ImageRequest {
                width: samples_len as u16,
                height: 1,
                ..small_request()
            };
            let job = UpdateJob::prepare(&test_plid(), &samples, &request).unwrap();
            assert_eq!(job.data_frame_count(), expected_chunks);
        }
    }

    #[test]
    fn test_parameters_payload_layout() {
        // 64 identical samples compress to 14 bytes, padded to 16
        let samples = [1u8; 64];
        let job = UpdateJob::prepare(&test_plid(), &samples, &small_request()).unwrap();

        assert_eq!(job.compression(), Compression::RunLength);
        assert_eq!(job.encoded_len(), 14);

        let params = job.frames()[1].as_bytes();
        assert_eq!(params[13], MCU_CMD_PARAMS);
        let payload = &params[14..36];
        assert_eq!(&payload[0..2], &[0, 2]); // padded 16 / 8, big-endian
        assert_eq!(payload[2], 0);
        assert_eq!(payload[3], 0x02); // run-length tag
        assert_eq!(payload[4], 3); // page
        assert_eq!(&payload[5..7], &[0, 8]); // width
        assert_eq!(&payload[7..9], &[0, 8]); // height
        assert_eq!(&payload[9..11], &[0, 4]); // x
        assert_eq!(&payload[11..13], &[0, 6]); // y
        assert_eq!(&payload[13..15], &[0, 0]); // keycode
        assert_eq!(payload[15], 0x88);
        assert!(payload[16..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_force_narrow_builds_pp4_frames() {
        let samples = [1u8; 64];
        let request = ImageRequest {
            force_narrow: true,
            ..small_request()
        };
        let job = UpdateJob::prepare(&test_plid(), &samples, &request).unwrap();
        assert!(job.frames().iter().all(|f| !f.is_wide()));
        assert_eq!(job.frames()[0].len(), 34);
    }

    #[test]
    fn test_validation_rejections() {
        let plid = test_plid();
        let samples = [0u8; 64];

        let misaligned = ImageRequest {
            width: 6,
            height: 7,
            ..small_request()
        };
        assert_eq!(
            UpdateJob::prepare(&plid, &samples[..42], &misaligned),
            Err(UpdateError::PixelCountNotByteAligned)
        );

        let mismatch = ImageRequest {
            width: 8,
            height: 16,
            ..small_request()
        };
        assert_eq!(
            UpdateJob::prepare(&plid, &samples, &mismatch),
            Err(UpdateError::SampleCountMismatch)
        );

        let bad_page = ImageRequest {
            page: 16,
            ..small_request()
        };
        assert_eq!(
            UpdateJob::prepare(&plid, &samples, &bad_page),
            Err(UpdateError::PageOutOfRange)
        );

        // Color doubles the expected sample count
        let color = ImageRequest {
            color: true,
            ..small_request()
        };
        assert_eq!(
            UpdateJob::prepare(&plid, &samples, &color),
            Err(UpdateError::SampleCountMismatch)
        );
    }

    #[test]
    fn test_retry_replays_whole_sequence() {
        // Busy on data frame 2 (call 5 of 8) for the first two attempts,
        // clean on the third.
        let samples = alternating_samples::<96>();
        let request = ImageRequest {
            width: 12,
            ..small_request()
        };
        let job = UpdateJob::prepare(&test_plid(), &samples, &request).unwrap();
        assert_eq!(job.frames().len(), 8);

        let mut tx = ScriptedTx::new(&[5, 10]);
        let mut delay = RecordingDelay {
            ms_calls: Vec::new(),
        };

        job.run(&mut tx, &mut delay).unwrap();

        // Attempts 1 and 2 abort at data frame 2 (calls 5 and 10, with 4
        // frames sent each); attempt 3 (calls 11-18) sends all 8.
        assert_eq!(tx.calls, 18);
        assert_eq!(tx.sent.len(), 4 + 4 + 8);
        assert_eq!(&delay.ms_calls[..], &[250, 500]);

        // The successful attempt resent everything from the wake ping
        let last_attempt = &tx.sent[tx.sent.len() - 8..];
        assert_eq!(last_attempt[0].repeats(), WAKE_REPEATS);
        for (sent, built) in last_attempt.iter().zip(job.frames()) {
            assert_eq!(sent, built);
        }
    }

    #[test]
    fn test_exhausted_retries_report_failing_stage() {
        let samples = [1u8; 64];
        let job = UpdateJob::prepare(&test_plid(), &samples, &small_request()).unwrap();

        // Always fail the first frame of each attempt
        let mut tx = ScriptedTx::new(&[1, 2, 3]);
        let mut delay = RecordingDelay {
            ms_calls: Vec::new(),
        };

        let result = job.run(&mut tx, &mut delay);
        assert_eq!(
            result,
            Err(UpdateError::Transmit {
                stage: UpdateStage::Wake,
                error: TxError::Busy,
            })
        );
        assert_eq!(tx.calls, 3);
        assert_eq!(&delay.ms_calls[..], &[250, 500]);
    }

    #[test]
    fn test_update_image_wrapper() {
        let samples = [0u8; 64];
        let mut tx = ScriptedTx::new(&[]);
        let mut delay = RecordingDelay {
            ms_calls: Vec::new(),
        };

        let job = update_image(&test_plid(), &samples, &small_request(), &mut tx, &mut delay)
            .unwrap();

        assert_eq!(tx.sent.len(), job.frames().len());
        assert!(delay.ms_calls.is_empty());
        // Wake pass dominates the counter: 400 + 1 + data + 1
        assert_eq!(
            tx.frames_sent(),
            400 + job.frames().len() as u32 - 1
        );
    }
}
