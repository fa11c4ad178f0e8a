// src/hal/decoder.rs
//! Frame decoders: raw transport frames to timestamped samples

use crate::config::constants::{cyton, synthetic};
use crate::hal::types::{BoardId, RawFrame, Sample};
use thiserror::Error;

/// Converts one raw frame into exactly one sample
pub trait FrameDecoder: Send {
    fn decode(&self, frame: &RawFrame) -> Result<Sample, DecodeError>;
}

/// Malformed frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("frame length {actual} does not match expected {expected}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("bad frame header 0x{found:02X}")]
    BadHeader { found: u8 },

    #[error("bad frame footer 0x{found:02X}")]
    BadFooter { found: u8 },
}

/// Decoder matching the wire format of `board`
pub fn decoder_for(board: BoardId) -> Box<dyn FrameDecoder> {
    match board {
        BoardId::Synthetic => Box::new(SyntheticDecoder::new(synthetic::NUM_CHANNELS)),
        BoardId::Cyton => Box::new(CytonDecoder),
    }
}

fn check_length(bytes: &[u8], expected: usize) -> Result<(), DecodeError> {
    if bytes.len() != expected {
        return Err(DecodeError::InvalidLength {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

/// Synthetic board frames: header, u32 sequence, f32 channels, footer, all LE
#[derive(Debug, Clone)]
pub struct SyntheticDecoder {
    width: usize,
}

impl SyntheticDecoder {
    pub fn new(width: usize) -> Self {
        Self { width }
    }

    /// Frame size for `width` channels
    pub fn frame_length(width: usize) -> usize {
        1 + 4 + width * 4 + 1
    }
}

impl FrameDecoder for SyntheticDecoder {
    fn decode(&self, frame: &RawFrame) -> Result<Sample, DecodeError> {
        let bytes = frame.bytes();
        check_length(bytes, Self::frame_length(self.width))?;

        if bytes[0] != synthetic::HEADER {
            return Err(DecodeError::BadHeader { found: bytes[0] });
        }
        let footer = bytes[bytes.len() - 1];
        if footer != synthetic::FOOTER {
            return Err(DecodeError::BadFooter { found: footer });
        }

        let channels = bytes[5..bytes.len() - 1]
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();

        Ok(Sample::new(channels, frame.captured_at()))
    }
}

/// Cyton frames
///
/// Row layout: package number, 8 EEG channels in microvolts, 3 accelerometer
/// axes in g. Aux bytes only carry accelerometer data when the footer is
/// `0xC0`; other footers leave the accelerometer columns at zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct CytonDecoder;

impl CytonDecoder {
    fn eeg_counts(bytes: &[u8]) -> i32 {
        // sign-extend the 24-bit big-endian value
        i32::from_be_bytes([bytes[0], bytes[1], bytes[2], 0]) >> 8
    }
}

impl FrameDecoder for CytonDecoder {
    fn decode(&self, frame: &RawFrame) -> Result<Sample, DecodeError> {
        let bytes = frame.bytes();
        check_length(bytes, cyton::PACKAGE_LENGTH)?;

        if bytes[0] != cyton::HEADER {
            return Err(DecodeError::BadHeader { found: bytes[0] });
        }
        let footer = bytes[cyton::PACKAGE_LENGTH - 1];
        if !(cyton::FOOTER_MIN..=cyton::FOOTER_MAX).contains(&footer) {
            return Err(DecodeError::BadFooter { found: footer });
        }

        let mut channels = Vec::with_capacity(cyton::ROW_WIDTH);
        channels.push(bytes[1] as f32);

        for channel in 0..cyton::NUM_EEG_CHANNELS {
            let start = cyton::EEG_OFFSET + channel * cyton::EEG_BYTES;
            let counts = Self::eeg_counts(&bytes[start..start + cyton::EEG_BYTES]);
            channels.push(counts as f32 * cyton::EEG_SCALE_UV);
        }

        for axis in 0..cyton::NUM_ACCEL_CHANNELS {
            let value = if footer == cyton::FOOTER_ACCEL {
                let start = cyton::ACCEL_OFFSET + axis * cyton::ACCEL_BYTES;
                i16::from_be_bytes([bytes[start], bytes[start + 1]]) as f32 * cyton::ACCEL_SCALE_G
            } else {
                0.0
            };
            channels.push(value);
        }

        Ok(Sample::new(channels, frame.captured_at()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::synthetic::encode_frame;

    fn cyton_frame(package: u8, eeg: [i32; 8], accel: [i16; 3], footer: u8) -> Vec<u8> {
        let mut bytes = vec![cyton::HEADER, package];
        for counts in eeg {
            let be = counts.to_be_bytes();
            bytes.extend_from_slice(&be[1..4]);
        }
        for axis in accel {
            bytes.extend_from_slice(&axis.to_be_bytes());
        }
        bytes.push(footer);
        bytes
    }

    #[test]
    fn test_synthetic_decode() {
        let values = [0.5, -1.25, 3.0, 0.0, 7.5, -2.0, 1.0, 100.0];
        let frame = RawFrame::new(encode_frame(17, &values), 12.5);

        let sample = SyntheticDecoder::new(8).decode(&frame).unwrap();
        assert_eq!(sample.channels(), &values);
        assert_eq!(sample.timestamp(), 12.5);
    }

    #[test]
    fn test_synthetic_rejects_malformed_frames() {
        let decoder = SyntheticDecoder::new(8);
        let good = encode_frame(0, &[0.0; 8]);

        let short = RawFrame::new(good[..good.len() - 1].to_vec(), 0.0);
        assert_eq!(
            decoder.decode(&short),
            Err(DecodeError::InvalidLength { expected: 38, actual: 37 })
        );

        let mut bad_header = good.clone();
        bad_header[0] = 0x00;
        assert_eq!(
            decoder.decode(&RawFrame::new(bad_header, 0.0)),
            Err(DecodeError::BadHeader { found: 0x00 })
        );

        let mut bad_footer = good;
        *bad_footer.last_mut().unwrap() = 0xFF;
        assert_eq!(
            decoder.decode(&RawFrame::new(bad_footer, 0.0)),
            Err(DecodeError::BadFooter { found: 0xFF })
        );
    }

    #[test]
    fn test_cyton_decode_scales_channels() {
        let eeg = [0, 1, -1, 8_388_607, -8_388_608, 1000, -1000, 42];
        let bytes = cyton_frame(7, eeg, [16, -16, 0], cyton::FOOTER_ACCEL);
        let sample = CytonDecoder.decode(&RawFrame::new(bytes, 3.0)).unwrap();

        assert_eq!(sample.width(), cyton::ROW_WIDTH);
        assert_eq!(sample.channels()[0], 7.0);
        for (index, counts) in eeg.iter().enumerate() {
            let expected = *counts as f32 * cyton::EEG_SCALE_UV;
            assert!((sample.channels()[1 + index] - expected).abs() < 1e-3);
        }
        assert!((sample.channels()[9] - 0.002).abs() < 1e-6);
        assert!((sample.channels()[10] + 0.002).abs() < 1e-6);
        assert_eq!(sample.channels()[11], 0.0);
        assert_eq!(sample.timestamp(), 3.0);
    }

    #[test]
    fn test_cyton_sign_extension() {
        assert_eq!(CytonDecoder::eeg_counts(&[0xFF, 0xFF, 0xFF]), -1);
        assert_eq!(CytonDecoder::eeg_counts(&[0x80, 0x00, 0x00]), -8_388_608);
        assert_eq!(CytonDecoder::eeg_counts(&[0x7F, 0xFF, 0xFF]), 8_388_607);
        assert_eq!(CytonDecoder::eeg_counts(&[0x00, 0x01, 0x00]), 256);
    }

    #[test]
    fn test_cyton_aux_footer_zeroes_accel() {
        let bytes = cyton_frame(1, [0; 8], [100, 100, 100], 0xC1);
        let sample = CytonDecoder.decode(&RawFrame::new(bytes, 0.0)).unwrap();
        assert_eq!(&sample.channels()[9..], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_cyton_rejects_bad_markers() {
        let mut bytes = cyton_frame(1, [0; 8], [0; 3], 0xD0);
        assert_eq!(
            CytonDecoder.decode(&RawFrame::new(bytes.clone(), 0.0)),
            Err(DecodeError::BadFooter { found: 0xD0 })
        );

        bytes[0] = 0xA1;
        assert_eq!(
            CytonDecoder.decode(&RawFrame::new(bytes, 0.0)),
            Err(DecodeError::BadHeader { found: 0xA1 })
        );

        let truncated = RawFrame::new(vec![cyton::HEADER; 10], 0.0);
        assert!(matches!(
            CytonDecoder.decode(&truncated),
            Err(DecodeError::InvalidLength { expected: 33, actual: 10 })
        ));
    }

    #[test]
    fn test_decoder_for_matches_descriptor_width() {
        for board in BoardId::ALL {
            let descriptor = board.descriptor();
            let decoder = decoder_for(board);
            let bytes = match board {
                BoardId::Synthetic => encode_frame(0, &vec![1.0; descriptor.num_channels]),
                BoardId::Cyton => cyton_frame(0, [0; 8], [0; 3], cyton::FOOTER_ACCEL),
            };
            assert_eq!(bytes.len(), descriptor.package_length);
            let sample = decoder.decode(&RawFrame::new(bytes, 0.0)).unwrap();
            assert_eq!(sample.width(), descriptor.num_channels);
        }
    }
}
