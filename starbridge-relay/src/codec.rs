use borsh::BorshDeserialize;
use starbridge_types::constants::MAX_MESSAGE_SIZE;
use starbridge_types::envelope::Envelope;

use crate::error::{DecodeError, RelayError};

/// Length of the big-endian frame length prefix.
pub const LENGTH_PREFIX_LEN: usize = 4;

/// Encode an envelope into its wire form.
///
/// Wire format: `[4-byte BE length][borsh envelope]`, where the borsh envelope is
/// `version: u8`, `body: Vec<u8>`, `signatures: Vec<Vec<u8>>`, `chain: u8`.
/// Encoding is deterministic: equal envelopes always produce equal bytes.
pub fn encode_envelope(envelope: &Envelope) -> Result<Vec<u8>, RelayError> {
    let data = borsh::to_vec(envelope).map_err(|e| RelayError::CodecError {
        reason: e.to_string(),
    })?;

    if data.len() > MAX_MESSAGE_SIZE {
        return Err(RelayError::MessageTooLarge {
            size: data.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }

    let len = (data.len() as u32).to_be_bytes();
    let mut out = Vec::with_capacity(LENGTH_PREFIX_LEN + data.len());
    out.extend_from_slice(&len);
    out.extend_from_slice(&data);
    Ok(out)
}

/// Decode wire bytes into an envelope.
///
/// The version field is decoded but not checked here; version policy belongs to the
/// consumer (`Envelope::validate_version`). Any framing problem, including an unknown
/// chain tag, is a `DecodeError`.
pub fn decode_envelope(data: &[u8]) -> Result<Envelope, DecodeError> {
    if data.len() < LENGTH_PREFIX_LEN {
        return Err(DecodeError::TooShort { len: data.len() });
    }

    let len = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;

    if len > MAX_MESSAGE_SIZE {
        return Err(DecodeError::TooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }

    let frame_end = LENGTH_PREFIX_LEN + len;
    if data.len() < frame_end {
        return Err(DecodeError::Truncated {
            expected: frame_end,
            actual: data.len(),
        });
    }
    if data.len() > frame_end {
        return Err(DecodeError::TrailingBytes {
            extra: data.len() - frame_end,
        });
    }

    Envelope::try_from_slice(&data[LENGTH_PREFIX_LEN..frame_end]).map_err(|e| {
        DecodeError::Malformed {
            reason: e.to_string(),
        }
    })
}
