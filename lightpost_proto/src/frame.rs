//! Byte-framed wire codec: `STX LEN PAYLOAD ETX`.

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

pub const STX: u8 = 0x02;
pub const ETX: u8 = 0x03;

/// LEN is a single byte, so a payload can never exceed 255 bytes. Widening
/// this means versioning the frame format, not growing read buffers.
pub const MAX_PAYLOAD: usize = 255;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("payload of {0} bytes exceeds the {MAX_PAYLOAD}-byte frame limit")]
    PayloadTooLarge(usize),
    #[error("frame too short: {0} bytes")]
    TooShort(usize),
    #[error("invalid start byte {0:#04x}, want {STX:#04x}")]
    BadStart(u8),
    #[error("declared length {declared} exceeds {available} available payload bytes")]
    Truncated { declared: usize, available: usize },
    #[error("invalid end byte {0:#04x}, want {ETX:#04x}")]
    BadEnd(u8),
}

pub fn encode(payload: &str) -> Result<Bytes, FrameError> {
    let len = payload.len();
    if len > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge(len));
    }
    let mut buf = BytesMut::with_capacity(len + 3);
    buf.put_u8(STX);
    buf.put_u8(len as u8);
    buf.put_slice(payload.as_bytes());
    buf.put_u8(ETX);
    Ok(buf.freeze())
}

/// Decode one frame. Devices answering over HTTP wrap the frame in response
/// headers, so everything up to and including the first `\r\n\r\n` is
/// stripped before the STX/LEN/ETX check; with no separator the whole input
/// is treated as the frame.
pub fn decode(raw: &[u8]) -> Result<String, FrameError> {
    let frame = match find_header_end(raw) {
        Some(start) => &raw[start..],
        None => raw,
    };
    if frame.len() < 3 {
        return Err(FrameError::TooShort(frame.len()));
    }
    if frame[0] != STX {
        return Err(FrameError::BadStart(frame[0]));
    }
    let declared = frame[1] as usize;
    let available = frame.len() - 3;
    if declared > available {
        return Err(FrameError::Truncated {
            declared,
            available,
        });
    }
    if frame[2 + declared] != ETX {
        return Err(FrameError::BadEnd(frame[2 + declared]));
    }
    Ok(String::from_utf8_lossy(&frame[2..2 + declared]).into_owned())
}

fn find_header_end(raw: &[u8]) -> Option<usize> {
    raw.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let payload = "uptime: 3600, memory_used: 42.10";
        let encoded = encode(payload).unwrap();
        assert_eq!(encoded[0], STX);
        assert_eq!(encoded[1] as usize, payload.len());
        assert_eq!(encoded[encoded.len() - 1], ETX);
        assert_eq!(decode(&encoded).unwrap(), payload);
    }

    #[test]
    fn round_trip_max_payload() {
        let payload = "x".repeat(MAX_PAYLOAD);
        let encoded = encode(&payload).unwrap();
        assert_eq!(decode(&encoded).unwrap(), payload);
    }

    #[test]
    fn encode_rejects_oversize_payload() {
        let payload = "x".repeat(MAX_PAYLOAD + 1);
        assert!(matches!(
            encode(&payload),
            Err(FrameError::PayloadTooLarge(256))
        ));
    }

    #[test]
    fn decode_rejects_short_input() {
        assert!(matches!(decode(&[STX, 0x00]), Err(FrameError::TooShort(2))));
        assert!(matches!(decode(&[]), Err(FrameError::TooShort(0))));
    }

    #[test]
    fn decode_rejects_wrong_start_byte() {
        assert!(matches!(
            decode(&[0x07, 0x01, b'a', ETX]),
            Err(FrameError::BadStart(0x07))
        ));
    }

    #[test]
    fn decode_rejects_truncated_payload() {
        // Declares 5 payload bytes but only 4 are present before the ETX.
        let raw = [STX, 0x05, b'a', b':', b'1', b',', ETX];
        assert!(matches!(
            decode(&raw),
            Err(FrameError::Truncated {
                declared: 5,
                available: 4,
            })
        ));
    }

    #[test]
    fn decode_rejects_wrong_end_byte() {
        let raw = [STX, 0x01, b'a', 0x04];
        assert!(matches!(decode(&raw), Err(FrameError::BadEnd(0x04))));
    }

    #[test]
    fn decode_strips_http_headers() {
        let payload = "uptime: 10";
        let framed = encode(payload).unwrap();
        let mut raw = b"HTTP/1.0 200 OK\r\nContent-Type: application/octet-stream\r\n\r\n".to_vec();
        raw.extend_from_slice(&framed);
        assert_eq!(decode(&raw).unwrap(), payload);
    }

    #[test]
    fn decode_without_separator_treats_whole_input_as_frame() {
        let framed = encode("car_light: red").unwrap();
        assert_eq!(decode(&framed).unwrap(), "car_light: red");
    }
}
