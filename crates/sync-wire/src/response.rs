use crate::error::ErrorCode;
use crate::header::{decode_header, encode_header, PacketType, HEADER_LEN};

/// Length of the `UPGRADE_RESPONSE` header frame (header + 8-byte length
/// prefix). The archive body itself is streamed separately and is not part
/// of this fixed-size frame.
pub const UPGRADE_RESPONSE_HEADER_LEN: usize = HEADER_LEN + 8;

/// Encode the `UPGRADE_RESPONSE` header frame announcing `length` bytes of
/// archive payload to follow on the same session.
pub fn encode_upgrade_response_header(
    buf: &mut [u8; UPGRADE_RESPONSE_HEADER_LEN],
    length: u64,
) {
    let mut header = [0u8; HEADER_LEN];
    encode_header(&mut header, PacketType::UpgradeResponse, 0);
    buf[..HEADER_LEN].copy_from_slice(&header);
    buf[HEADER_LEN..].copy_from_slice(&length.to_be_bytes());
}

/// Decode the `UPGRADE_RESPONSE` header frame, returning the announced
/// payload length. The caller is responsible for reading exactly that many
/// bytes afterward.
pub fn decode_upgrade_response_header(
    buf: &[u8; UPGRADE_RESPONSE_HEADER_LEN],
) -> Result<u64, ErrorCode> {
    let mut header_buf = [0u8; HEADER_LEN];
    header_buf.copy_from_slice(&buf[..HEADER_LEN]);
    let header = decode_header(&header_buf)?;
    if header.packet_type != PacketType::UpgradeResponse {
        return Err(ErrorCode::UnknownPacketType);
    }

    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&buf[HEADER_LEN..]);
    Ok(u64::from_be_bytes(len_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn round_trip() {
        let mut buf = [0u8; UPGRADE_RESPONSE_HEADER_LEN];
        encode_upgrade_response_header(&mut buf, 0);
        assert_eq!(decode_upgrade_response_header(&buf).unwrap(), 0);
    }

    #[test]
    fn round_trip_over_4gib() {
        let length: u64 = 0x0000_0000_8000_0011;
        let mut buf = [0u8; UPGRADE_RESPONSE_HEADER_LEN];
        encode_upgrade_response_header(&mut buf, length);
        assert_eq!(decode_upgrade_response_header(&buf).unwrap(), length);
        // Big-endian on the wire.
        assert_eq!(&buf[HEADER_LEN..], &length.to_be_bytes());
    }
}
