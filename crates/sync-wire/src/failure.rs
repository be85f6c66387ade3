use crate::error::ErrorCode;
use crate::header::{decode_header, encode_header, PacketType, HEADER_LEN};

/// Total length, in bytes, of a `PROTO_FAILURE` frame.
pub const PROTO_FAILURE_LEN: usize = HEADER_LEN + 2;

/// Encode a `PROTO_FAILURE` frame carrying `err`.
pub fn encode_proto_failure(buf: &mut [u8; PROTO_FAILURE_LEN], err: ErrorCode) {
    let mut header = [0u8; HEADER_LEN];
    encode_header(&mut header, PacketType::ProtoFailure, 0);
    buf[..HEADER_LEN].copy_from_slice(&header);
    buf[HEADER_LEN..].copy_from_slice(&err.as_u16().to_be_bytes());
}

/// Decode a `PROTO_FAILURE` frame. Fails with `MALFORMED_PACKET` if the
/// error code isn't one of the known enum values — a frame advertising an
/// error we don't understand is itself malformed.
pub fn decode_proto_failure(buf: &[u8; PROTO_FAILURE_LEN]) -> Result<ErrorCode, ErrorCode> {
    let mut header_buf = [0u8; HEADER_LEN];
    header_buf.copy_from_slice(&buf[..HEADER_LEN]);
    let header = decode_header(&header_buf)?;
    if header.packet_type != PacketType::ProtoFailure {
        return Err(ErrorCode::UnknownPacketType);
    }
    let code = u16::from_be_bytes([buf[HEADER_LEN], buf[HEADER_LEN + 1]]);
    ErrorCode::from_u16(code).ok_or(ErrorCode::MalformedPacket)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn round_trip_every_code() {
        for code in [
            ErrorCode::UnknownProtoVer,
            ErrorCode::UnknownFlag,
            ErrorCode::UnknownPkgMgr,
            ErrorCode::UnknownComprType,
            ErrorCode::UnknownConfigSet,
            ErrorCode::UnknownPacketType,
            ErrorCode::MalformedPacket,
            ErrorCode::ServerInternalErr,
            ErrorCode::ClientInternalErr,
        ] {
            let mut buf = [0u8; PROTO_FAILURE_LEN];
            encode_proto_failure(&mut buf, code);
            assert_eq!(decode_proto_failure(&buf).unwrap(), code);
        }
    }
}
