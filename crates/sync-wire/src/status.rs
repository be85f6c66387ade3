use crate::error::ErrorCode;
use crate::header::{decode_header, encode_header, PacketType, HEADER_LEN};

/// Total length, in bytes, of an `UPGRADE_STATUS` frame.
pub const UPGRADE_STATUS_LEN: usize = HEADER_LEN + 2;

/// Encode an `UPGRADE_STATUS` frame. Not sent by the bundled client (see
/// DESIGN.md open-question resolutions); exposed so a caller may opt in.
pub fn encode_upgrade_status(buf: &mut [u8; UPGRADE_STATUS_LEN], status_code: u16) {
    let mut header = [0u8; HEADER_LEN];
    encode_header(&mut header, PacketType::UpgradeStatus, 0);
    buf[..HEADER_LEN].copy_from_slice(&header);
    buf[HEADER_LEN..].copy_from_slice(&status_code.to_be_bytes());
}

pub fn decode_upgrade_status(buf: &[u8; UPGRADE_STATUS_LEN]) -> Result<u16, ErrorCode> {
    let mut header_buf = [0u8; HEADER_LEN];
    header_buf.copy_from_slice(&buf[..HEADER_LEN]);
    let header = decode_header(&header_buf)?;
    if header.packet_type != PacketType::UpgradeStatus {
        return Err(ErrorCode::UnknownPacketType);
    }
    Ok(u16::from_be_bytes([buf[HEADER_LEN], buf[HEADER_LEN + 1]]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn round_trip() {
        let mut buf = [0u8; UPGRADE_STATUS_LEN];
        encode_upgrade_status(&mut buf, 42);
        assert_eq!(decode_upgrade_status(&buf).unwrap(), 42);
    }
}
