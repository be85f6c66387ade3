use crate::error::ErrorCode;
use crate::header::{decode_header, encode_header, PacketType, HEADER_LEN};

/// Total length, in bytes, of an `UPGRADE_REQUEST` frame.
pub const UPGRADE_REQUEST_LEN: usize = HEADER_LEN + 8;

const CONFIG_SET_OFFSET: usize = HEADER_LEN;
const COMPR_TYPE_OFFSET: usize = CONFIG_SET_OFFSET + 2;
const PKG_MGR_OFFSET: usize = COMPR_TYPE_OFFSET + 1;
const LAST_UPGRADE_TIME_OFFSET: usize = PKG_MGR_OFFSET + 1;

/// Archive compression formats recognized by the wire protocol. Not every
/// server supports every variant; see `ServerConfig::supported_compressions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum CompressionType {
    None = 0,
    TarGz = 1,
    TarBz2 = 2,
    TarXz = 3,
    Rar = 4,
    Zip = 5,
}

impl CompressionType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::None),
            1 => Some(Self::TarGz),
            2 => Some(Self::TarBz2),
            3 => Some(Self::TarXz),
            4 => Some(Self::Rar),
            5 => Some(Self::Zip),
            _ => None,
        }
    }
}

/// Package managers recognized by the wire protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PackageManager {
    Dpkg = 0,
    TarXz = 1,
}

impl PackageManager {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Dpkg),
            1 => Some(Self::TarXz),
            _ => None,
        }
    }
}

/// The scalar fields of an `UPGRADE_REQUEST`, as received on the wire
/// (before server-side validation/resolution; see `UpgradeRequest` in
/// `sync-server` for the validated counterpart).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpgradeRequestWire {
    pub config_set: u16,
    pub compression_raw: u8,
    pub package_manager_raw: u8,
    pub last_upgrade_time: u32,
}

impl UpgradeRequestWire {
    pub fn new(
        config_set: u16,
        compression: CompressionType,
        package_manager: PackageManager,
        last_upgrade_time: u32,
    ) -> Self {
        Self {
            config_set,
            compression_raw: compression as u8,
            package_manager_raw: package_manager as u8,
            last_upgrade_time,
        }
    }

    /// The compression byte interpreted as a `CompressionType`, or `None` if
    /// it isn't one of the known enum values (caller should report
    /// `UNKNOWN_COMPR_TYPE`).
    pub fn compression(&self) -> Option<CompressionType> {
        CompressionType::from_u8(self.compression_raw)
    }

    /// The package-manager byte interpreted as a `PackageManager`, or `None`
    /// if it isn't one of the known enum values (caller should report
    /// `UNKNOWN_PKG_MGR`).
    pub fn package_manager(&self) -> Option<PackageManager> {
        PackageManager::from_u8(self.package_manager_raw)
    }
}

/// Encode an `UPGRADE_REQUEST` frame into `buf`.
pub fn encode_upgrade_request(buf: &mut [u8; UPGRADE_REQUEST_LEN], req: UpgradeRequestWire) {
    let mut header = [0u8; HEADER_LEN];
    encode_header(&mut header, PacketType::UpgradeRequest, 0);
    buf[..HEADER_LEN].copy_from_slice(&header);

    let config_set_bytes = req.config_set.to_be_bytes();
    buf[CONFIG_SET_OFFSET..CONFIG_SET_OFFSET + 2].copy_from_slice(&config_set_bytes);
    buf[COMPR_TYPE_OFFSET] = req.compression_raw;
    buf[PKG_MGR_OFFSET] = req.package_manager_raw;
    let time_bytes = req.last_upgrade_time.to_be_bytes();
    buf[LAST_UPGRADE_TIME_OFFSET..LAST_UPGRADE_TIME_OFFSET + 4].copy_from_slice(&time_bytes);
}

/// Decode an `UPGRADE_REQUEST` frame. Fails with `UNKNOWN_PACKET_TYPE` if the
/// header names a different packet type, or with the header's own framing
/// errors (`UNKNOWN_PROTO_VER`/`UNKNOWN_FLAG`).
pub fn decode_upgrade_request(
    buf: &[u8; UPGRADE_REQUEST_LEN],
) -> Result<UpgradeRequestWire, ErrorCode> {
    let mut header_buf = [0u8; HEADER_LEN];
    header_buf.copy_from_slice(&buf[..HEADER_LEN]);
    let header = decode_header(&header_buf)?;
    if header.packet_type != PacketType::UpgradeRequest {
        return Err(ErrorCode::UnknownPacketType);
    }

    let config_set = u16::from_be_bytes([buf[CONFIG_SET_OFFSET], buf[CONFIG_SET_OFFSET + 1]]);
    let compression_raw = buf[COMPR_TYPE_OFFSET];
    let package_manager_raw = buf[PKG_MGR_OFFSET];
    let last_upgrade_time = u32::from_be_bytes([
        buf[LAST_UPGRADE_TIME_OFFSET],
        buf[LAST_UPGRADE_TIME_OFFSET + 1],
        buf[LAST_UPGRADE_TIME_OFFSET + 2],
        buf[LAST_UPGRADE_TIME_OFFSET + 3],
    ]);

    Ok(UpgradeRequestWire {
        config_set,
        compression_raw,
        package_manager_raw,
        last_upgrade_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn round_trip() {
        let req = UpgradeRequestWire::new(0, CompressionType::TarGz, PackageManager::Dpkg, 0);
        let mut buf = [0u8; UPGRADE_REQUEST_LEN];
        encode_upgrade_request(&mut buf, req);
        assert_eq!(decode_upgrade_request(&buf).unwrap(), req);
    }

    #[test]
    fn round_trip_large_fields() {
        let req = UpgradeRequestWire::new(u16::MAX, CompressionType::Zip, PackageManager::TarXz, u32::MAX);
        let mut buf = [0u8; UPGRADE_REQUEST_LEN];
        encode_upgrade_request(&mut buf, req);
        let decoded = decode_upgrade_request(&buf).unwrap();
        assert_eq!(decoded, req);
        assert_eq!(decoded.compression(), Some(CompressionType::Zip));
        assert_eq!(decoded.package_manager(), Some(PackageManager::TarXz));
    }

    #[test]
    fn unknown_compression_byte_is_preserved_for_caller_to_reject() {
        let mut buf = [0u8; UPGRADE_REQUEST_LEN];
        encode_upgrade_request(
            &mut buf,
            UpgradeRequestWire::new(1, CompressionType::None, PackageManager::Dpkg, 1),
        );
        buf[COMPR_TYPE_OFFSET] = 200;
        let decoded = decode_upgrade_request(&buf).unwrap();
        assert_eq!(decoded.compression(), None);
    }

    #[test]
    fn wrong_packet_type_is_rejected() {
        let mut buf = [0u8; UPGRADE_REQUEST_LEN];
        encode_upgrade_request(
            &mut buf,
            UpgradeRequestWire::new(1, CompressionType::None, PackageManager::Dpkg, 1),
        );
        buf[3] = PacketType::UpgradeResponse as u16 as u8;
        assert_eq!(
            decode_upgrade_request(&buf),
            Err(ErrorCode::UnknownPacketType)
        );
    }
}
