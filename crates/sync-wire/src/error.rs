/// Typed error taxonomy carried on the wire inside a `PROTO_FAILURE` frame
/// (SPEC_FULL.md §7). Discriminants are the on-wire `u16` values and must
/// not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[repr(u16)]
pub enum ErrorCode {
    #[error("unknown protocol version")]
    UnknownProtoVer = 0,
    #[error("unknown or reserved flag bits set")]
    UnknownFlag = 1,
    #[error("unsupported package manager")]
    UnknownPkgMgr = 2,
    #[error("unsupported compression type")]
    UnknownComprType = 3,
    #[error("unknown configuration set")]
    UnknownConfigSet = 4,
    #[error("unexpected packet type")]
    UnknownPacketType = 5,
    #[error("malformed packet")]
    MalformedPacket = 6,
    #[error("internal server error")]
    ServerInternalErr = 7,
    #[error("internal client error")]
    ClientInternalErr = 8,
}

impl ErrorCode {
    pub fn from_u16(v: u16) -> Option<Self> {
        match v {
            0 => Some(Self::UnknownProtoVer),
            1 => Some(Self::UnknownFlag),
            2 => Some(Self::UnknownPkgMgr),
            3 => Some(Self::UnknownComprType),
            4 => Some(Self::UnknownConfigSet),
            5 => Some(Self::UnknownPacketType),
            6 => Some(Self::MalformedPacket),
            7 => Some(Self::ServerInternalErr),
            8 => Some(Self::ClientInternalErr),
            _ => None,
        }
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }
}
