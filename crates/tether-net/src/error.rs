use crate::PeerId;

/// Errors that can occur while encoding, decoding or routing replication traffic.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("protocol version mismatch: expected {expected}, got {actual}")]
    ProtocolMismatch { expected: u16, actual: u16 },

    #[error("unknown peer {0}")]
    UnknownPeer(PeerId),
}
