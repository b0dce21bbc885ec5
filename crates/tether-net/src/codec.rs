//! Versioned JSON wire codec

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::NetError;

/// Wire protocol version, bumped whenever a replicated message changes shape
pub const PROTOCOL_VERSION: u16 = 1;

/// Every message on the wire is wrapped with the protocol version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub protocol: u16,
    pub payload: T,
}

/// Serialize a message into a versioned envelope
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, NetError> {
    let envelope = Envelope {
        protocol: PROTOCOL_VERSION,
        payload: message,
    };
    serde_json::to_vec(&envelope).map_err(NetError::Encode)
}

/// Deserialize a message, rejecting envelopes from another protocol version
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, NetError> {
    let envelope: Envelope<T> = serde_json::from_slice(bytes).map_err(NetError::Decode)?;
    if envelope.protocol != PROTOCOL_VERSION {
        return Err(NetError::ProtocolMismatch {
            expected: PROTOCOL_VERSION,
            actual: envelope.protocol,
        });
    }
    Ok(envelope.payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    enum Ping {
        Hello { name: String },
    }

    #[test]
    fn test_encode_decode() {
        let message = Ping::Hello { name: "server".into() };
        let bytes = encode(&message).unwrap();
        let decoded: Ping = decode(&bytes).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_rejects_other_protocol_version() {
        let bytes = serde_json::to_vec(&Envelope {
            protocol: PROTOCOL_VERSION + 1,
            payload: 5u32,
        })
        .unwrap();
        let result: Result<u32, _> = decode(&bytes);
        assert!(matches!(result, Err(NetError::ProtocolMismatch { .. })));
    }

    #[test]
    fn test_rejects_garbage() {
        let result: Result<u32, _> = decode(b"not json");
        assert!(matches!(result, Err(NetError::Decode(_))));
    }
}
