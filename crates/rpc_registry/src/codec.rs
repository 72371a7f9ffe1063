//! Payload serialization and the response envelope.

use bytes::Bytes;
use prost::Message;

/// How payloads and envelopes are framed on the wire.
///
/// Client and server must agree; the protocol reports the strategy it speaks
/// and the server handler is configured with one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Serialization {
    /// Plain protobuf message bytes.
    #[default]
    Protobuf,

    /// Varint length-prefixed protobuf, for transports that frame a byte stream.
    ProtobufDelimited,
}

impl Serialization {
    pub fn encode<M: Message>(&self, msg: &M) -> Bytes {
        match self {
            Serialization::Protobuf => msg.encode_to_vec().into(),
            Serialization::ProtobufDelimited => msg.encode_length_delimited_to_vec().into(),
        }
    }

    pub fn decode<M: Message + Default>(&self, bytes: Bytes) -> Result<M, prost::DecodeError> {
        match self {
            Serialization::Protobuf => M::decode(bytes),
            Serialization::ProtobufDelimited => M::decode_length_delimited(bytes),
        }
    }
}

/// The outcome of one request as sent back by a server handler.
#[derive(Clone, PartialEq, Message)]
pub struct Exit {
    #[prost(oneof = "exit::Outcome", tags = "1, 2")]
    pub outcome: Option<exit::Outcome>,
}

pub mod exit {
    use bytes::Bytes;

    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Outcome {
        /// Encoded success message.
        #[prost(bytes = "bytes", tag = "1")]
        Success(Bytes),

        /// Encoded declared failure.
        #[prost(bytes = "bytes", tag = "2")]
        Failure(Bytes),
    }
}

impl Exit {
    pub fn success(bytes: Bytes) -> Self {
        Self {
            outcome: Some(exit::Outcome::Success(bytes)),
        }
    }

    pub fn failure(bytes: Bytes) -> Self {
        Self {
            outcome: Some(exit::Outcome::Failure(bytes)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SayHello;

    #[test]
    fn test_delimited_prefixes_length() {
        let msg = SayHello {
            name: "Ben".to_string(),
        };
        let plain = Serialization::Protobuf.encode(&msg);
        let delimited = Serialization::ProtobufDelimited.encode(&msg);

        assert_eq!(delimited.len(), plain.len() + 1);
        assert_eq!(delimited[0] as usize, plain.len());
        assert_eq!(&delimited[1..], &plain[..]);
    }

    #[test]
    fn test_strategies_do_not_mix() {
        let msg = SayHello {
            name: "a rather long name to make the prefix byte meaningful".to_string(),
        };
        let delimited = Serialization::ProtobufDelimited.encode(&msg);

        let decoded: Result<SayHello, _> = Serialization::Protobuf.decode(delimited);
        assert_ne!(decoded.ok(), Some(msg));
    }

    #[test]
    fn test_exit_keeps_outcome_kind() {
        let envelope = Exit::failure(Bytes::from_static(b"\x0a\x01x"));
        let decoded: Exit = Serialization::Protobuf
            .decode(Serialization::Protobuf.encode(&envelope))
            .unwrap();
        assert!(matches!(decoded.outcome, Some(exit::Outcome::Failure(_))));
    }

    #[test]
    fn test_empty_exit_has_no_outcome() {
        let decoded: Exit = Serialization::Protobuf.decode(Bytes::new()).unwrap();
        assert!(decoded.outcome.is_none());
    }
}
