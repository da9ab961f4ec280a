use crate::acs_error::AcsErrorKind;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Leading byte of `payload_bytes`/`result_bytes` that signals the JSON fallback
/// encoding rather than a binary schema-driven one.
pub const JSON_PREFIX: u8 = 0xFF;

/// A request: a logical operation name plus an opaque payload.
///
/// `payload_bytes` is interpreted solely by looking `op_name` up in the
/// handler registry (I-W3) — nothing upstream of the handler inspects it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub op_name: String,
    pub payload_bytes: Vec<u8>,
    pub correlation_id: String,
}

impl Envelope {
    pub fn new(
        op_name: impl Into<String>,
        payload_bytes: Vec<u8>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self { op_name: op_name.into(), payload_bytes, correlation_id: correlation_id.into() }
    }
}

/// A reply to an [`Envelope`]. `correlation_id` always echoes the request's (I-W1).
///
/// When `success` is `false`, `error_message` is non-empty and `result_bytes`
/// is empty (I-W2).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub success: bool,
    pub result_bytes: Vec<u8>,
    pub error_message: String,
    pub correlation_id: String,
}

impl Reply {
    pub fn success(result_bytes: Vec<u8>, correlation_id: impl Into<String>) -> Self {
        Self { success: true, result_bytes, error_message: String::new(), correlation_id: correlation_id.into() }
    }

    pub fn failure(kind: &AcsErrorKind, correlation_id: impl Into<String>) -> Self {
        Self {
            success: false,
            result_bytes: Vec::new(),
            error_message: crate::acs_error::redact(&kind.to_string()),
            correlation_id: correlation_id.into(),
        }
    }
}

/// Encode a value as the JSON-fallback payload form: `0xFF` followed by the
/// JSON bytes.
pub fn encode_json_payload<T: Serialize>(value: &T) -> Vec<u8> {
    let mut out = Vec::with_capacity(128);
    out.push(JSON_PREFIX);
    serde_json::to_writer(&mut out, value).expect("serde_json::Value serialization cannot fail");
    out
}

/// Decode a JSON-fallback payload, checking the `0xFF` prefix first (I-W3).
pub fn decode_json_payload<T: DeserializeOwned>(
    op_name: &str,
    bytes: &[u8],
) -> Result<T, AcsErrorKind> {
    match bytes.split_first() {
        Some((&JSON_PREFIX, rest)) => serde_json::from_slice(rest).map_err(|e| {
            AcsErrorKind::BadPayload { op_name: op_name.to_string(), reason: e.to_string() }
        }),
        _ => Err(AcsErrorKind::BadPayload {
            op_name: op_name.to_string(),
            reason: "no binary schema registered for this op; expected 0xFF JSON fallback prefix"
                .to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Ping {
        n: u32,
    }

    #[test]
    fn json_payload_round_trips() {
        let encoded = encode_json_payload(&Ping { n: 7 });
        assert_eq!(encoded[0], JSON_PREFIX);
        let decoded: Ping = decode_json_payload("ping", &encoded).unwrap();
        assert_eq!(decoded, Ping { n: 7 });
    }

    #[test]
    fn missing_prefix_is_bad_payload() {
        let err = decode_json_payload::<Ping>("ping", &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, AcsErrorKind::BadPayload { .. }));
    }

    #[test]
    fn failure_reply_has_empty_result_and_nonempty_message() {
        let reply = Reply::failure(&AcsErrorKind::UnknownOp { op_name: "foo".into() }, "corr-1");
        assert!(!reply.success);
        assert!(reply.result_bytes.is_empty());
        assert!(!reply.error_message.is_empty());
        assert_eq!(reply.correlation_id, "corr-1");
    }
}
