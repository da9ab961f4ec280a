//! The wire envelope, payload codec, and op-name dispatch table.
//!
//! A request carries an `op_name`, an opaque payload, and a correlation id.
//! The dispatcher looks the op up in a [`HandlerRegistry`] built once at
//! startup, decodes the payload the way that handler expects, invokes it, and
//! re-encodes the result into a [`Reply`] that echoes the correlation id.
//!
//! Payloads default to a compact binary encoding; a leading `0xFF` byte
//! signals a JSON fallback for ops with no registered binary schema. This
//! crate does not ship a binary schema compiler, so [`JsonHandler`] always
//! emits the JSON-fallback form — a registered op with a real binary codec
//! can still implement [`Handler`] directly.

pub mod cancel;
pub mod dispatch;
pub mod envelope;
pub mod redact;
pub mod registry;

pub use cancel::{CancelOnDrop, CancellationToken};
pub use dispatch::Dispatcher;
pub use envelope::{decode_json_payload, encode_json_payload, Envelope, Reply, JSON_PREFIX};
pub use redact::redact;
pub use registry::{Handler, HandlerRegistry, JsonHandler, OpClass, RegistryError};
