//! gRPC transport tying the Tenant Client to a worker's Command Buffer
//! (spec.md §6), grounded on the `tonic`/`tonic-prost`/`build.rs` pattern
//! used elsewhere in this corpus for protobuf-defined services.

pub mod admin_service;
pub mod client;
pub mod router_service;
pub mod server;

/// Generated protobuf types for the `acs.v1` package.
pub mod proto {
    tonic::include_proto!("acs.v1");
}

/// Ceiling applied to both encoded and decoded message size on every service
/// and client in this module, so a misbehaving peer can't force an unbounded
/// allocation while decoding a single message.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

pub use admin_service::AdminGrpc;
pub use client::{GrpcConnector, GrpcTransport};
pub use router_service::RouterGrpc;
pub use server::AcsGrpc;
