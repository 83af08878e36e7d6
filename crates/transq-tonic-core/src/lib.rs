#![doc = include_str!("../README.md")]

mod common;
pub use common::*;
// Re-exported so downstream crates share one copy of the queue types.
pub use transq;

/// Generated protobuf messages and tonic client/server bindings.
pub mod proto {
    tonic::include_proto!("transq");

    /// Encoded descriptor set for `tonic-reflection`.
    pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("transq_descriptor");
}
