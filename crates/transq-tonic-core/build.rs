/// Builds the gRPC client and server code for `transq.proto` using
/// `tonic-prost-build`.
///
/// The generated modules land in the crate's `OUT_DIR`, together with an
/// encoded file descriptor set used by the server's reflection service.
///
/// # Files and Paths
///
/// - Proto file: `proto/transq.proto`
/// - Includes: `proto/`
/// - Descriptor: `$OUT_DIR/transq_descriptor.bin`
///
/// # Panics
///
/// Panics if `OUT_DIR` is unset or code generation fails.
use std::env;
use std::path::PathBuf;
fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let descriptor_path = out_dir.join("transq_descriptor.bin");

    let mut config = tonic_prost_build::Config::new();
    config.file_descriptor_set_path(&descriptor_path);

    tonic_prost_build::configure()
        .compile_with_config(config, &["proto/transq.proto"], &["proto"])
        .unwrap();
}
