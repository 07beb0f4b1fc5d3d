//! Build script for proto compilation.
//!
//! The generated code is committed to the repository as `src/generated.rs`,
//! so `protoc` is only needed when `proto/plugin.proto` changes.
//!
//! To regenerate: `cargo build --features regenerate-proto`

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "regenerate-proto")]
    {
        let out_dir = std::path::PathBuf::from("src");
        tonic_prost_build::configure()
            .build_client(false)
            .out_dir(&out_dir)
            .compile_protos(&["proto/plugin.proto"], &["proto"])?;

        let generated = out_dir.join("fram.plugin.v1.rs");
        let target = out_dir.join("generated.rs");
        if generated.exists() {
            std::fs::rename(generated, target)?;
        }
    }

    println!("cargo:rerun-if-changed=proto/plugin.proto");

    Ok(())
}
