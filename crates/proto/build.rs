fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Client bindings only - gtel never serves gNMI.
    tonic_build::configure()
        .build_server(false)
        .compile_protos(&["proto/gnmi.proto"], &["proto"])?;

    Ok(())
}
