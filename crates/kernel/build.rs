use std::{env, error::Error, path::PathBuf};

fn main() -> Result<(), Box<dyn Error>> {
    // Host builds (unit tests, tooling) link normally.
    if env::var("CARGO_CFG_TARGET_OS").unwrap_or_default() != "none" {
        return Ok(());
    }

    let arch = env::var("CARGO_CFG_TARGET_ARCH")?;
    let script = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?).join(format!("linker-{arch}.ld"));
    println!("cargo:rustc-link-arg-bins=-T{}", script.display());
    println!("cargo:rerun-if-changed={}", script.display());
    Ok(())
}
