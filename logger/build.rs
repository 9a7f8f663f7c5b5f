use std::env;
use std::path::Path;

fn main() {
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(value) => value,
        Err(err) => {
            eprintln!("CARGO_MANIFEST_DIR is not set: {err}");
            std::process::exit(1);
        },
    };

    let Some(workspace_root) = Path::new(&manifest_dir).parent() else {
        eprintln!("Manifest directory has no parent.");
        std::process::exit(1);
    };

    // Npcap SDK libraries (Packet.lib, wpcap.lib) may be dropped into ./lib on Windows.
    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("windows") {
        println!(
            "cargo:rustc-link-search=native={}",
            workspace_root.join("lib").display()
        );
    }
}
