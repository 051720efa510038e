use std::env;

fn main() {
    // Tell Cargo to rerun if the linker script changes
    println!("cargo:rerun-if-changed=kernel.ld");

    // Host builds (unit tests) link normally; only the bare-metal image
    // needs the kernel layout.
    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("none") {
        let dir = env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| String::from("."));
        println!("cargo:rustc-link-arg-bins=-T{}/kernel.ld", dir);
    }
}
