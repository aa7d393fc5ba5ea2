fn main() {
    // This is a freestanding, `#![no_std]`/`#![no_main]` kernel binary with
    // its own `_start` symbol. No bare-metal target (e.g. x86_64-unknown-none)
    // or rust-src component is available in this build environment, so it is
    // linked against the host toolchain instead; suppress the host C
    // runtime's startup objects so its `_start`/`main` don't collide with
    // the kernel's own entry point.
    println!("cargo:rustc-link-arg-bins=-nostartfiles");
}
