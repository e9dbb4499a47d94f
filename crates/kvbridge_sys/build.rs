//! Links the system `unqlite` library when the `native` feature is enabled.
//!
//! `UNQLITE_LIB_DIR` adds a search directory and `UNQLITE_STATIC=1` requests
//! static linking. Without the feature nothing is linked and only the
//! in-process engines can back a connection.
use std::env;

fn main() {
    println!("cargo:rerun-if-env-changed=UNQLITE_LIB_DIR");
    println!("cargo:rerun-if-env-changed=UNQLITE_STATIC");

    if env::var_os("CARGO_FEATURE_NATIVE").is_none() {
        return;
    }

    if let Some(dir) = env::var_os("UNQLITE_LIB_DIR") {
        println!("cargo:rustc-link-search=native={}", dir.to_string_lossy());
    }

    let kind = match env::var("UNQLITE_STATIC").as_deref() {
        Ok("1") => "static",
        _ => "dylib",
    };
    println!("cargo:rustc-link-lib={kind}=unqlite");
}
