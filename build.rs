//! Build script embedding the source revision into the `rail-quote` version string

use std::process::Command;

fn short_revision() -> Option<String> {
    let output = Command::new("git").args(["rev-parse", "--short", "HEAD"]).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let rev = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!rev.is_empty()).then_some(rev)
}

fn main() {
    let revision = short_revision().unwrap_or_else(|| String::from("unknown"));
    println!("cargo:rustc-env=RAIL_REVISION={}", revision);
    println!("cargo:rerun-if-changed=.git/HEAD");
}
