//! Embeds the current git revision so the panel header can show it.

use std::process::Command;

fn main() {
    let describe = Command::new("git")
        .args(["describe", "--always", "--dirty"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_string());

    println!("cargo:rustc-env=GIT_HASH={}", describe.unwrap_or_else(|| "unknown".to_string()));
    println!("cargo:rerun-if-changed=.git/HEAD");
}
