// SPDX-License-Identifier: GPL-3.0-only

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");
    println!("cargo::rerun-if-env-changed=PHOTOSTRIP_VERSION");

    // Packagers can pin the version string
    let version = std::env::var("PHOTOSTRIP_VERSION").unwrap_or_else(|_| git_version());

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// `0.2.0` on a tag, `0.2.0+3.abcdef1` past one, the package version otherwise
fn git_version() -> String {
    let fallback = env!("CARGO_PKG_VERSION").to_string();

    let Some(described) = git(&["describe", "--tags", "--match", "v*"]) else {
        return match git(&["rev-parse", "--short", "HEAD"]) {
            Some(hash) => format!("{}+{}", fallback, hash),
            None => fallback,
        };
    };
    let described = described.strip_prefix('v').unwrap_or(&described);

    // "<tag>-<commits>-g<hash>" when HEAD is past the tag
    let parts: Vec<&str> = described.rsplitn(3, '-').collect();
    match parts.as_slice() {
        [hash, commits, tag] => {
            let hash = hash.strip_prefix('g').unwrap_or(hash);
            format!("{}+{}.{}", tag, commits, hash)
        }
        _ => described.to_string(),
    }
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}
