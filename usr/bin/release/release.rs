//! Release script for pmp-cli: quality gates, then publish, tag, and GitHub release.
//! Run from repository root: cargo run -p release [-- --dry-run] [-- --yes]

use std::io::{self, Write};
use std::process::Command;

const GREEN: &str = "\x1b[0;32m";
const RED: &str = "\x1b[1;31m";
const YELLOW: &str = "\x1b[1;33m";
const NC: &str = "\x1b[0m";

/// Published in dependency order.
const CRATES: [&str; 2] = ["pmp_lib", "pmp"];

const GATES: [&[&str]; 3] = [
    &["fmt", "--all", "--", "--check"],
    &[
        "clippy",
        "--workspace",
        "--all-targets",
        "--",
        "-D",
        "warnings",
    ],
    &["test", "--workspace"],
];

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let dry_run = args.iter().any(|a| a == "--dry-run");
    let assume_yes = args.iter().any(|a| a == "--yes" || a == "-y");

    let root = match std::env::current_dir() {
        Ok(dir) => dir.to_string_lossy().into_owned(),
        Err(e) => fail(&format!("cannot determine current directory: {}", e)),
    };

    for gate in GATES {
        run_cmd(&root, "cargo", gate);
    }
    if dry_run {
        println!("{}Gates passed (dry run, nothing published){}", GREEN, NC);
        return;
    }

    if !git_clean(&root) {
        eprintln!(
            "{}git working directory not clean, please commit your changes first{}",
            RED, NC
        );
        fail("cargo fmt may have modified files; review and commit before releasing");
    }

    let manifest = std::fs::read_to_string(std::path::Path::new(&root).join("Cargo.toml"))
        .unwrap_or_else(|e| fail(&format!("cannot read root Cargo.toml: {}", e)));
    let version = workspace_version(&manifest)
        .unwrap_or_else(|| fail("version not found in [workspace.package]"));
    let tag = format!("v{}", version);

    if !assume_yes && !confirm(&format!("Release {} ({})?", version, CRATES.join(", "))) {
        println!("Exiting");
        std::process::exit(1);
    }

    for krate in CRATES {
        run_cmd(&root, "cargo", &["publish", "-p", krate]);
    }
    run_cmd(&root, "git", &["tag", &tag]);
    run_cmd(&root, "git", &["push", "--tags"]);
    if Command::new("gh").arg("--version").output().is_ok() {
        run_cmd(&root, "gh", &["release", "create", &tag, "--generate-notes"]);
    } else {
        eprintln!(
            "{}gh CLI not found, skipping GitHub release creation{}",
            YELLOW, NC
        );
    }
    println!("{}Release {} completed!{}", GREEN, version, NC);
}

fn confirm(question: &str) -> bool {
    print!("{} [Y/n] ", question);
    let _ = io::stdout().flush();
    let mut line = String::new();
    if io::stdin().read_line(&mut line).is_err() {
        return false;
    }
    let answer = line.trim();
    answer.is_empty() || answer.eq_ignore_ascii_case("y")
}

fn git_clean(root: &str) -> bool {
    Command::new("git")
        .args(["diff", "--quiet"])
        .current_dir(root)
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn run_cmd(root: &str, bin: &str, args: &[&str]) {
    let display = format!("{} {}", bin, args.join(" "));
    eprintln!("{}{}{}", GREEN, display, NC);
    let status = Command::new(bin).args(args).current_dir(root).status();
    match status {
        Ok(s) if s.success() => {}
        Ok(_) => fail(&format!("Command failed: {}", display)),
        Err(e) => fail(&format!("Cannot run {}: {}", display, e)),
    }
}

fn fail(message: &str) -> ! {
    eprintln!("{}{}{}", RED, message, NC);
    std::process::exit(1);
}

/// `version` from the `[workspace.package]` table of a manifest.
fn workspace_version(manifest: &str) -> Option<String> {
    let mut in_package = false;
    for line in manifest.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            in_package = line == "[workspace.package]";
            continue;
        }
        if in_package {
            if let Some(rest) = line.strip_prefix("version") {
                let value = rest.trim_start().strip_prefix('=')?.trim();
                return Some(value.trim_matches('"').to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_workspace_package_version() {
        let manifest = r#"
[workspace]
members = ["pmp_lib"]

[workspace.package]
edition = "2021"
version = "1.4.2"
"#;
        assert_eq!(workspace_version(manifest).as_deref(), Some("1.4.2"));
    }

    #[test]
    fn ignores_versions_outside_workspace_package() {
        let manifest = r#"
[package]
version = "9.9.9"
"#;
        assert_eq!(workspace_version(manifest), None);
    }
}
