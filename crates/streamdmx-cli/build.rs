use std::env;
use std::process::Command;

const UNKNOWN: &str = "unknown";

/// Commit and date baked into `streamdmx --version`.
struct BuildInfo {
    commit: String,
    date: String,
}

impl BuildInfo {
    fn detect() -> Self {
        let commit = override_commit()
            .or_else(|| git(&["describe", "--always", "--dirty", "--abbrev=10"]))
            .unwrap_or_else(|| UNKNOWN.to_string());
        let date = git(&["log", "-1", "--format=%cs"]).unwrap_or_else(|| UNKNOWN.to_string());
        Self { commit, date }
    }

    fn emit(&self) {
        println!("cargo:rustc-env=STREAMDMX_BUILD_COMMIT={}", self.commit);
        println!("cargo:rustc-env=STREAMDMX_BUILD_DATE={}", self.date);
    }
}

/// Release pipelines pin the commit through the environment; CI checkouts
/// may be shallow or detached.
fn override_commit() -> Option<String> {
    ["STREAMDMX_BUILD_COMMIT", "GITHUB_SHA"]
        .iter()
        .filter_map(|name| env::var(name).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .map(|value| value.chars().take(10).collect())
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let value = String::from_utf8(output.stdout).ok()?;
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn main() {
    for name in ["STREAMDMX_BUILD_COMMIT", "GITHUB_SHA"] {
        println!("cargo:rerun-if-env-changed={name}");
    }
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-changed=../../.git/index");

    BuildInfo::detect().emit();
}
