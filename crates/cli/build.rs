use std::process::Command;

// `duodata --version` names the commit it was built from
fn main() {
    println!("cargo:rerun-if-changed=../../.git/HEAD");

    let describe = Command::new("git")
        .args(["describe", "--always", "--dirty", "--abbrev=7"])
        .output();
    let commit = match describe {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        }
        _ => "unknown".to_string(),
    };

    println!("cargo:rustc-env=DUODATA_BUILD_COMMIT={}", commit);
}
