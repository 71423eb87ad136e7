use std::fs;
use std::path::{Path, PathBuf};

fn collect_rs_files(dir: &Path, out: &mut Vec<PathBuf>) {
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                collect_rs_files(&path, out);
            } else if path.extension().and_then(|s| s.to_str()) == Some("rs") {
                out.push(path);
            }
        }
    }
}

#[test]
fn engine_crates_only_reach_the_outside_through_effects() {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let repo_root = manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("repo root");

    let checked = ["crates/fabop-core", "crates/fabop-restart"];

    let patterns = [
        ("Utc::now", "Use PhysicalTimeEffects::now instead of Utc::now"),
        ("SystemTime::now", "Use PhysicalTimeEffects::now instead of SystemTime::now"),
        ("tokio::time::sleep", "Use PhysicalTimeEffects::sleep_ms instead of tokio::time::sleep"),
        ("thread_rng", "Use RandomEffects instead of thread_rng"),
        ("kube::", "Use the effect traits instead of calling the Kubernetes API"),
    ];

    let mut files = Vec::new();
    for dir in checked {
        collect_rs_files(&repo_root.join(dir), &mut files);
    }

    let mut violations = Vec::new();
    for file in files {
        let rel = file.strip_prefix(repo_root).unwrap_or(&file);
        let rel_str = rel.to_string_lossy();

        let Ok(contents) = fs::read_to_string(&file) else {
            continue;
        };

        for (pattern, guidance) in patterns {
            if contents.contains(pattern) {
                violations.push(format!("{rel_str}: found '{pattern}' ({guidance})"));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Impure API usage detected:\n{}",
        violations.join("\n")
    );
}
