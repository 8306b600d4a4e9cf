use crate::InMemoryStore;
use jobboard_core::Document;
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

/// Read one JSON document per line; blank and unparseable lines are skipped.
pub fn read_jsonl(path: &Path) -> std::io::Result<Vec<Document>> {
    let fh = File::open(path)?;
    let br = BufReader::new(fh);
    let mut out = Vec::new();
    for (n, line) in br.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(v) => out.push(v),
            Err(e) => tracing::warn!(
                path = %path.display(),
                line = n + 1,
                error = %e,
                "skipping bad record"
            ),
        }
    }
    Ok(out)
}

/// `<dir>/<collection>.jsonl` files, sorted by collection name.
pub fn collection_files(dir: &Path) -> std::io::Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) != Some("jsonl") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            files.push((stem.to_string(), path.clone()));
        }
    }
    files.sort();
    Ok(files)
}

/// Seed an in-memory store from a directory of collection dumps.
pub fn load_dir(dir: &Path) -> std::io::Result<InMemoryStore> {
    let store = InMemoryStore::new();
    for (collection, path) in collection_files(dir)? {
        let docs = read_jsonl(&path)?;
        let loaded = store.seed(&collection, docs);
        tracing::info!(collection = %collection, loaded, "seeded collection");
    }
    Ok(store)
}
