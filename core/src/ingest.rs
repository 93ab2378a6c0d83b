//! Loading metadata rows and full-text tokens from JSON files on disk.

use crate::error::Result;
use crate::tokenizer::preprocess;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Deserialize)]
struct JsonPaper {
    paper_id: String,
    #[serde(default, rename = "abstract")]
    abstract_paragraphs: Vec<Paragraph>,
    #[serde(default)]
    body_text: Vec<Paragraph>,
}

#[derive(Debug, Deserialize)]
struct Paragraph {
    text: String,
}

/// Files under `path` with one of the given extensions, sorted. A file path is returned as is.
/// A missing or unreadable path is an error.
fn files_with_ext(path: &Path, exts: &[&str]) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(path) {
        let p = entry?.into_path();
        if p.is_file() && p.extension().and_then(|s| s.to_str()).is_some_and(|ext| exts.contains(&ext)) {
            files.push(p);
        }
    }
    files.sort();
    Ok(files)
}

/// Metadata rows from a `.json` file (one object or an array), a `.jsonl` file, or a
/// directory of them.
pub fn load_rows<P: AsRef<Path>>(path: P) -> Result<Vec<Value>> {
    let path = path.as_ref();
    tracing::info!(path = %path.display(), "loading metadata");
    let mut rows = Vec::new();
    for file in files_with_ext(path, &["json", "jsonl"])? {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            let reader = BufReader::new(File::open(&file)?);
            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                rows.push(serde_json::from_str(&line)?);
            }
        } else {
            let reader = BufReader::new(File::open(&file)?);
            match serde_json::from_reader(reader)? {
                Value::Array(items) => rows.extend(items),
                other => rows.push(other),
            }
        }
    }
    tracing::info!(num_rows = rows.len(), "loaded metadata");
    Ok(rows)
}

/// Preprocessed body text of every full-text paper under `dir`, keyed by paper id.
/// Papers that cannot be read are skipped with a warning.
pub fn load_text_tokens<P: AsRef<Path>>(dir: P) -> Result<HashMap<String, Vec<String>>> {
    let dir = dir.as_ref();
    let mut tokens = HashMap::new();
    for file in files_with_ext(dir, &["json"])? {
        let paper: JsonPaper = match File::open(&file).map(BufReader::new) {
            Ok(reader) => match serde_json::from_reader(reader) {
                Ok(p) => p,
                Err(err) => {
                    tracing::warn!(file = %file.display(), %err, "skipping unreadable paper");
                    continue;
                }
            },
            Err(err) => {
                tracing::warn!(file = %file.display(), %err, "skipping unreadable paper");
                continue;
            }
        };
        let text = paper
            .abstract_paragraphs
            .iter()
            .chain(paper.body_text.iter())
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        tokens.insert(paper.paper_id, preprocess(&text));
    }
    tracing::info!(num_papers = tokens.len(), "loaded full texts");
    Ok(tokens)
}
