//! Chunk records, the newline-delimited corpus file, and raw document loading.

use crate::error::{Error, Result};
use crate::persist::ensure_parent;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use walkdir::WalkDir;

fn unknown_source() -> String { "unknown".to_string() }

/// A bounded segment of source text with a stable identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    #[serde(default = "unknown_source")]
    pub source: String,
    pub text: String,
}

/// A raw input document, named after the file it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub name: String,
    pub text: String,
}

/// Read every chunk record from a JSONL corpus. Blank lines are skipped; any
/// other line that does not parse aborts the read with its line number.
pub fn read_chunks(path: &Path) -> Result<Vec<Chunk>> {
    if !path.exists() {
        return Err(Error::not_found("chunk corpus", path));
    }
    let reader = BufReader::new(File::open(path)?);
    let mut chunks = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let chunk: Chunk = serde_json::from_str(&line).map_err(|source| Error::MalformedRecord {
            path: path.to_path_buf(),
            line: i + 1,
            source,
        })?;
        chunks.push(chunk);
    }
    Ok(chunks)
}

/// Index a corpus by chunk id.
pub fn read_chunk_map(path: &Path) -> Result<HashMap<String, Chunk>> {
    let chunks = read_chunks(path)?;
    Ok(chunks.into_iter().map(|c| (c.id.clone(), c)).collect())
}

/// Overwrite `path` with one JSON record per chunk.
pub fn write_chunks(path: &Path, chunks: &[Chunk]) -> Result<()> {
    ensure_parent(path)?;
    let mut out = BufWriter::new(File::create(path)?);
    for chunk in chunks {
        serde_json::to_writer(&mut out, chunk)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

/// Load every `*.txt` file directly under `dir`, ordered by file name.
pub fn load_documents(dir: &Path) -> Result<Vec<Document>> {
    if !dir.is_dir() {
        return Err(Error::not_found("data directory", dir));
    }
    let mut docs = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let p = entry.path();
        if !p.is_file() { continue; }
        let is_txt = p
            .extension()
            .and_then(|s| s.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("txt"))
            .unwrap_or(false);
        if !is_txt { continue; }
        let text = fs::read_to_string(p)?;
        let name = entry.file_name().to_string_lossy().into_owned();
        docs.push(Document { name, text });
    }
    tracing::debug!(dir = %dir.display(), count = docs.len(), "loaded documents");
    Ok(docs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn chunk(id: &str, source: &str, text: &str) -> Chunk {
        Chunk { id: id.into(), source: source.into(), text: text.into() }
    }

    #[test]
    fn corpus_roundtrip_keeps_order_and_unicode() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chunks.jsonl");
        let chunks = vec![
            chunk("chunk_0", "a.txt", "धर्मक्षेत्रे कुरुक्षेत्रे।"),
            chunk("chunk_1", "b.txt", "Plain text."),
        ];
        write_chunks(&path, &chunks).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("धर्मक्षेत्रे"));
        assert_eq!(read_chunks(&path).unwrap(), chunks);
    }

    #[test]
    fn missing_source_defaults_to_unknown_and_blank_lines_skip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chunks.jsonl");
        fs::write(&path, "{\"id\":\"chunk_0\",\"text\":\"hi\"}\n\n").unwrap();
        let chunks = read_chunks(&path).unwrap();
        assert_eq!(chunks, vec![chunk("chunk_0", "unknown", "hi")]);
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chunks.jsonl");
        fs::write(&path, "{\"id\":\"chunk_0\",\"source\":\"a\",\"text\":\"x\"}\n{\"id\":1}\n").unwrap();
        match read_chunks(&path) {
            Err(Error::MalformedRecord { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected malformed record, got {other:?}"),
        }
    }

    #[test]
    fn missing_corpus_is_not_found() {
        let dir = tempdir().unwrap();
        assert!(read_chunks(&dir.path().join("absent.jsonl")).unwrap_err().is_not_found());
    }

    #[test]
    fn loads_only_txt_files_sorted() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "second").unwrap();
        fs::write(dir.path().join("A.TXT"), "first").unwrap();
        fs::write(dir.path().join("notes.md"), "skip").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/c.txt"), "nested").unwrap();
        let docs = load_documents(dir.path()).unwrap();
        let names: Vec<_> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["A.TXT", "b.txt"]);
    }

    #[test]
    fn missing_data_dir_is_not_found() {
        let dir = tempdir().unwrap();
        assert!(load_documents(&dir.path().join("nope")).unwrap_err().is_not_found());
    }
}
