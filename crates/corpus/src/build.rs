//! Offline index build: dump → sorted data file + offset index.
//!
//! Reads a raw JSON-array dump, keeps records carrying a `title`, sorts them
//! by title (code point order, the same order [`crate::CorpusStore`] compares
//! with), and writes the records as compact JSON lines alongside a parallel
//! byte-offset array. Both files come from the same sorted pass, which is
//! what makes binary search over the offsets valid.

use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::{info, instrument};

use biograph_shared::{BiographError, Result};

/// Summary of a completed index build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// Records written to the data file and index.
    pub indexed: usize,
    /// Records excluded for lacking a title.
    pub dropped: usize,
}

/// Build a corpus data file and offset index from a JSON-array dump.
///
/// Records without a string `title` are dropped (reported, not an error).
/// Duplicate titles are rejected: lookup assumes titles are unique, and a
/// dump with collisions needs curation before it can be indexed.
#[instrument(skip_all, fields(input = %input.display()))]
pub fn build_index(input: &Path, data_out: &Path, index_out: &Path) -> Result<BuildReport> {
    let content = std::fs::read_to_string(input).map_err(|e| BiographError::io(input, e))?;
    let records: Vec<serde_json::Value> = serde_json::from_str(&content)
        .map_err(|e| BiographError::parse(format!("{} is not a JSON array: {e}", input.display())))?;

    let total = records.len();
    let mut titled: Vec<(String, serde_json::Value)> = Vec::with_capacity(total);

    for record in records {
        if let Some(title) = record.get("title").and_then(|t| t.as_str()) {
            let title = title.to_string();
            titled.push((title, record));
        }
    }
    let dropped = total - titled.len();

    // Stable sort by code point, matching the store's comparison order.
    titled.sort_by(|a, b| a.0.cmp(&b.0));

    if let Some(dup) = first_duplicate(&titled) {
        return Err(BiographError::config(format!(
            "duplicate title {dup:?} in {}; corpus titles must be unique",
            input.display()
        )));
    }

    let data_file =
        std::fs::File::create(data_out).map_err(|e| BiographError::io(data_out, e))?;
    let mut writer = BufWriter::new(data_file);

    let mut offsets: Vec<u64> = Vec::with_capacity(titled.len());
    let mut offset = 0u64;

    for (_, record) in &titled {
        let line = serde_json::to_string(record)
            .map_err(|e| BiographError::parse(format!("unserializable record: {e}")))?;
        writer
            .write_all(line.as_bytes())
            .and_then(|()| writer.write_all(b"\n"))
            .map_err(|e| BiographError::io(data_out, e))?;

        offsets.push(offset);
        offset += line.len() as u64 + 1;
    }
    writer.flush().map_err(|e| BiographError::io(data_out, e))?;

    let index_json = serde_json::to_string(&offsets)
        .map_err(|e| BiographError::parse(format!("unserializable offsets: {e}")))?;
    std::fs::write(index_out, index_json).map_err(|e| BiographError::io(index_out, e))?;

    let report = BuildReport {
        indexed: titled.len(),
        dropped,
    };

    info!(
        indexed = report.indexed,
        dropped = report.dropped,
        data = %data_out.display(),
        index = %index_out.display(),
        "index build complete"
    );

    Ok(report)
}

/// First title appearing more than once in a sorted slice, if any.
fn first_duplicate(sorted: &[(String, serde_json::Value)]) -> Option<&str> {
    sorted
        .windows(2)
        .find(|w| w[0].0 == w[1].0)
        .map(|w| w[0].0.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use tempfile::TempDir;

    fn paths(dir: &TempDir) -> (std::path::PathBuf, std::path::PathBuf, std::path::PathBuf) {
        (
            dir.path().join("dump.json"),
            dir.path().join("dump.dat"),
            dir.path().join("dump_offsets.json"),
        )
    }

    #[test]
    fn untitled_records_are_dropped_and_counted() {
        let dir = TempDir::new().unwrap();
        let (input, data, index) = paths(&dir);

        let dump = json!([
            {"title": "Zola", "text": "a"},
            {"ns": 0},
            {"title": "Balzac", "text": "b"},
            {"redirect": true},
        ]);
        std::fs::write(&input, serde_json::to_vec(&dump).unwrap()).unwrap();

        let report = build_index(&input, &data, &index).expect("build");
        assert_eq!(report, BuildReport { indexed: 2, dropped: 2 });

        let offsets: Vec<u64> =
            serde_json::from_str(&std::fs::read_to_string(&index).unwrap()).unwrap();
        assert_eq!(offsets.len(), 2);
        assert_eq!(offsets[0], 0);

        // Data file is sorted by title.
        let content = std::fs::read_to_string(&data).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert!(lines[0].contains("Balzac"));
        assert!(lines[1].contains("Zola"));
    }

    #[test]
    fn offsets_point_at_record_starts() {
        let dir = TempDir::new().unwrap();
        let (input, data, index) = paths(&dir);

        let dump = json!([
            {"title": "B", "text": "second"},
            {"title": "A", "text": "first"},
            {"title": "C", "text": "third"},
        ]);
        std::fs::write(&input, serde_json::to_vec(&dump).unwrap()).unwrap();
        build_index(&input, &data, &index).expect("build");

        let content = std::fs::read(&data).unwrap();
        let offsets: Vec<u64> =
            serde_json::from_str(&std::fs::read_to_string(&index).unwrap()).unwrap();

        for &off in &offsets {
            // Every offset lands on the opening brace of a JSON object.
            assert_eq!(content[off as usize], b'{');
        }
    }

    #[test]
    fn duplicate_titles_are_rejected() {
        let dir = TempDir::new().unwrap();
        let (input, data, index) = paths(&dir);

        let dump = json!([
            {"title": "Jean Dupont", "text": "a"},
            {"title": "Jean Dupont", "text": "b"},
        ]);
        std::fs::write(&input, serde_json::to_vec(&dump).unwrap()).unwrap();

        let err = build_index(&input, &data, &index).unwrap_err();
        assert!(err.to_string().contains("duplicate title"));
        assert!(err.to_string().contains("Jean Dupont"));
    }

    #[test]
    fn empty_dump_builds_an_empty_index() {
        let dir = TempDir::new().unwrap();
        let (input, data, index) = paths(&dir);

        std::fs::write(&input, "[]").unwrap();
        let report = build_index(&input, &data, &index).expect("build");
        assert_eq!(report, BuildReport { indexed: 0, dropped: 0 });
        assert_eq!(std::fs::read_to_string(&index).unwrap(), "[]");
    }

    #[test]
    fn malformed_dump_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let (input, data, index) = paths(&dir);

        std::fs::write(&input, "{\"not\": \"an array\"}").unwrap();
        let err = build_index(&input, &data, &index).unwrap_err();
        assert!(matches!(err, BiographError::Parse { .. }));
    }
}
