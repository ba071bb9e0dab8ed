//! Read-only, offset-indexed corpus store.
//!
//! The store pairs a line-delimited JSON data file with a parallel array of
//! byte offsets, sorted ascending by record title (see [`crate::build`]).
//! Lookups binary-search the offset array; each probe is one positioned read
//! of the record at the candidate offset. The store is immutable after
//! [`CorpusStore::load`], so any number of tasks may look up titles
//! concurrently without locking the data path.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use biograph_shared::{BiographError, Result};

/// Probes at search depth below this are kept in the probe cache. The first
/// few levels of the search tree are shared by every lookup, so caching them
/// amortizes the hottest reads across a traversal.
const PROBE_CACHE_DEPTH: u32 = 10;

// ---------------------------------------------------------------------------
// CorpusRecord
// ---------------------------------------------------------------------------

/// One corpus record: a mandatory title plus the free-form remainder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusRecord {
    /// Exact record title; the sort and lookup key.
    pub title: String,
    /// Raw text body (wikitext), empty if the record has none.
    #[serde(default)]
    pub text: String,
    /// Any remaining fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// TitleLookup
// ---------------------------------------------------------------------------

/// Exact-title lookup capability.
///
/// The enrichment pipeline depends on this seam rather than on
/// [`CorpusStore`] directly, so resolution logic can be tested against
/// in-memory doubles.
pub trait TitleLookup: Send + Sync {
    /// Return the record whose title equals `title` exactly, if present.
    fn lookup(&self, title: &str) -> Result<Option<CorpusRecord>>;
}

// ---------------------------------------------------------------------------
// CorpusStore
// ---------------------------------------------------------------------------

/// Loaded corpus: data file handle, offset array, and a bounded probe cache.
///
/// Titles are unique by construction — the index build rejects duplicates —
/// so a successful lookup has exactly one possible answer.
#[derive(Debug)]
pub struct CorpusStore {
    data: File,
    data_len: u64,
    offsets: Vec<u64>,
    /// Shallow probes kept across lookups, keyed by record position.
    probe_cache: Mutex<HashMap<usize, Arc<CorpusRecord>>>,
    probe_cache_capacity: usize,
    /// Physical record reads performed, for cost assertions and diagnostics.
    records_read: AtomicU64,
}

impl CorpusStore {
    /// Load a store from an offset index file and a data file.
    ///
    /// Fails with a config error if either file is missing, the offsets are
    /// not strictly increasing, any offset points past the end of the data
    /// file, or the offset count does not match the data file's record count.
    pub fn load(index_path: &Path, data_path: &Path) -> Result<Self> {
        let index_content = std::fs::read_to_string(index_path)
            .map_err(|e| BiographError::io(index_path, e))?;
        let offsets: Vec<u64> = serde_json::from_str(&index_content).map_err(|e| {
            BiographError::config(format!("invalid offset index {}: {e}", index_path.display()))
        })?;

        let data = File::open(data_path).map_err(|e| BiographError::io(data_path, e))?;
        let data_len = data
            .metadata()
            .map_err(|e| BiographError::io(data_path, e))?
            .len();

        validate_offsets(&offsets, data_len, index_path)?;

        let record_count = count_records(data_path)?;
        if record_count != offsets.len() {
            return Err(BiographError::config(format!(
                "offset index {} has {} entries but {} holds {} records",
                index_path.display(),
                offsets.len(),
                data_path.display(),
                record_count,
            )));
        }

        info!(
            records = offsets.len(),
            data_bytes = data_len,
            "corpus store loaded"
        );

        Ok(Self {
            data,
            data_len,
            offsets,
            probe_cache: Mutex::new(HashMap::new()),
            probe_cache_capacity: 1024,
            records_read: AtomicU64::new(0),
        })
    }

    /// Set the probe cache capacity. Zero disables caching; lookups stay
    /// correct either way, only their read count changes.
    pub fn with_probe_cache_capacity(mut self, capacity: usize) -> Self {
        self.probe_cache_capacity = capacity;
        self
    }

    /// Number of indexed records.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Total physical record reads since load (cache hits excluded).
    pub fn records_read(&self) -> u64 {
        self.records_read.load(AtomicOrdering::Relaxed)
    }

    /// Binary-search the store for an exact title match.
    ///
    /// O(log n) record reads; returns `Ok(None)` for an empty store or a
    /// converged window without a match. Titles compare by code point, the
    /// same order the build sorts by.
    pub fn lookup(&self, title: &str) -> Result<Option<CorpusRecord>> {
        let mut lo = 0usize;
        let mut hi = self.offsets.len();
        let mut depth = 0u32;

        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let record = self.record_at(mid, depth)?;

            match record.title.as_str().cmp(title) {
                std::cmp::Ordering::Equal => return Ok(Some((*record).clone())),
                std::cmp::Ordering::Greater => hi = mid,
                std::cmp::Ordering::Less => lo = mid + 1,
            }
            depth += 1;
        }

        debug!(title, "title not in corpus");
        Ok(None)
    }

    /// Read and parse the record at index position `i`, consulting the
    /// probe cache first. `depth` is the current search depth; only shallow
    /// probes are cached, and only while the cache is under capacity.
    fn record_at(&self, i: usize, depth: u32) -> Result<Arc<CorpusRecord>> {
        if self.probe_cache_capacity > 0 {
            let cache = self.probe_cache.lock().expect("probe cache poisoned");
            if let Some(record) = cache.get(&i) {
                return Ok(Arc::clone(record));
            }
        }

        let start = self.offsets[i];
        let end = self
            .offsets
            .get(i + 1)
            .copied()
            .unwrap_or(self.data_len);

        let mut buf = vec![0u8; (end - start) as usize];
        read_exact_at(&self.data, &mut buf, start)
            .map_err(|e| BiographError::config(format!("corpus data truncated at byte {start}: {e}")))?;
        self.records_read.fetch_add(1, AtomicOrdering::Relaxed);

        let line = std::str::from_utf8(&buf)
            .map_err(|e| BiographError::parse(format!("record {i} is not valid UTF-8: {e}")))?;
        let record: CorpusRecord = serde_json::from_str(line.trim_end()).map_err(|e| {
            BiographError::parse(format!("record {i} at byte {start} is not valid JSON: {e}"))
        })?;
        let record = Arc::new(record);

        if self.probe_cache_capacity > 0 && depth < PROBE_CACHE_DEPTH {
            let mut cache = self.probe_cache.lock().expect("probe cache poisoned");
            if cache.len() < self.probe_cache_capacity {
                cache.insert(i, Arc::clone(&record));
            }
        }

        Ok(record)
    }
}

impl TitleLookup for CorpusStore {
    fn lookup(&self, title: &str) -> Result<Option<CorpusRecord>> {
        CorpusStore::lookup(self, title)
    }
}

// ---------------------------------------------------------------------------
// Load-time validation
// ---------------------------------------------------------------------------

/// Offsets must be strictly increasing and inside the data file.
fn validate_offsets(offsets: &[u64], data_len: u64, index_path: &Path) -> Result<()> {
    for (i, window) in offsets.windows(2).enumerate() {
        if window[1] <= window[0] {
            return Err(BiographError::config(format!(
                "offset index {} is not strictly increasing at entry {}",
                index_path.display(),
                i + 1,
            )));
        }
    }

    if let Some(&last) = offsets.last() {
        if last >= data_len {
            return Err(BiographError::config(format!(
                "offset index {} points at byte {last} but the data file holds {data_len} bytes",
                index_path.display(),
            )));
        }
    }

    Ok(())
}

/// Count newline-delimited records in the data file (single streaming pass).
fn count_records(data_path: &Path) -> Result<usize> {
    let file = File::open(data_path).map_err(|e| BiographError::io(data_path, e))?;
    let mut reader = BufReader::new(file);
    let mut count = 0usize;

    loop {
        let buf = reader
            .fill_buf()
            .map_err(|e| BiographError::io(data_path, e))?;
        if buf.is_empty() {
            break;
        }
        count += buf.iter().filter(|&&b| b == b'\n').count();
        let len = buf.len();
        reader.consume(len);
    }

    Ok(count)
}

// ---------------------------------------------------------------------------
// Positioned reads
// ---------------------------------------------------------------------------

// Positioned reads leave the file cursor untouched, so concurrent lookups
// share one handle without synchronizing.

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> std::io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> std::io::Result<()> {
    use std::os::windows::fs::FileExt;
    let mut read = 0;
    while read < buf.len() {
        let n = file.seek_read(&mut buf[read..], offset + read as u64)?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "record extends past end of data file",
            ));
        }
        read += n;
    }
    Ok(())
}
