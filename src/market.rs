// src/market.rs
//
// Market-data sources. The engine pulls snapshots through the
// `MarketData` capability; sources are responsible for filtering
// crossed/empty books and for guaranteeing non-decreasing timestamps,
// including across file boundaries when several files are streamed
// back to back.
//
// Columnar ingestion is out of scope here; the on-disk replay format is
// one JSON snapshot record per line.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::types::{MarketState, Quantity, Quote, SymbolIdx, Ticks, TimeStamp};

/// Pull-based snapshot iterator plus accessors over the snapshot most
/// recently returned by `next`.
pub trait MarketData<const D: usize, const S: usize> {
    /// Advance to the next snapshot. `Ok(None)` is end-of-stream;
    /// malformed or time-regressing input is a `Data` error.
    fn next(&mut self) -> Result<Option<MarketState<D, S>>, SimError>;

    /// The snapshot most recently returned by `next`.
    fn current(&self) -> &MarketState<D, S>;

    fn current_timestamp(&self) -> TimeStamp {
        self.current().timestamp
    }

    fn best_bid(&self, symbol: SymbolIdx, level: usize) -> Ticks {
        self.current().quote(symbol).bid_px[level]
    }

    fn best_ask(&self, symbol: SymbolIdx, level: usize) -> Ticks {
        self.current().quote(symbol).ask_px[level]
    }

    fn bid_size(&self, symbol: SymbolIdx, level: usize) -> Quantity {
        self.current().quote(symbol).bid_sz[level]
    }

    fn ask_size(&self, symbol: SymbolIdx, level: usize) -> Quantity {
        self.current().quote(symbol).ask_sz[level]
    }
}

/// A snapshot is kept only when every symbol's level-1 book is valid.
fn snapshot_is_valid<const D: usize, const S: usize>(state: &MarketState<D, S>) -> bool {
    state.quotes.iter().all(Quote::is_valid)
}

/// In-memory source over pre-built snapshots. The workhorse for tests
/// and programmatic replays.
#[derive(Debug, Clone)]
pub struct MemorySource<const D: usize, const S: usize> {
    states: Vec<MarketState<D, S>>,
    cursor: usize,
    current: MarketState<D, S>,
    last_ts: Option<TimeStamp>,
}

impl<const D: usize, const S: usize> MemorySource<D, S> {
    pub fn new(states: Vec<MarketState<D, S>>) -> Self {
        MemorySource {
            states,
            cursor: 0,
            current: MarketState::default(),
            last_ts: None,
        }
    }
}

impl<const D: usize, const S: usize> MarketData<D, S> for MemorySource<D, S> {
    fn next(&mut self) -> Result<Option<MarketState<D, S>>, SimError> {
        while self.cursor < self.states.len() {
            let state = self.states[self.cursor];
            self.cursor += 1;

            if !snapshot_is_valid(&state) {
                continue;
            }
            if let Some(last) = self.last_ts {
                if state.timestamp < last {
                    return Err(SimError::data(format!(
                        "timestamp regression: {} after {}",
                        state.timestamp.nanos(),
                        last.nanos()
                    )));
                }
            }
            self.last_ts = Some(state.timestamp);
            self.current = state;
            return Ok(Some(state));
        }
        Ok(None)
    }

    fn current(&self) -> &MarketState<D, S> {
        &self.current
    }
}

/// One recorded book side-pair for a single symbol, outermost to
/// innermost level: `(price_ticks, size)` pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookRecord {
    pub bids: Vec<(i64, i64)>,
    pub asks: Vec<(i64, i64)>,
}

/// One JSONL line: a timestamp plus one book per symbol index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub ts: u64,
    pub symbols: Vec<BookRecord>,
}

impl SnapshotRecord {
    fn into_state<const D: usize, const S: usize>(
        self,
        context: &str,
    ) -> Result<MarketState<D, S>, SimError> {
        if self.symbols.len() != S {
            return Err(SimError::data(format!(
                "{context}: expected {S} symbols, got {}",
                self.symbols.len()
            )));
        }

        let mut state = MarketState::<D, S>::default();
        state.timestamp = TimeStamp(self.ts);
        for (i, book) in self.symbols.into_iter().enumerate() {
            if book.bids.len() != D || book.asks.len() != D {
                return Err(SimError::data(format!(
                    "{context}: expected {D} levels, got {}x{}",
                    book.bids.len(),
                    book.asks.len()
                )));
            }
            let quote = &mut state.quotes[i];
            quote.timestamp = TimeStamp(self.ts);
            for level in 0..D {
                quote.bid_px[level] = Ticks(book.bids[level].0);
                quote.bid_sz[level] = Quantity(book.bids[level].1);
                quote.ask_px[level] = Ticks(book.asks[level].0);
                quote.ask_sz[level] = Quantity(book.asks[level].1);
            }
        }
        Ok(state)
    }
}

/// File-backed source streaming one or more JSONL files in order.
/// Files are loaded one at a time; concatenation must preserve
/// timestamp monotonicity.
#[derive(Debug)]
pub struct JsonlSource<const D: usize, const S: usize> {
    paths: Vec<PathBuf>,
    next_file: usize,
    pending: VecDeque<MarketState<D, S>>,
    current: MarketState<D, S>,
    last_ts: Option<TimeStamp>,
}

impl<const D: usize, const S: usize> JsonlSource<D, S> {
    pub fn open(paths: Vec<PathBuf>) -> Result<Self, SimError> {
        if paths.is_empty() {
            return Err(SimError::data("no market data files given"));
        }
        Ok(JsonlSource {
            paths,
            next_file: 0,
            pending: VecDeque::new(),
            current: MarketState::default(),
            last_ts: None,
        })
    }

    pub fn open_single(path: impl AsRef<Path>) -> Result<Self, SimError> {
        Self::open(vec![path.as_ref().to_path_buf()])
    }

    /// Load the next file into the pending queue. Invalid books are
    /// dropped here, exactly like the in-memory source.
    fn load_next_file(&mut self) -> Result<bool, SimError> {
        if self.next_file >= self.paths.len() {
            return Ok(false);
        }
        let path = self.paths[self.next_file].clone();
        self.next_file += 1;

        let file = File::open(&path)?;
        let reader = BufReader::new(file);
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let context = format!("{}:{}", path.display(), line_no + 1);
            let record: SnapshotRecord = serde_json::from_str(&line)
                .map_err(|e| SimError::data(format!("{context}: {e}")))?;
            let state = record.into_state::<D, S>(&context)?;
            if snapshot_is_valid(&state) {
                self.pending.push_back(state);
            }
        }
        Ok(true)
    }
}

impl<const D: usize, const S: usize> MarketData<D, S> for JsonlSource<D, S> {
    fn next(&mut self) -> Result<Option<MarketState<D, S>>, SimError> {
        loop {
            if let Some(state) = self.pending.pop_front() {
                if let Some(last) = self.last_ts {
                    if state.timestamp < last {
                        return Err(SimError::data(format!(
                            "timestamp regression: {} after {}",
                            state.timestamp.nanos(),
                            last.nanos()
                        )));
                    }
                }
                self.last_ts = Some(state.timestamp);
                self.current = state;
                return Ok(Some(state));
            }
            if !self.load_next_file()? {
                return Ok(None);
            }
        }
    }

    fn current(&self) -> &MarketState<D, S> {
        &self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn snapshot(ts: u64, bid: i64, ask: i64) -> MarketState<1, 1> {
        let mut state = MarketState::<1, 1>::default();
        state.timestamp = TimeStamp(ts);
        state.quotes[0].timestamp = TimeStamp(ts);
        state.quotes[0].bid_px[0] = Ticks(bid);
        state.quotes[0].ask_px[0] = Ticks(ask);
        state.quotes[0].bid_sz[0] = Quantity(10);
        state.quotes[0].ask_sz[0] = Quantity(10);
        state
    }

    #[test]
    fn memory_source_yields_in_order_and_tracks_current() {
        let mut src = MemorySource::new(vec![snapshot(1, 100, 101), snapshot(2, 102, 103)]);
        let first = src.next().unwrap().unwrap();
        assert_eq!(first.timestamp, TimeStamp(1));
        assert_eq!(src.current_timestamp(), TimeStamp(1));
        assert_eq!(src.best_bid(SymbolIdx(0), 0), Ticks(100));

        let second = src.next().unwrap().unwrap();
        assert_eq!(second.timestamp, TimeStamp(2));
        assert!(src.next().unwrap().is_none());
    }

    #[test]
    fn memory_source_filters_invalid_books() {
        // Crossed book and zero-bid book are skipped silently.
        let mut src = MemorySource::new(vec![
            snapshot(1, 105, 101),
            snapshot(2, 0, 101),
            snapshot(3, 100, 101),
        ]);
        let state = src.next().unwrap().unwrap();
        assert_eq!(state.timestamp, TimeStamp(3));
    }

    #[test]
    fn memory_source_rejects_time_regression() {
        let mut src = MemorySource::new(vec![snapshot(5, 100, 101), snapshot(3, 100, 101)]);
        src.next().unwrap();
        assert!(src.next().is_err());
    }

    fn write_jsonl(dir: &Path, name: &str, records: &[SnapshotRecord]) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        for record in records {
            writeln!(file, "{}", serde_json::to_string(record).unwrap()).unwrap();
        }
        path
    }

    fn record(ts: u64, bid: i64, ask: i64) -> SnapshotRecord {
        SnapshotRecord {
            ts,
            symbols: vec![BookRecord {
                bids: vec![(bid, 10)],
                asks: vec![(ask, 10)],
            }],
        }
    }

    #[test]
    fn jsonl_source_streams_multiple_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_jsonl(dir.path(), "a.jsonl", &[record(1, 100, 101), record(2, 100, 101)]);
        let b = write_jsonl(dir.path(), "b.jsonl", &[record(3, 102, 103)]);

        let mut src: JsonlSource<1, 1> = JsonlSource::open(vec![a, b]).unwrap();
        let mut seen = Vec::new();
        while let Some(state) = src.next().unwrap() {
            seen.push(state.timestamp.nanos());
        }
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn jsonl_source_rejects_regression_across_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_jsonl(dir.path(), "a.jsonl", &[record(10, 100, 101)]);
        let b = write_jsonl(dir.path(), "b.jsonl", &[record(5, 100, 101)]);

        let mut src: JsonlSource<1, 1> = JsonlSource::open(vec![a, b]).unwrap();
        src.next().unwrap();
        assert!(src.next().is_err());
    }

    #[test]
    fn jsonl_source_reports_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        std::fs::write(&path, "not json\n").unwrap();

        let mut src: JsonlSource<1, 1> = JsonlSource::open(vec![path]).unwrap();
        let err = src.next().unwrap_err();
        assert!(matches!(err, SimError::Data(_)));
    }

    #[test]
    fn jsonl_source_rejects_wrong_depth() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_jsonl(dir.path(), "d.jsonl", &[record(1, 100, 101)]);

        // Expecting depth 2 from a depth-1 file.
        let mut src: JsonlSource<2, 1> = JsonlSource::open(vec![path]).unwrap();
        assert!(src.next().is_err());
    }
}
