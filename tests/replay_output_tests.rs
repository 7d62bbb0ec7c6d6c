// tests/replay_output_tests.rs
//
// End-to-end over the file-backed source: JSONL quotes in, report text
// and JSON run summary out.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tapesim::market::{BookRecord, SnapshotRecord};
use tapesim::stats::fills_checksum;
use tapesim::{
    Engine, EngineHandle, JsonlSource, MarketState, NoopSink, OrderKind, Quantity, RunParams,
    Side, Strategy, SymbolIdx, Ticks, TimeInForce, VerbosityLevel,
};

const SECOND: u64 = 1_000_000_000;
const DOLLAR: i64 = 1_000_000;

fn record(ts_s: u64, bid_d: i64, ask_d: i64) -> SnapshotRecord {
    SnapshotRecord {
        ts: ts_s * SECOND,
        symbols: vec![BookRecord {
            bids: vec![(bid_d * DOLLAR, 100), ((bid_d - 1) * DOLLAR, 100)],
            asks: vec![(ask_d * DOLLAR, 100), ((ask_d + 1) * DOLLAR, 100)],
        }],
    }
}

fn write_quotes(dir: &Path, name: &str, records: &[SnapshotRecord]) -> PathBuf {
    let path = dir.join(name);
    let mut file = File::create(&path).unwrap();
    for r in records {
        writeln!(file, "{}", serde_json::to_string(r).unwrap()).unwrap();
    }
    path
}

struct BuyThenSell {
    tick: u64,
}

impl Strategy<2, 1> for BuyThenSell {
    fn on_market_data(&mut self, _state: &MarketState<2, 1>, engine: &mut EngineHandle<'_, 2, 1>) {
        self.tick += 1;
        match self.tick {
            1 => {
                engine.place_order(
                    SymbolIdx(0),
                    Side::Buy,
                    OrderKind::Market,
                    Quantity(10),
                    TimeInForce::Day,
                    Ticks::ZERO,
                );
            }
            3 => {
                engine.place_order(
                    SymbolIdx(0),
                    Side::Sell,
                    OrderKind::Market,
                    Quantity(10),
                    TimeInForce::Day,
                    Ticks::ZERO,
                );
            }
            _ => {}
        }
    }
}

#[test]
fn jsonl_replay_writes_report_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    let day1 = write_quotes(
        dir.path(),
        "day1.jsonl",
        &[record(0, 100, 101), record(1, 100, 101)],
    );
    let day2 = write_quotes(
        dir.path(),
        "day2.jsonl",
        &[record(2, 104, 105), record(3, 104, 105)],
    );
    let summary_path = dir.path().join("out").join("run_summary.json");

    let mut params = RunParams::default();
    params.verbosity = VerbosityLevel::Standard;
    params.strategy_name = "buy_then_sell".to_string();
    params.output_file = Some(summary_path.clone());

    let source: JsonlSource<2, 1> = JsonlSource::open(vec![day1, day2]).unwrap();
    let mut engine = Engine::new(source, params).unwrap();
    let mut strategy = BuyThenSell { tick: 0 };

    let mut out = Vec::new();
    let result = engine.run(&mut strategy, &mut NoopSink, &mut out).unwrap();

    // Round trip: bought at 101, sold at 104, flat at the end.
    assert_eq!(result.quotes_processed, 4);
    assert_eq!(result.fills.len(), 2);
    assert_eq!(result.portfolio.long_qty[0], Quantity::ZERO);
    assert_eq!(
        result.portfolio.cash,
        Ticks::from_dollars(100_000.0 + 30.0)
    );

    let report = String::from_utf8(out).unwrap();
    assert!(report.contains("Simulation Results"));
    assert!(report.contains("Orders Placed"));
    assert!(report.contains("Fills Received"));
    assert!(report.contains("Total Fills Received: 2"));

    // The summary landed on disk with the fill-log checksum.
    let summary_text = std::fs::read_to_string(&summary_path).unwrap();
    let summary: serde_json::Value = serde_json::from_str(&summary_text).unwrap();
    assert_eq!(summary["strategy_name"], "buy_then_sell");
    assert_eq!(summary["fill_count"], 2);
    assert_eq!(summary["quotes_processed"], 4);
    assert_eq!(
        summary["fills_sha256"].as_str().unwrap(),
        fills_checksum(&result.fills)
    );
}
