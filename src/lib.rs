//! tapesim core library.
//!
//! A deterministic historical market-replay trading simulator: it
//! drives a user strategy through recorded top-of-book snapshots,
//! models order placement with network latency, fills against recorded
//! depth, and maintains a cash/margin/positions portfolio with
//! settlement, interest, and forced liquidation. The binary
//! (`src/bin/replay.rs`) is a thin harness around these components.
//!
//! # Architecture
//!
//! - **Types** (`types`): integer newtypes for ticks, quantities,
//!   timestamps and ids; the depth-N quote and multi-symbol snapshot.
//! - **Market data** (`market`): pull-based snapshot sources with
//!   validity filtering and monotone timestamps.
//! - **Portfolio** (`portfolio`): settled/unsettled cash, margin loan,
//!   interest, per-symbol long/short inventory, margin math.
//! - **Fill model** (`fill`): depth walk + sampled fill rate + VWAP.
//! - **Queues** (`queues`): latency queues for order operations and
//!   fill notifications.
//! - **Engine** (`engine`): the sequential event loop that owns all of
//!   the above and dispatches strategy callbacks.
//! - **Statistics** (`stats`): sampled equity series, drawdown /
//!   volatility / Sharpe, report output, JSON run summary.

pub mod calendar;
pub mod config;
pub mod dist;
pub mod engine;
pub mod error;
pub mod fill;
pub mod logging;
pub mod market;
pub mod portfolio;
pub mod queues;
pub mod stats;
pub mod strategy;
pub mod types;

// --- Re-exports for ergonomic external use ---------------------------------

pub use config::{RunParams, VerbosityLevel};
pub use dist::{Constant, FillDistribution, NormalRate};
pub use engine::{Engine, EngineHandle, RunResult};
pub use error::SimError;
pub use logging::{EventSink, FileSink, NoopSink};
pub use market::{JsonlSource, MarketData, MemorySource};
pub use portfolio::{Portfolio, UnsettledFunds};
pub use stats::{RunSummary, Statistics};
pub use strategy::Strategy;
pub use types::{
    Fill, MarketState, NewOrder, OrderId, OrderKind, Quantity, Quote, Side, SymbolIdx, Ticks,
    TimeInForce, TimeStamp,
};

// --- End-to-end smoke test --------------------------------------------------
