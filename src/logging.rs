// src/logging.rs
//
// Telemetry sinks for the simulator.
// - EventSink: trait the engine reports through
// - NoopSink:  discards everything
// - FileSink:  one JSON line per tick / event, for research tooling

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::types::{Fill, NewOrder};

/// Per-tick snapshot of the account and queue depths, emitted once per
/// market snapshot.
#[derive(Debug, Clone, Copy)]
pub struct TickRecord {
    pub tick: u64,
    pub ts_ns: u64,
    pub cash_ticks: i64,
    pub settled_ticks: i64,
    pub loan_ticks: i64,
    pub net_liquidation_ticks: i64,
    pub pending_orders: usize,
    pub pending_cancels: usize,
    pub pending_replaces: usize,
    pub pending_notifications: usize,
    pub fills_total: usize,
}

/// Discrete diagnostics the engine raises outside the tick cadence.
#[derive(Debug, Clone)]
pub enum SimEvent {
    /// `place_order` failed the pre-trade sufficiency check and returned
    /// the sentinel id.
    OrderRejected { order: NewOrder, reason: String },
    /// A forced liquidation chunk was executed with order id 0.
    MarginCall { fill: Fill },
    /// A margin violation could not be cured; the run continues flagged.
    MarginViolationUncured { ts_ns: u64 },
}

/// Abstract sink for engine telemetry.
pub trait EventSink {
    fn log_tick(&mut self, record: &TickRecord) {
        let _ = record;
    }

    fn log_event(&mut self, event: &SimEvent) {
        let _ = event;
    }
}

/// Sink that discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {}

/// JSONL file sink. Each tick or event is one JSON object per line; the
/// payload is small and encoded manually.
pub struct FileSink {
    writer: BufWriter<File>,
}

impl FileSink {
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(FileSink {
            writer: BufWriter::new(file),
        })
    }
}

impl EventSink for FileSink {
    fn log_tick(&mut self, record: &TickRecord) {
        let line = format!(
            "{{\"kind\":\"tick\",\"tick\":{},\"ts_ns\":{},\"cash\":{},\"settled\":{},\
             \"loan\":{},\"net_liquidation\":{},\"pending_orders\":{},\"pending_cancels\":{},\
             \"pending_replaces\":{},\"pending_notifications\":{},\"fills\":{}}}\n",
            record.tick,
            record.ts_ns,
            record.cash_ticks,
            record.settled_ticks,
            record.loan_ticks,
            record.net_liquidation_ticks,
            record.pending_orders,
            record.pending_cancels,
            record.pending_replaces,
            record.pending_notifications,
            record.fills_total,
        );

        // Telemetry must never crash the engine; I/O errors are dropped.
        let _ = self.writer.write_all(line.as_bytes());
        let _ = self.writer.flush();
    }

    fn log_event(&mut self, event: &SimEvent) {
        let line = match event {
            SimEvent::OrderRejected { order, reason } => format!(
                "{{\"kind\":\"order_rejected\",\"symbol\":{},\"side\":\"{}\",\"quantity\":{},\"reason\":\"{}\"}}\n",
                order.symbol.0,
                order.side.as_str(),
                order.quantity,
                reason,
            ),
            SimEvent::MarginCall { fill } => format!(
                "{{\"kind\":\"margin_call\",\"symbol\":{},\"side\":\"{}\",\"quantity\":{},\"price_ticks\":{},\"ts_ns\":{}}}\n",
                fill.symbol.0,
                fill.side.as_str(),
                fill.quantity,
                fill.price.0,
                fill.timestamp.nanos(),
            ),
            SimEvent::MarginViolationUncured { ts_ns } => format!(
                "{{\"kind\":\"margin_violation_uncured\",\"ts_ns\":{}}}\n",
                ts_ns
            ),
        };

        let _ = self.writer.write_all(line.as_bytes());
        let _ = self.writer.flush();
    }
}
