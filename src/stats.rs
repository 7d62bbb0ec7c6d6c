// src/stats.rs
//
// Run statistics: an equity series sampled on a fixed wall-time
// interval, drawdown / volatility / Sharpe derived from it, the full
// order and fill logs, the text report at three verbosity levels, and
// the JSON run summary with a checksum over the fill log for
// determinism comparisons.

use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::calendar::format_utc;
use crate::config::VerbosityLevel;
use crate::types::{Fill, NewOrder, Ticks, TimeStamp};

const SECONDS_PER_YEAR: f64 = 365.0 * 24.0 * 3_600.0;

/// Welford running mean/variance. Non-finite samples are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct OnlineStats {
    n: u64,
    mean: f64,
    m2: f64,
}

impl OnlineStats {
    pub fn add(&mut self, x: f64) {
        if !x.is_finite() {
            return;
        }
        self.n += 1;
        let delta = x - self.mean;
        self.mean += delta / (self.n as f64);
        let delta2 = x - self.mean;
        self.m2 += delta * delta2;
    }

    pub fn n(&self) -> u64 {
        self.n
    }

    pub fn mean(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance (n - 1 denominator).
    pub fn variance(&self) -> f64 {
        if self.n < 2 {
            0.0
        } else {
            self.m2 / ((self.n - 1) as f64)
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

/// An order as the strategy placed it, with its send timestamp.
#[derive(Debug, Clone, Copy)]
pub struct OrderRecord {
    pub order: NewOrder,
    pub send_ts: TimeStamp,
}

/// Derived performance metrics.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Metrics {
    pub total_return: f64,
    pub max_drawdown: f64,
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    pub sharpe: f64,
}

/// Stable JSON summary of a run, for research tooling and determinism
/// comparisons across runs.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub strategy_name: String,
    pub seed: u64,
    pub starting_equity_ticks: i64,
    pub final_equity_ticks: i64,
    #[serde(flatten)]
    pub metrics: Metrics,
    pub interest_owed_ticks: i64,
    pub quotes_processed: u64,
    pub fill_count: usize,
    /// SHA-256 over the fill log; byte-identical replays match here.
    pub fills_sha256: String,
}

#[derive(Debug, Clone)]
pub struct Statistics {
    starting_equity: Ticks,
    current_equity: Ticks,
    min_equity: Ticks,
    min_cash: Ticks,
    max_position_value: Ticks,
    interest_owed: Ticks,
    log_returns: OnlineStats,
    sample_interval_ns: u64,
    periods_per_year: f64,
    last_sample_ts: Option<TimeStamp>,
    last_sample_equity: Ticks,
    orders: Vec<OrderRecord>,
    fills: Vec<Fill>,
}

impl Statistics {
    pub fn new(starting_cash: Ticks, update_rate_seconds: u64) -> Self {
        Statistics {
            starting_equity: starting_cash,
            current_equity: starting_cash,
            min_equity: starting_cash,
            min_cash: starting_cash,
            max_position_value: Ticks::ZERO,
            interest_owed: Ticks::ZERO,
            log_returns: OnlineStats::default(),
            sample_interval_ns: update_rate_seconds * 1_000_000_000,
            periods_per_year: SECONDS_PER_YEAR / update_rate_seconds as f64,
            last_sample_ts: None,
            last_sample_equity: starting_cash,
            orders: Vec::new(),
            fills: Vec::new(),
        }
    }

    pub fn record_order(&mut self, order: NewOrder, send_ts: TimeStamp) {
        self.orders.push(OrderRecord { order, send_ts });
    }

    pub fn record_fill(&mut self, fill: Fill) {
        self.fills.push(fill);
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn orders(&self) -> &[OrderRecord] {
        &self.orders
    }

    /// Feed the current net liquidation. A point enters the sampled
    /// series whenever the update interval has elapsed since the last
    /// sampled point.
    pub fn update_equity(&mut self, now: TimeStamp, equity: Ticks) {
        self.current_equity = equity;
        match self.last_sample_ts {
            None => {
                self.last_sample_ts = Some(now);
                self.last_sample_equity = equity;
                self.min_equity = self.min_equity.min(equity);
            }
            Some(last) => {
                if now.nanos().saturating_sub(last.nanos()) >= self.sample_interval_ns {
                    self.push_sample(now, equity);
                }
            }
        }
    }

    fn push_sample(&mut self, now: TimeStamp, equity: Ticks) {
        self.min_equity = self.min_equity.min(equity);
        if self.last_sample_equity > Ticks::ZERO && equity > Ticks::ZERO {
            let ratio = equity.0 as f64 / self.last_sample_equity.0 as f64;
            self.log_returns.add(ratio.ln());
        }
        self.last_sample_ts = Some(now);
        self.last_sample_equity = equity;
    }

    pub fn update_cash(&mut self, cash: Ticks) {
        self.min_cash = self.min_cash.min(cash);
    }

    pub fn update_position_value(&mut self, value: Ticks) {
        let abs = if value < Ticks::ZERO { -value } else { value };
        self.max_position_value = self.max_position_value.max(abs);
    }

    pub fn set_interest_owed(&mut self, owed: Ticks) {
        self.interest_owed = owed;
    }

    /// Fold the final equity into the sampled series at end of run.
    pub fn finish(&mut self, now: TimeStamp, equity: Ticks) {
        self.current_equity = equity;
        self.push_sample(now, equity);
    }

    pub fn metrics(&self) -> Metrics {
        let start = self.starting_equity.0 as f64;
        let total_return = if start != 0.0 {
            (self.current_equity.0 as f64 - start) / start
        } else {
            0.0
        };
        let max_drawdown = if start != 0.0 {
            ((start - self.min_equity.0 as f64) / start).max(0.0)
        } else {
            0.0
        };

        let annualized_return = self.log_returns.mean() * self.periods_per_year;
        let annualized_volatility = self.log_returns.std_dev() * self.periods_per_year.sqrt();
        let sharpe = if annualized_volatility > 0.0 {
            annualized_return / annualized_volatility
        } else {
            0.0
        };

        Metrics {
            total_return,
            max_drawdown,
            annualized_return,
            annualized_volatility,
            sharpe,
        }
    }

    pub fn run_summary(&self, strategy_name: &str, seed: u64, quotes_processed: u64) -> RunSummary {
        RunSummary {
            strategy_name: strategy_name.to_string(),
            seed,
            starting_equity_ticks: self.starting_equity.0,
            final_equity_ticks: self.current_equity.0,
            metrics: self.metrics(),
            interest_owed_ticks: self.interest_owed.0,
            quotes_processed,
            fill_count: self.fills.len(),
            fills_sha256: fills_checksum(&self.fills),
        }
    }

    pub fn write_summary_json(&self, summary: &RunSummary, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(io::BufWriter::new(file), summary)?;
        Ok(())
    }

    /// Text report at the requested verbosity.
    pub fn write_report(
        &self,
        out: &mut impl Write,
        verbosity: VerbosityLevel,
        summary_path: Option<&Path>,
    ) -> io::Result<()> {
        self.write_minimal(out)?;
        if verbosity >= VerbosityLevel::Standard {
            writeln!(out, "Min Cash: {}", self.min_cash)?;
            writeln!(out, "Max Position Value Held: {}", self.max_position_value)?;
            self.write_orders_placed(out)?;
            self.write_fills_received(out)?;
        }
        if verbosity >= VerbosityLevel::Detailed {
            if let Some(path) = summary_path {
                writeln!(out)?;
                writeln!(out, "Run summary written to {}", path.display())?;
            }
        }
        Ok(())
    }

    fn write_minimal(&self, out: &mut impl Write) -> io::Result<()> {
        let metrics = self.metrics();
        write_header(out, "Simulation Results")?;
        writeln!(out, "Starting Equity: {}", self.starting_equity)?;
        writeln!(out, "Final Portfolio Value: {}", self.current_equity)?;
        writeln!(out, "Total Return: {}", format_percent(metrics.total_return))?;
        writeln!(out, "Max Drawdown: {}", format_percent(metrics.max_drawdown))?;
        writeln!(
            out,
            "Annualized Volatility: {}",
            format_percent(metrics.annualized_volatility)
        )?;
        writeln!(out, "Sharpe Ratio: {:.4}", metrics.sharpe)?;
        writeln!(out, "Interest Owed: {}", self.interest_owed)?;
        writeln!(out, "Fills: {}", self.fills.len())?;
        Ok(())
    }

    fn write_orders_placed(&self, out: &mut impl Write) -> io::Result<()> {
        write_header(out, "Orders Placed")?;
        if self.orders.is_empty() {
            writeln!(out, "No orders were placed during the simulation.")?;
            return Ok(());
        }
        writeln!(out, "Total Orders Placed: {}", self.orders.len())?;
        writeln!(out)?;
        writeln!(
            out,
            "{:<8}{:<8}{:<6}{:<8}{:<12}{:<15}{:<8}{:<20}",
            "OrderID", "Symbol", "Side", "Type", "Quantity", "Price", "TIF", "Timestamp"
        )?;
        writeln!(out, "{}", "-".repeat(85))?;
        for record in &self.orders {
            let order = &record.order;
            writeln!(
                out,
                "{:<8}{:<8}{:<6}{:<8}{:<12}{:<15}{:<8}{:<20}",
                order.id.0,
                order.symbol.0,
                order.side.as_str(),
                order.kind.as_str(),
                order.quantity.0,
                order.limit_price.to_string(),
                order.tif.as_str(),
                format_utc(record.send_ts),
            )?;
        }
        Ok(())
    }

    fn write_fills_received(&self, out: &mut impl Write) -> io::Result<()> {
        write_header(out, "Fills Received")?;
        if self.fills.is_empty() {
            writeln!(out, "No fills were received during the simulation.")?;
            return Ok(());
        }
        writeln!(out, "Total Fills Received: {}", self.fills.len())?;
        writeln!(out)?;
        writeln!(
            out,
            "{:<8}{:<8}{:<6}{:<12}{:<15}{:<20}",
            "OrderID", "Symbol", "Side", "Quantity", "Price", "Timestamp"
        )?;
        writeln!(out, "{}", "-".repeat(69))?;
        for fill in &self.fills {
            writeln!(
                out,
                "{:<8}{:<8}{:<6}{:<12}{:<15}{:<20}",
                fill.order_id.0,
                fill.symbol.0,
                fill.side.as_str(),
                fill.quantity.0,
                fill.price.to_string(),
                format_utc(fill.timestamp),
            )?;
        }
        Ok(())
    }
}

/// SHA-256 over the canonical fill-log encoding.
pub fn fills_checksum(fills: &[Fill]) -> String {
    let mut hasher = Sha256::new();
    for fill in fills {
        hasher.update(
            format!(
                "{},{},{},{},{},{}\n",
                fill.order_id.0,
                fill.symbol.0,
                fill.side.as_str(),
                fill.quantity.0,
                fill.price.0,
                fill.timestamp.nanos(),
            )
            .as_bytes(),
        );
    }
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(64);
    for byte in digest {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

fn write_header(out: &mut impl Write, title: &str) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{title}")?;
    writeln!(out, "{}", "-".repeat(title.len()))?;
    Ok(())
}

fn format_percent(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        OrderId, OrderKind, Quantity, Side, SymbolIdx, TimeInForce, TICKS_PER_DOLLAR,
    };

    const SECOND: u64 = 1_000_000_000;

    fn dollars(d: i64) -> Ticks {
        Ticks(d * TICKS_PER_DOLLAR)
    }

    #[test]
    fn online_stats_matches_closed_form() {
        let mut stats = OnlineStats::default();
        for x in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            stats.add(x);
        }
        assert_eq!(stats.n(), 8);
        assert!((stats.mean() - 5.0).abs() < 1e-12);
        // Sample variance of the classic dataset is 32/7.
        assert!((stats.variance() - 32.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn online_stats_ignores_non_finite() {
        let mut stats = OnlineStats::default();
        stats.add(1.0);
        stats.add(f64::NAN);
        stats.add(f64::INFINITY);
        assert_eq!(stats.n(), 1);
    }

    #[test]
    fn equity_series_samples_on_the_interval() {
        let mut stats = Statistics::new(dollars(1_000), 60);

        stats.update_equity(TimeStamp(0), dollars(1_000));
        // 30s later: inside the interval, not sampled.
        stats.update_equity(TimeStamp(30 * SECOND), dollars(500));
        assert_eq!(stats.log_returns.n(), 0);

        // 60s later: sampled.
        stats.update_equity(TimeStamp(60 * SECOND), dollars(1_100));
        assert_eq!(stats.log_returns.n(), 1);

        let metrics = stats.metrics();
        // The 30s dip never entered the series.
        assert_eq!(metrics.max_drawdown, 0.0);
    }

    #[test]
    fn drawdown_measured_from_start_to_minimum() {
        let mut stats = Statistics::new(dollars(1_000), 60);
        stats.update_equity(TimeStamp(0), dollars(1_000));
        stats.update_equity(TimeStamp(60 * SECOND), dollars(800));
        stats.finish(TimeStamp(120 * SECOND), dollars(900));

        let metrics = stats.metrics();
        assert!((metrics.max_drawdown - 0.2).abs() < 1e-12);
        assert!((metrics.total_return - (-0.1)).abs() < 1e-12);
    }

    #[test]
    fn flat_series_has_zero_volatility_and_sharpe() {
        let mut stats = Statistics::new(dollars(1_000), 60);
        for i in 0..5 {
            stats.update_equity(TimeStamp(i * 60 * SECOND), dollars(1_000));
        }
        let metrics = stats.metrics();
        assert_eq!(metrics.annualized_volatility, 0.0);
        assert_eq!(metrics.sharpe, 0.0);
    }

    fn fill(id: u64, qty: i64, price: Ticks, ts: u64) -> Fill {
        Fill {
            order_id: OrderId(id),
            symbol: SymbolIdx(0),
            side: Side::Buy,
            kind: OrderKind::Market,
            tif: TimeInForce::Day,
            quantity: Quantity(qty),
            price,
            limit_price: Ticks::ZERO,
            timestamp: TimeStamp(ts),
        }
    }

    #[test]
    fn checksum_is_order_sensitive_and_stable() {
        let a = vec![fill(1, 5, dollars(101), 10), fill(2, 3, dollars(102), 20)];
        let b = vec![fill(2, 3, dollars(102), 20), fill(1, 5, dollars(101), 10)];
        assert_eq!(fills_checksum(&a), fills_checksum(&a.clone()));
        assert_ne!(fills_checksum(&a), fills_checksum(&b));
        assert_ne!(fills_checksum(&a), fills_checksum(&[]));
    }

    #[test]
    fn minimal_report_lists_headline_metrics() {
        let mut stats = Statistics::new(dollars(1_000), 60);
        stats.update_equity(TimeStamp(0), dollars(1_000));
        stats.finish(TimeStamp(60 * SECOND), dollars(1_100));
        stats.record_fill(fill(1, 5, dollars(101), 10));

        let mut out = Vec::new();
        stats
            .write_report(&mut out, VerbosityLevel::Minimal, None)
            .unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Starting Equity: $1000.00"));
        assert!(text.contains("Final Portfolio Value: $1100.00"));
        assert!(text.contains("Total Return: 10.00%"));
        assert!(text.contains("Fills: 1"));
        // Order table belongs to STANDARD and above.
        assert!(!text.contains("Orders Placed"));
    }

    #[test]
    fn standard_report_appends_tables() {
        let mut stats = Statistics::new(dollars(1_000), 60);
        stats.record_order(
            NewOrder {
                id: OrderId(1),
                symbol: SymbolIdx(0),
                side: Side::Buy,
                kind: OrderKind::Limit,
                quantity: Quantity(5),
                tif: TimeInForce::Gtc,
                limit_price: dollars(101),
            },
            TimeStamp(0),
        );
        stats.record_fill(fill(1, 5, dollars(101), 10));

        let mut out = Vec::new();
        stats
            .write_report(&mut out, VerbosityLevel::Standard, None)
            .unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Orders Placed"));
        assert!(text.contains("Fills Received"));
        assert!(text.contains("Total Orders Placed: 1"));
        assert!(text.contains("GTC"));
    }
}
