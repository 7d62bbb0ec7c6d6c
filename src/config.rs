// src/config.rs
//
// Central configuration for a simulation run. This is the single source
// of truth for latency, fill, margin, settlement, calendar and reporting
// parameters. Depth and symbol count are compile-time parameters of the
// engine, not fields here.

use std::path::PathBuf;

use crate::dist::Constant;
use crate::error::SimError;
use crate::types::Ticks;

/// Report verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VerbosityLevel {
    /// Headline metrics only.
    Minimal,
    /// Headline metrics plus order and fill tables.
    Standard,
    /// Standard plus the JSON run-summary location.
    Detailed,
}

impl VerbosityLevel {
    /// Parse a verbosity name (case-insensitive). Returns None if
    /// unrecognized.
    pub fn parse(s: &str) -> Option<VerbosityLevel> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimal" | "min" => Some(VerbosityLevel::Minimal),
            "standard" | "std" => Some(VerbosityLevel::Standard),
            "detailed" | "det" => Some(VerbosityLevel::Detailed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VerbosityLevel::Minimal => "minimal",
            VerbosityLevel::Standard => "standard",
            VerbosityLevel::Detailed => "detailed",
        }
    }
}

/// Run parameters.
///
/// `FB` / `FS` are the buy-side and sell-side fill-rate distributions;
/// both default to `Constant` so `RunParams::default()` gives the
/// deterministic always-max-fill configuration.
#[derive(Debug, Clone)]
pub struct RunParams<FB = Constant, FS = Constant> {
    /// Initial cash; also the initial settled funds.
    pub starting_cash: Ticks,
    /// Replay delay between strategy decision and order arrival.
    pub send_latency_ns: u64,
    /// Replay delay between fill occurrence and strategy notification.
    pub receive_latency_ns: u64,
    /// Fill-rate distribution sampled for buy executions.
    pub buy_fill_rate: FB,
    /// Fill-rate distribution sampled for sell executions.
    pub sell_fill_rate: FS,
    /// When false, every execution fills at the maximum rate and the RNG
    /// is never consulted.
    pub use_randomness: bool,
    /// Seed for the engine RNG. Zero means seed from entropy
    /// (non-reproducible); any other value gives deterministic replays.
    pub random_seed: u64,
    /// Multiplier on net liquidation for buying power.
    pub leverage_factor: f64,
    /// Annual interest rate on margin loans, in percent.
    pub interest_rate: f64,
    /// Delay before sale proceeds settle. T+25h by default.
    pub settlement_delay_ns: u64,
    /// Gate executions on the US session calendar. When false the book
    /// trades around the clock.
    pub enforce_trading_hours: bool,
    /// Permit the pre-market and after-hours windows.
    pub allow_extended_hours: bool,
    /// Shift the US session windows one hour earlier (daylight savings).
    pub daylight_savings: bool,
    /// Sampling period of the equity series used for drawdown, volatility
    /// and Sharpe.
    pub statistics_update_rate_seconds: u64,
    pub verbosity: VerbosityLevel,
    /// Label carried into the report and run summary.
    pub strategy_name: String,
    /// Optional path for the JSON run summary.
    pub output_file: Option<PathBuf>,
}

pub const NS_PER_SECOND: u64 = 1_000_000_000;
pub const NS_PER_HOUR: u64 = 3_600 * NS_PER_SECOND;

/// Default settlement delay. The value is deliberately one hour past a
/// whole day so settlement never races the 09:00 UTC settlement pass.
pub const DEFAULT_SETTLEMENT_DELAY_NS: u64 = 25 * NS_PER_HOUR;

impl Default for RunParams<Constant, Constant> {
    fn default() -> Self {
        RunParams {
            starting_cash: Ticks::from_dollars(100_000.0),
            send_latency_ns: 0,
            receive_latency_ns: 0,
            buy_fill_rate: Constant::full(),
            sell_fill_rate: Constant::full(),
            use_randomness: false,
            random_seed: 0,
            leverage_factor: 2.0,
            interest_rate: 5.0,
            settlement_delay_ns: DEFAULT_SETTLEMENT_DELAY_NS,
            enforce_trading_hours: false,
            allow_extended_hours: false,
            daylight_savings: false,
            statistics_update_rate_seconds: 60,
            verbosity: VerbosityLevel::Minimal,
            strategy_name: "unnamed".to_string(),
            output_file: None,
        }
    }
}

impl<FB, FS> RunParams<FB, FS> {
    /// Validate before the loop starts. Violations are `Config` errors
    /// and terminate the run up front.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.starting_cash < Ticks::ZERO {
            return Err(SimError::config("starting_cash must be non-negative"));
        }
        if self.leverage_factor < 1.0 || !self.leverage_factor.is_finite() {
            return Err(SimError::config(format!(
                "leverage_factor must be finite and >= 1.0, got {}",
                self.leverage_factor
            )));
        }
        if self.interest_rate < 0.0 || !self.interest_rate.is_finite() {
            return Err(SimError::config(format!(
                "interest_rate must be finite and >= 0, got {}",
                self.interest_rate
            )));
        }
        if self.statistics_update_rate_seconds == 0 {
            return Err(SimError::config(
                "statistics_update_rate_seconds must be positive",
            ));
        }
        if self.settlement_delay_ns == 0 {
            return Err(SimError::config("settlement_delay_ns must be positive"));
        }
        Ok(())
    }

    /// Total one-way-plus-return latency applied to order operations.
    pub fn total_latency_ns(&self) -> u64 {
        self.send_latency_ns + self.receive_latency_ns
    }

    /// Swap in different fill-rate distributions, keeping every other
    /// parameter.
    pub fn with_fill_distributions<B2, S2>(self, buy: B2, sell: S2) -> RunParams<B2, S2> {
        RunParams {
            starting_cash: self.starting_cash,
            send_latency_ns: self.send_latency_ns,
            receive_latency_ns: self.receive_latency_ns,
            buy_fill_rate: buy,
            sell_fill_rate: sell,
            use_randomness: self.use_randomness,
            random_seed: self.random_seed,
            leverage_factor: self.leverage_factor,
            interest_rate: self.interest_rate,
            settlement_delay_ns: self.settlement_delay_ns,
            enforce_trading_hours: self.enforce_trading_hours,
            allow_extended_hours: self.allow_extended_hours,
            daylight_savings: self.daylight_savings,
            statistics_update_rate_seconds: self.statistics_update_rate_seconds,
            verbosity: self.verbosity,
            strategy_name: self.strategy_name,
            output_file: self.output_file,
        }
    }
}
