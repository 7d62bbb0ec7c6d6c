// src/bin/replay.rs
//
// CLI entrypoint: replay one or more JSONL quote files through a small
// built-in trend strategy and print the report.
//
// Examples:
//   cargo run --bin replay -- quotes.jsonl
//   cargo run --bin replay -- day1.jsonl day2.jsonl --random --seed 42 \
//       --fill-mean 90 --fill-std 5 --verbosity standard --summary out/run.json

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use tapesim::stats::fills_checksum;
use tapesim::{
    Constant, Engine, EngineHandle, FileSink, JsonlSource, MarketState, NoopSink, NormalRate,
    OrderKind, Quantity, RunParams, Side, SimError, Strategy, SymbolIdx, Ticks, TimeInForce,
    VerbosityLevel,
};

/// Book depth and symbol count are compile-time parameters of the
/// engine; the CLI is built for depth-10 single-symbol files.
const DEPTH: usize = 10;
const SYMBOLS: usize = 1;

#[derive(Debug, Parser)]
#[command(
    name = "replay",
    about = "Deterministic historical market-replay trading simulator",
    version
)]
struct Args {
    /// JSONL quote files, streamed in the order given.
    #[arg(required = true)]
    quotes: Vec<PathBuf>,

    /// Starting cash in dollars.
    #[arg(long, default_value_t = 100_000.0)]
    cash: f64,

    /// Outbound order latency in nanoseconds.
    #[arg(long, default_value_t = 0)]
    send_latency_ns: u64,

    /// Inbound fill-notification latency in nanoseconds.
    #[arg(long, default_value_t = 0)]
    receive_latency_ns: u64,

    /// Buying-power multiplier on net liquidation.
    #[arg(long, default_value_t = 2.0)]
    leverage: f64,

    /// Annual margin interest rate in percent.
    #[arg(long, default_value_t = 5.0)]
    interest_rate: f64,

    /// Sample fill rates from the configured distribution instead of
    /// always filling at the maximum.
    #[arg(long)]
    random: bool,

    /// RNG seed; zero seeds from entropy (non-reproducible).
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Mean fill rate in percent.
    #[arg(long, default_value_t = 100.0)]
    fill_mean: f64,

    /// Fill-rate standard deviation; zero selects the constant rate.
    #[arg(long, default_value_t = 0.0)]
    fill_std: f64,

    /// Gate executions on the US session calendar.
    #[arg(long)]
    enforce_hours: bool,

    /// Permit pre-market and after-hours execution windows.
    #[arg(long)]
    extended_hours: bool,

    /// Use the daylight-savings session windows.
    #[arg(long)]
    dst: bool,

    /// Equity sampling period in seconds.
    #[arg(long, default_value_t = 60)]
    stats_rate: u64,

    /// minimal | standard | detailed
    #[arg(long, default_value = "minimal")]
    verbosity: String,

    /// Shares per trend trade.
    #[arg(long, default_value_t = 10)]
    order_size: i64,

    /// Cap on the strategy's net position, in trade units.
    #[arg(long, default_value_t = 10)]
    max_units: i64,

    /// Path for the JSON run summary.
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Path for JSONL per-tick telemetry.
    #[arg(long)]
    telemetry: Option<PathBuf>,
}

/// Built-in demo strategy: buy an uptick of the best bid, sell a
/// downtick, with a cap on accumulated net position.
struct TrendFollower {
    last_bid: Option<Ticks>,
    order_size: Quantity,
    net_units: i64,
    max_units: i64,
}

impl TrendFollower {
    fn new(order_size: i64, max_units: i64) -> Self {
        TrendFollower {
            last_bid: None,
            order_size: Quantity(order_size),
            net_units: 0,
            max_units,
        }
    }
}

impl Strategy<DEPTH, SYMBOLS> for TrendFollower {
    fn on_market_data(
        &mut self,
        state: &MarketState<DEPTH, SYMBOLS>,
        engine: &mut EngineHandle<'_, DEPTH, SYMBOLS>,
    ) {
        let bid = state.quote(SymbolIdx(0)).best_bid();
        if let Some(last) = self.last_bid {
            if bid > last && self.net_units < self.max_units {
                let id = engine.place_order(
                    SymbolIdx(0),
                    Side::Buy,
                    OrderKind::Market,
                    self.order_size,
                    TimeInForce::Day,
                    Ticks::ZERO,
                );
                if id.is_user() {
                    self.net_units += 1;
                }
            } else if bid < last && self.net_units > -self.max_units {
                let id = engine.place_order(
                    SymbolIdx(0),
                    Side::Sell,
                    OrderKind::Market,
                    self.order_size,
                    TimeInForce::Day,
                    Ticks::ZERO,
                );
                if id.is_user() {
                    self.net_units -= 1;
                }
            }
        }
        self.last_bid = Some(bid);
    }
}

fn build_params(args: &Args, verbosity: VerbosityLevel) -> RunParams {
    let mut params = RunParams::default();
    params.starting_cash = Ticks::from_dollars(args.cash);
    params.send_latency_ns = args.send_latency_ns;
    params.receive_latency_ns = args.receive_latency_ns;
    params.leverage_factor = args.leverage;
    params.interest_rate = args.interest_rate;
    params.use_randomness = args.random;
    params.random_seed = args.seed;
    params.enforce_trading_hours = args.enforce_hours;
    params.allow_extended_hours = args.extended_hours;
    params.daylight_savings = args.dst;
    params.statistics_update_rate_seconds = args.stats_rate;
    params.verbosity = verbosity;
    params.strategy_name = "trend_follower".to_string();
    params.output_file = args.summary.clone();
    params
}

fn run_with<FB, FS>(args: &Args, params: RunParams<FB, FS>) -> Result<(), SimError>
where
    FB: tapesim::FillDistribution,
    FS: tapesim::FillDistribution,
{
    let source: JsonlSource<DEPTH, SYMBOLS> = JsonlSource::open(args.quotes.clone())?;
    let mut engine = Engine::new(source, params)?;
    let mut strategy = TrendFollower::new(args.order_size, args.max_units);

    let mut stdout = std::io::stdout();
    let result = match &args.telemetry {
        Some(path) => {
            let mut sink = FileSink::create(path)?;
            engine.run(&mut strategy, &mut sink, &mut stdout)?
        }
        None => engine.run(&mut strategy, &mut NoopSink, &mut stdout)?,
    };

    println!();
    println!(
        "quotes={} fills={} final_cash={} fills_sha256={}",
        result.quotes_processed,
        result.fills.len(),
        result.portfolio.cash,
        fills_checksum(&result.fills),
    );
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let Some(verbosity) = VerbosityLevel::parse(&args.verbosity) else {
        eprintln!("unknown verbosity {:?} (minimal|standard|detailed)", args.verbosity);
        return ExitCode::from(2);
    };

    let params = build_params(&args, verbosity);
    println!(
        "tapesim | files={} | random={} | seed={} | verbosity={}",
        args.quotes.len(),
        args.random,
        args.seed,
        verbosity.as_str(),
    );

    let outcome = if args.fill_std > 0.0 {
        let dist = match NormalRate::new(args.fill_mean, args.fill_std) {
            Ok(dist) => dist,
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::from(2);
            }
        };
        run_with(&args, params.with_fill_distributions(dist, dist))
    } else {
        let constant = Constant(args.fill_mean);
        run_with(&args, params.with_fill_distributions(constant, constant))
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("replay failed: {e}");
            ExitCode::FAILURE
        }
    }
}
