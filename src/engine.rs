// src/engine.rs
//
// The event loop. The engine owns the market-data source, portfolio,
// latency queues, statistics, RNG and calendar, and drives the strategy
// through each snapshot:
//
//   1) strategy.on_market_data
//   2) margin check (may force-liquidate in chunks)
//   3) matured cancels -> matured replaces -> matured new orders
//      (new-order executions gated by the session calendar)
//   4) matured fill notifications -> strategy.on_fill
//   5) daily settlement + interest accrual
//
// Everything is single-threaded and strictly sequential; with a nonzero
// seed two runs over the same data are bit-identical.

use std::io;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::calendar::{self, TradingCalendar};
use crate::config::RunParams;
use crate::dist::FillDistribution;
use crate::error::SimError;
use crate::fill;
use crate::logging::{EventSink, SimEvent, TickRecord};
use crate::market::MarketData;
use crate::portfolio::Portfolio;
use crate::queues::{OrderQueues, PendingCancel, PendingOrder, PendingReplace};
use crate::stats::Statistics;
use crate::strategy::Strategy;
use crate::types::{
    Fill, MarketState, NewOrder, OrderId, OrderKind, Quantity, Side, SymbolIdx, Ticks,
    TimeInForce, TimeStamp,
};

/// Forced liquidations sell or cover at most this many shares per
/// iteration of the margin-call loop.
const LIQUIDATION_CHUNK: Quantity = Quantity(100);

/// What a completed run hands back.
#[derive(Debug, Clone)]
pub struct RunResult<const S: usize> {
    pub fills: Vec<Fill>,
    pub portfolio: Portfolio<S>,
    pub quotes_processed: u64,
}

/// The mutation surface a strategy sees during a callback. Exposes
/// order entry plus read-only views; everything else stays inside the
/// engine.
pub struct EngineHandle<'a, const D: usize, const S: usize> {
    portfolio: &'a Portfolio<S>,
    state: &'a MarketState<D, S>,
    queues: &'a mut OrderQueues,
    stats: &'a mut Statistics,
    sink: &'a mut dyn EventSink,
    next_order_id: &'a mut u64,
    total_latency_ns: u64,
    receive_latency_ns: u64,
    leverage_factor: f64,
}

impl<'a, const D: usize, const S: usize> EngineHandle<'a, D, S> {
    /// Place a new order. Runs the pre-trade sufficiency check first;
    /// on failure returns `OrderId(0)` without enqueueing and raises an
    /// `OrderRejected` diagnostic. The order cannot execute before
    /// send + receive latency has elapsed.
    pub fn place_order(
        &mut self,
        symbol: SymbolIdx,
        side: Side,
        kind: OrderKind,
        quantity: Quantity,
        tif: TimeInForce,
        limit_price: Ticks,
    ) -> OrderId {
        let mut order = NewOrder {
            id: OrderId::NONE,
            symbol,
            side,
            kind,
            quantity,
            tif,
            limit_price,
        };

        if !quantity.is_positive() {
            self.sink.log_event(&SimEvent::OrderRejected {
                order,
                reason: "quantity must be positive".to_string(),
            });
            return OrderId::NONE;
        }

        if !self
            .portfolio
            .sufficient_equity_for_order(&order, self.state, self.leverage_factor)
        {
            self.sink.log_event(&SimEvent::OrderRejected {
                order,
                reason: "insufficient equity".to_string(),
            });
            return OrderId::NONE;
        }

        *self.next_order_id += 1;
        order.id = OrderId(*self.next_order_id);

        let send_ts = self.state.timestamp;
        self.queues.push_order(PendingOrder {
            order,
            send_ts,
            earliest_exec: send_ts.offset(self.total_latency_ns),
        });
        self.stats.record_order(order, send_ts);
        order.id
    }

    /// Request cancellation of a pending order. Returns false when the
    /// order is not (or no longer) pending. The cancel itself is
    /// subject to the same latency as a new order.
    pub fn cancel(&mut self, id: OrderId) -> bool {
        if !self.queues.contains_order(id) {
            return false;
        }
        let send_ts = self.state.timestamp;
        self.queues.push_cancel(PendingCancel {
            target: id,
            send_ts,
            earliest_exec: send_ts.offset(self.total_latency_ns),
        });
        true
    }

    /// Request a quantity/price amendment of a pending order.
    pub fn replace(&mut self, id: OrderId, quantity: Quantity, price: Ticks) -> bool {
        if !self.queues.contains_order(id) {
            return false;
        }
        let send_ts = self.state.timestamp;
        self.queues.push_replace(PendingReplace {
            target: id,
            quantity,
            price,
            send_ts,
            earliest_exec: send_ts.offset(self.total_latency_ns),
        });
        true
    }

    pub fn portfolio(&self) -> &Portfolio<S> {
        self.portfolio
    }

    pub fn market(&self) -> &MarketState<D, S> {
        self.state
    }

    pub fn timestamp(&self) -> TimeStamp {
        self.state.timestamp
    }

    pub fn net_liquidation(&self) -> Ticks {
        self.portfolio
            .net_liquidation(&self.state.best_bids(), &self.state.best_asks())
    }

    /// Receive latency, for strategies that want to reason about when
    /// their notifications will land.
    pub fn receive_latency_ns(&self) -> u64 {
        self.receive_latency_ns
    }
}

pub struct Engine<const D: usize, const S: usize, M, FB, FS>
where
    M: MarketData<D, S>,
    FB: FillDistribution,
    FS: FillDistribution,
{
    source: M,
    params: RunParams<FB, FS>,
    calendar: TradingCalendar,
    portfolio: Portfolio<S>,
    queues: OrderQueues,
    stats: Statistics,
    rng: ChaCha8Rng,
    current: MarketState<D, S>,
    next_order_id: u64,
    quotes_processed: u64,
    last_settlement: TimeStamp,
    margin_flagged: bool,
}

impl<const D: usize, const S: usize, M, FB, FS> Engine<D, S, M, FB, FS>
where
    M: MarketData<D, S>,
    FB: FillDistribution,
    FS: FillDistribution,
{
    /// Build an engine over a market-data source. Config errors abort
    /// here, before any data is consumed.
    pub fn new(source: M, params: RunParams<FB, FS>) -> Result<Self, SimError> {
        params.validate()?;

        let rng = if params.use_randomness && params.random_seed == 0 {
            ChaCha8Rng::from_entropy()
        } else {
            ChaCha8Rng::seed_from_u64(params.random_seed)
        };

        Ok(Engine {
            calendar: TradingCalendar::from_params(&params),
            portfolio: Portfolio::new(params.starting_cash),
            queues: OrderQueues::new(),
            stats: Statistics::new(params.starting_cash, params.statistics_update_rate_seconds),
            rng,
            current: MarketState::default(),
            next_order_id: 0,
            quotes_processed: 0,
            last_settlement: TimeStamp::ZERO,
            margin_flagged: false,
            source,
            params,
        })
    }

    pub fn portfolio(&self) -> &Portfolio<S> {
        &self.portfolio
    }

    pub fn quotes_processed(&self) -> u64 {
        self.quotes_processed
    }

    /// Whether the last margin check left an uncurable violation.
    pub fn margin_flagged(&self) -> bool {
        self.margin_flagged
    }

    /// Drive the strategy over the whole data stream, write the report
    /// to `out`, and return the result. Data errors terminate the run;
    /// fills recorded up to that point are lost with it, matching the
    /// fail-fast contract of the market-data capability.
    pub fn run(
        &mut self,
        strategy: &mut impl Strategy<D, S>,
        sink: &mut impl EventSink,
        out: &mut impl io::Write,
    ) -> Result<RunResult<S>, SimError> {
        while let Some(state) = self.source.next()? {
            self.current = state;
            self.quotes_processed += 1;
            let now = state.timestamp;

            self.dispatch_market_data(strategy, sink, &state);
            self.check_margin(sink);
            self.process_pending_orders(now);
            self.deliver_notifications(strategy, sink, now);
            self.process_settlements(now);

            let net_liq = self
                .portfolio
                .net_liquidation(&state.best_bids(), &state.best_asks());
            self.stats.update_equity(now, net_liq);
            sink.log_tick(&TickRecord {
                tick: self.quotes_processed,
                ts_ns: now.nanos(),
                cash_ticks: self.portfolio.cash.0,
                settled_ticks: self.portfolio.settled_funds.0,
                loan_ticks: self.portfolio.loan.0,
                net_liquidation_ticks: net_liq.0,
                pending_orders: self.queues.orders.len(),
                pending_cancels: self.queues.cancels.len(),
                pending_replaces: self.queues.replaces.len(),
                pending_notifications: self.queues.notifications.len(),
                fills_total: self.stats.fills().len(),
            });
        }

        strategy.on_end();
        self.stats.set_interest_owed(self.portfolio.interest_owed);

        if self.quotes_processed > 0 {
            let final_net_liq = self.portfolio.net_liquidation(
                &self.current.best_bids(),
                &self.current.best_asks(),
            );
            self.stats.finish(self.current.timestamp, final_net_liq);
        }

        let summary = self.stats.run_summary(
            &self.params.strategy_name,
            self.params.random_seed,
            self.quotes_processed,
        );
        if let Some(path) = self.params.output_file.clone() {
            self.stats.write_summary_json(&summary, &path)?;
        }
        self.stats.write_report(
            out,
            self.params.verbosity,
            self.params.output_file.as_deref(),
        )?;

        Ok(RunResult {
            fills: self.stats.fills().to_vec(),
            portfolio: self.portfolio.clone(),
            quotes_processed: self.quotes_processed,
        })
    }

    fn dispatch_market_data(
        &mut self,
        strategy: &mut impl Strategy<D, S>,
        sink: &mut impl EventSink,
        state: &MarketState<D, S>,
    ) {
        let mut handle = EngineHandle {
            portfolio: &self.portfolio,
            state: &self.current,
            queues: &mut self.queues,
            stats: &mut self.stats,
            sink,
            next_order_id: &mut self.next_order_id,
            total_latency_ns: self.params.total_latency_ns(),
            receive_latency_ns: self.params.receive_latency_ns,
            leverage_factor: self.params.leverage_factor,
        };
        strategy.on_market_data(state, &mut handle);
    }

    /// Enforce the maintenance requirement. While in violation,
    /// liquidate one chunk of the first open position per iteration at
    /// the adverse side of the book; stop when cured or flat.
    fn check_margin(&mut self, sink: &mut impl EventSink) {
        let bids = self.current.best_bids();
        let asks = self.current.best_asks();
        if !self.portfolio.violates_margin(&bids, &asks) {
            self.margin_flagged = false;
            return;
        }

        let now = self.current.timestamp;
        loop {
            if !self.portfolio.violates_margin(&bids, &asks) {
                self.margin_flagged = false;
                return;
            }
            let Some((symbol, position_side, open_qty)) = self.portfolio.first_open_position()
            else {
                // Nothing left to liquidate; the violation stands.
                self.margin_flagged = true;
                sink.log_event(&SimEvent::MarginViolationUncured { ts_ns: now.nanos() });
                return;
            };

            let quantity = open_qty.min(LIQUIDATION_CHUNK);
            let (side, price) = match position_side {
                // Long: sell at the best bid.
                Side::Buy => (Side::Sell, bids[symbol.index()]),
                // Short: buy to cover at the best ask.
                Side::Sell => (Side::Buy, asks[symbol.index()]),
            };

            let fill = Fill {
                order_id: OrderId::NONE,
                symbol,
                side,
                kind: OrderKind::Market,
                tif: TimeInForce::Day,
                quantity,
                price,
                limit_price: price,
                timestamp: now,
            };
            self.apply_fill(fill);
            sink.log_event(&SimEvent::MarginCall { fill });
        }
    }

    /// Fixed sub-order per tick: cancels, replaces, then new orders.
    /// New-order executions wait for the session calendar; cancels and
    /// replaces apply regardless of trading hours.
    fn process_pending_orders(&mut self, now: TimeStamp) {
        self.queues.apply_matured_cancels(now);
        self.queues.apply_matured_replaces(now);

        if !self.calendar.can_trade(now) {
            return;
        }

        let mut i = 0;
        while i < self.queues.orders.len() {
            let pending = self.queues.orders[i];
            if now < pending.earliest_exec {
                i += 1;
                continue;
            }

            let rate = self.sample_fill_rate(pending.order.side);
            let quote = self.current.quotes[pending.order.symbol.index()];
            let execution = fill::try_execute(&pending.order, &quote, rate);

            if let Some(fill) = execution.fill {
                self.apply_fill(fill);
            }
            if execution.is_complete() {
                self.queues.orders.remove(i);
            } else {
                self.queues.orders[i].order.quantity = execution.remaining;
                i += 1;
            }
        }
    }

    fn deliver_notifications(
        &mut self,
        strategy: &mut impl Strategy<D, S>,
        sink: &mut impl EventSink,
        now: TimeStamp,
    ) {
        let due = self.queues.take_due_notifications(now);
        if due.is_empty() {
            return;
        }
        let mut handle = EngineHandle {
            portfolio: &self.portfolio,
            state: &self.current,
            queues: &mut self.queues,
            stats: &mut self.stats,
            sink,
            next_order_id: &mut self.next_order_id,
            total_latency_ns: self.params.total_latency_ns(),
            receive_latency_ns: self.params.receive_latency_ns,
            leverage_factor: self.params.leverage_factor,
        };
        for fill in due {
            strategy.on_fill(&fill, &mut handle);
        }
    }

    fn process_settlements(&mut self, now: TimeStamp) {
        if calendar::is_settlement_due(now, self.last_settlement) {
            self.portfolio.process_settlements(now);
            self.portfolio.accrue_daily_interest(self.params.interest_rate);
            self.last_settlement = now;
        }
    }

    /// Side-specific fill rate in percent. With randomness disabled the
    /// engine always fills at the maximum rate and never consults the
    /// RNG, keeping the order stream deterministic.
    fn sample_fill_rate(&mut self, side: Side) -> f64 {
        if !self.params.use_randomness {
            return 100.0;
        }
        let raw = match side {
            Side::Buy => self.params.buy_fill_rate.sample(&mut self.rng),
            Side::Sell => self.params.sell_fill_rate.sample(&mut self.rng),
        };
        raw.clamp(0.0, 100.0)
    }

    fn apply_fill(&mut self, fill: Fill) {
        self.portfolio
            .apply_fill(&fill, self.params.settlement_delay_ns);
        self.stats.record_fill(fill);
        self.stats.update_cash(self.portfolio.cash);
        self.stats.update_position_value(self.portfolio.position_value());
        self.queues
            .push_notification(fill, fill.timestamp.offset(self.params.receive_latency_ns));
    }
}
