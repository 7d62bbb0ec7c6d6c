// src/portfolio.rs
//
// Account bookkeeping: cash against settled funds, margin loan and
// interest, per-symbol long/short inventory with weighted-average cost
// bases, the pending-settlement ledger, and the margin / buying-power
// math the engine enforces.
//
// Invariants:
//   - settled_funds >= 0, loan >= 0, interest_owed >= 0 at all times
//     (cash may go negative under margin);
//   - for each symbol at most one of long_qty / short_qty is nonzero;
//   - cost_basis resets to zero whenever a symbol goes flat.

use crate::types::{
    Fill, MarketState, NewOrder, OrderKind, Quantity, Quote, Side, SymbolIdx, Ticks, TimeStamp,
};

/// Sale proceeds (and the settled portion of purchases) parked until
/// their settlement timestamp passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsettledFunds {
    pub amount: Ticks,
    pub earliest_settlement: TimeStamp,
}

#[derive(Debug, Clone)]
pub struct Portfolio<const S: usize> {
    /// Total cash including unsettled proceeds. Goes negative when
    /// purchases draw on margin.
    pub cash: Ticks,
    /// The spendable subset of cash.
    pub settled_funds: Ticks,
    /// Outstanding margin loan principal.
    pub loan: Ticks,
    /// Accrued, unpaid interest on the loan.
    pub interest_owed: Ticks,
    pub long_qty: [Quantity; S],
    pub short_qty: [Quantity; S],
    /// Size-weighted average entry price of the open position per symbol.
    pub cost_basis: [Ticks; S],
    pub pending_funds: Vec<UnsettledFunds>,
}

impl<const S: usize> Portfolio<S> {
    pub fn new(starting_cash: Ticks) -> Self {
        Portfolio {
            cash: starting_cash,
            settled_funds: starting_cash,
            loan: Ticks::ZERO,
            interest_owed: Ticks::ZERO,
            long_qty: [Quantity::ZERO; S],
            short_qty: [Quantity::ZERO; S],
            cost_basis: [Ticks::ZERO; S],
            pending_funds: Vec::new(),
        }
    }

    /// Cash that has not yet settled.
    pub fn unsettled_funds(&self) -> Ticks {
        self.cash - self.settled_funds
    }

    /// Sum of all queued settlement amounts.
    pub fn pending_total(&self) -> Ticks {
        self.pending_funds
            .iter()
            .fold(Ticks::ZERO, |acc, p| acc + p.amount)
    }

    /// Apply an execution. `settlement_delay_ns` schedules the
    /// settlement entries this fill creates.
    pub fn apply_fill(&mut self, fill: &Fill, settlement_delay_ns: u64) {
        let qty = fill.quantity;
        let px = fill.price;
        let notional = px * qty;
        let sym = fill.symbol.index();
        let due = fill.timestamp.offset(settlement_delay_ns);

        match fill.side {
            Side::Buy => {
                let settled_used = notional.min(self.settled_funds);
                let margin_used = notional - settled_used;

                self.settled_funds -= settled_used;
                self.loan += margin_used;
                self.cash -= notional;

                // The settled portion of the purchase re-settles after
                // the standard delay.
                if settled_used > Ticks::ZERO {
                    self.pending_funds.push(UnsettledFunds {
                        amount: settled_used,
                        earliest_settlement: due,
                    });
                }

                // Cover any short first, then extend or open the long.
                let cover = qty.min(self.short_qty[sym]);
                self.short_qty[sym] -= cover;

                let open = qty - cover;
                if open.is_positive() {
                    let existing = self.long_qty[sym];
                    self.cost_basis[sym] = weighted_basis(self.cost_basis[sym], existing, px, open);
                    self.long_qty[sym] += open;
                }
            }
            Side::Sell => {
                self.cash += notional;

                // Proceeds pay down the loan before anything settles.
                let repay = notional.min(self.loan);
                self.loan -= repay;

                let remainder = notional - repay;
                if remainder > Ticks::ZERO {
                    self.pending_funds.push(UnsettledFunds {
                        amount: remainder,
                        earliest_settlement: due,
                    });
                }

                // Close the long first, then extend or open the short.
                let cover = qty.min(self.long_qty[sym]);
                self.long_qty[sym] -= cover;

                let open = qty - cover;
                if open.is_positive() {
                    let existing = self.short_qty[sym];
                    self.cost_basis[sym] = weighted_basis(self.cost_basis[sym], existing, px, open);
                    self.short_qty[sym] += open;
                }
            }
        }

        if self.long_qty[sym].is_zero() && self.short_qty[sym].is_zero() {
            self.cost_basis[sym] = Ticks::ZERO;
        }
    }

    /// Move every matured pending entry into settled funds. Total cash
    /// is unchanged; this is a reclassification.
    pub fn process_settlements(&mut self, now: TimeStamp) {
        let mut settled = Ticks::ZERO;
        self.pending_funds.retain(|p| {
            if p.earliest_settlement <= now {
                settled += p.amount;
                false
            } else {
                true
            }
        });
        self.settled_funds += settled;
    }

    /// Accrue one day of compound interest on the outstanding loan.
    pub fn accrue_daily_interest(&mut self, annual_rate_percent: f64) {
        if self.loan <= Ticks::ZERO {
            return;
        }
        let daily_rate = annual_rate_percent / (365.0 * 100.0);
        let base = (self.loan + self.interest_owed).0 as f64;
        self.interest_owed += Ticks((base * daily_rate).floor() as i64);
    }

    /// Pay down accrued interest from settled funds. A zero `amount`
    /// pays as much as possible. Never pays more than is owed or than
    /// settled funds cover; returns the amount actually paid.
    pub fn pay_interest(&mut self, amount: Ticks) -> Ticks {
        let requested = if amount == Ticks::ZERO {
            self.interest_owed
        } else {
            amount
        };
        let paid = requested.min(self.interest_owed).min(self.settled_funds);
        self.settled_funds -= paid;
        self.interest_owed -= paid;
        paid
    }

    pub fn long_market_value(&self, bids: &[Ticks; S]) -> Ticks {
        let mut mv = Ticks::ZERO;
        for i in 0..S {
            mv += bids[i] * self.long_qty[i];
        }
        mv
    }

    pub fn short_market_value(&self, asks: &[Ticks; S]) -> Ticks {
        let mut mv = Ticks::ZERO;
        for i in 0..S {
            mv += asks[i] * self.short_qty[i];
        }
        mv
    }

    pub fn gross_market_value(&self, bids: &[Ticks; S], asks: &[Ticks; S]) -> Ticks {
        self.long_market_value(bids) + self.short_market_value(asks)
    }

    /// Cash + longs at bid - shorts at ask - loan - accrued interest.
    pub fn net_liquidation(&self, bids: &[Ticks; S], asks: &[Ticks; S]) -> Ticks {
        self.cash + self.long_market_value(bids) - self.short_market_value(asks)
            - self.loan
            - self.interest_owed
    }

    /// 30% of gross exposure.
    pub fn maintenance_requirement(&self, bids: &[Ticks; S], asks: &[Ticks; S]) -> Ticks {
        self.gross_market_value(bids, asks) * 3 / 10
    }

    pub fn violates_margin(&self, bids: &[Ticks; S], asks: &[Ticks; S]) -> bool {
        self.net_liquidation(bids, asks) < self.maintenance_requirement(bids, asks)
    }

    /// Entry-priced value of all open positions; used for reporting.
    pub fn position_value(&self) -> Ticks {
        let mut value = Ticks::ZERO;
        for i in 0..S {
            value += self.cost_basis[i] * (self.long_qty[i] + self.short_qty[i]);
        }
        value
    }

    /// First symbol carrying any position, longs scanned before shorts.
    pub fn first_open_position(&self) -> Option<(SymbolIdx, Side, Quantity)> {
        for i in 0..S {
            if self.long_qty[i].is_positive() {
                return Some((SymbolIdx(i as u16), Side::Buy, self.long_qty[i]));
            }
        }
        for i in 0..S {
            if self.short_qty[i].is_positive() {
                return Some((SymbolIdx(i as u16), Side::Sell, self.short_qty[i]));
            }
        }
        None
    }

    /// Pre-trade sufficiency: the order's opening portion must fit
    /// inside leveraged buying power, and the account must have positive
    /// net liquidation to begin with.
    pub fn sufficient_equity_for_order<const D: usize>(
        &self,
        order: &NewOrder,
        state: &MarketState<D, S>,
        leverage_factor: f64,
    ) -> bool {
        let bids = state.best_bids();
        let asks = state.best_asks();

        let net_liq = self.net_liquidation(&bids, &asks);
        if net_liq <= Ticks::ZERO {
            return false;
        }

        let quote = state.quote(order.symbol);
        let sym = order.symbol.index();

        let total_order_price = match order.kind {
            OrderKind::Limit => order.limit_price * order.quantity,
            OrderKind::Market => market_order_notional(quote, order.side, order.quantity),
        };

        let (closing, opening) = match order.side {
            Side::Buy => {
                let c = order.quantity.min(self.short_qty[sym]);
                (c, order.quantity - c)
            }
            Side::Sell => {
                let c = order.quantity.min(self.long_qty[sym]);
                (c, order.quantity - c)
            }
        };

        // The closing portion unwinds exposure at its current mark; the
        // opening portion adds exposure at the order's average price.
        let closing_reduction = match order.side {
            Side::Buy => asks[sym] * closing,
            Side::Sell => bids[sym] * closing,
        };
        let opening_addition = if order.quantity.is_zero() {
            Ticks::ZERO
        } else {
            (total_order_price / order.quantity) * opening
        };

        let gross = self.gross_market_value(&bids, &asks);
        let projected = gross - closing_reduction + opening_addition;

        (projected.0 as f64) <= (net_liq.0 as f64) * leverage_factor
    }
}

/// Size-weighted average of an existing basis with a new lot.
fn weighted_basis(basis: Ticks, existing: Quantity, px: Ticks, added: Quantity) -> Ticks {
    if existing.is_zero() {
        px
    } else {
        (basis * existing + px * added) / (existing + added)
    }
}

/// Walk the far side of the book for the notional of a market order.
/// Quantity beyond the visible depth is priced at the deepest level seen.
fn market_order_notional<const D: usize>(quote: &Quote<D>, side: Side, qty: Quantity) -> Ticks {
    let mut remaining = qty;
    let mut notional = Ticks::ZERO;
    let mut last_px = Ticks::ZERO;

    for level in 0..D {
        let (px, sz) = match side {
            Side::Buy => quote.ask(level),
            Side::Sell => quote.bid(level),
        };
        if !px.is_positive() || !sz.is_positive() {
            continue;
        }
        last_px = px;
        let take = remaining.min(sz);
        notional += px * take;
        remaining -= take;
        if remaining.is_zero() {
            break;
        }
    }

    if remaining.is_positive() {
        notional += last_px * remaining;
    }
    notional
}
