// src/fill.rs
//
// The fill model: given a matured order and the current book, decide how
// many shares trade and at what volume-weighted price. The sampled fill
// rate scales the visible liquidity; the residual quantity stays queued.

use crate::types::{Fill, NewOrder, OrderKind, Quantity, Quote, Side, Ticks};

/// Outcome of one execution attempt against a snapshot.
#[derive(Debug, Clone, Copy)]
pub struct Execution {
    /// The fill, if any quantity traded this snapshot.
    pub fill: Option<Fill>,
    /// Unfilled remainder that stays pending.
    pub remaining: Quantity,
}

impl Execution {
    pub fn is_complete(&self) -> bool {
        self.remaining.is_zero()
    }
}

/// Attempt to execute `order` against `quote` with a sampled fill rate
/// in percent. The rate is clamped to [0, 100].
///
/// Limit orders only consume levels at or better than the limit price,
/// so the volume-weighted execution price can never be worse than the
/// limit. Market orders walk the visible depth unconditionally.
pub fn try_execute<const D: usize>(
    order: &NewOrder,
    quote: &Quote<D>,
    fill_rate_pct: f64,
) -> Execution {
    let desired = order.quantity;
    let available = available_quantity(order, quote);

    let rate = fill_rate_pct.clamp(0.0, 100.0);
    let fillable = Quantity(((available.0.min(desired.0)) as f64 * rate / 100.0).floor() as i64);

    if !fillable.is_positive() {
        return Execution {
            fill: None,
            remaining: desired,
        };
    }

    let price = vwap_price(order, quote, fillable);
    let fill = Fill {
        order_id: order.id,
        symbol: order.symbol,
        side: order.side,
        kind: order.kind,
        tif: order.tif,
        quantity: fillable,
        price,
        limit_price: order.limit_price,
        timestamp: quote.timestamp,
    };

    Execution {
        fill: Some(fill),
        remaining: desired - fillable,
    }
}

/// Shares reachable for this order on the current book, bounded by the
/// desired quantity.
fn available_quantity<const D: usize>(order: &NewOrder, quote: &Quote<D>) -> Quantity {
    let mut remaining = order.quantity;
    let mut available = Quantity::ZERO;

    for level in 0..D {
        let (px, sz) = level_for(order.side, quote, level);
        if !px.is_positive() || !sz.is_positive() {
            continue;
        }
        if order.kind == OrderKind::Limit && breaches_limit(order, px) {
            break;
        }
        let take = remaining.min(sz);
        available += take;
        remaining -= take;
        if remaining.is_zero() {
            break;
        }
    }
    available
}

/// Volume-weighted price over the first `quantity` shares of the walk.
/// Only the traded portion prices in; a thin book does not drag deeper
/// levels into the average.
fn vwap_price<const D: usize>(order: &NewOrder, quote: &Quote<D>, quantity: Quantity) -> Ticks {
    let mut remaining = quantity;
    let mut notional = Ticks::ZERO;

    for level in 0..D {
        let (px, sz) = level_for(order.side, quote, level);
        if !px.is_positive() || !sz.is_positive() {
            continue;
        }
        if order.kind == OrderKind::Limit && breaches_limit(order, px) {
            break;
        }
        let take = remaining.min(sz);
        notional += px * take;
        remaining -= take;
        if remaining.is_zero() {
            break;
        }
    }
    notional / quantity
}

fn level_for<const D: usize>(side: Side, quote: &Quote<D>, level: usize) -> (Ticks, Quantity) {
    match side {
        Side::Buy => quote.ask(level),
        Side::Sell => quote.bid(level),
    }
}

fn breaches_limit(order: &NewOrder, px: Ticks) -> bool {
    match order.side {
        Side::Buy => px > order.limit_price,
        Side::Sell => px < order.limit_price,
    }
}
