// src/types.rs
//
// Common shared types for the replay simulator: integer newtypes for
// prices/quantities/time, order and fill records, and the depth-N quote
// and multi-symbol market snapshot the engine consumes.

use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// Ticks per dollar. All monetary values are integer ticks at this scale.
pub const TICKS_PER_DOLLAR: i64 = 1_000_000;

/// Integer price in minor units (1e6 ticks = $1.00).
///
/// Arithmetic with [`Quantity`] yields `Ticks`, so notional math stays in
/// one unit and cross-unit mixing fails to compile.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Ticks(pub i64);

impl Ticks {
    pub const ZERO: Ticks = Ticks(0);

    /// Dollar value for display purposes only; accounting stays integral.
    pub fn as_dollars(self) -> f64 {
        self.0 as f64 / TICKS_PER_DOLLAR as f64
    }

    pub fn from_dollars(dollars: f64) -> Ticks {
        Ticks((dollars * TICKS_PER_DOLLAR as f64) as i64)
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl Add for Ticks {
    type Output = Ticks;
    fn add(self, rhs: Ticks) -> Ticks {
        Ticks(self.0 + rhs.0)
    }
}

impl Sub for Ticks {
    type Output = Ticks;
    fn sub(self, rhs: Ticks) -> Ticks {
        Ticks(self.0 - rhs.0)
    }
}

impl AddAssign for Ticks {
    fn add_assign(&mut self, rhs: Ticks) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Ticks {
    fn sub_assign(&mut self, rhs: Ticks) {
        self.0 -= rhs.0;
    }
}

impl Neg for Ticks {
    type Output = Ticks;
    fn neg(self) -> Ticks {
        Ticks(-self.0)
    }
}

impl Mul<Quantity> for Ticks {
    type Output = Ticks;
    fn mul(self, rhs: Quantity) -> Ticks {
        Ticks(self.0 * rhs.0)
    }
}

impl Div<Quantity> for Ticks {
    type Output = Ticks;
    fn div(self, rhs: Quantity) -> Ticks {
        Ticks(self.0 / rhs.0)
    }
}

impl Mul<i64> for Ticks {
    type Output = Ticks;
    fn mul(self, rhs: i64) -> Ticks {
        Ticks(self.0 * rhs)
    }
}

impl Div<i64> for Ticks {
    type Output = Ticks;
    fn div(self, rhs: i64) -> Ticks {
        Ticks(self.0 / rhs)
    }
}

impl fmt::Display for Ticks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.as_dollars())
    }
}

/// Signed share count. Position direction is carried by the portfolio's
/// separate long/short arrays, so quantities on orders and fills are
/// always positive.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Quantity(pub i64);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl Add for Quantity {
    type Output = Quantity;
    fn add(self, rhs: Quantity) -> Quantity {
        Quantity(self.0 + rhs.0)
    }
}

impl Sub for Quantity {
    type Output = Quantity;
    fn sub(self, rhs: Quantity) -> Quantity {
        Quantity(self.0 - rhs.0)
    }
}

impl AddAssign for Quantity {
    fn add_assign(&mut self, rhs: Quantity) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Quantity {
    fn sub_assign(&mut self, rhs: Quantity) {
        self.0 -= rhs.0;
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Nanoseconds since the UNIX epoch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct TimeStamp(pub u64);

impl TimeStamp {
    pub const ZERO: TimeStamp = TimeStamp(0);

    pub fn nanos(self) -> u64 {
        self.0
    }

    /// Offset by a latency or delay expressed in nanoseconds.
    pub fn offset(self, delta_ns: u64) -> TimeStamp {
        TimeStamp(self.0 + delta_ns)
    }
}

/// Engine-assigned order identifier. User orders count up from 1;
/// id 0 is reserved for engine-internal margin-call fills.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct OrderId(pub u64);

impl OrderId {
    /// Sentinel for rejected placements and forced-liquidation fills.
    pub const NONE: OrderId = OrderId(0);

    pub fn is_user(self) -> bool {
        self.0 != 0
    }
}

/// Compact symbol index into the per-run symbol table (0..S-1).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct SymbolIdx(pub u16);

impl SymbolIdx {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Buy or sell side of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

/// Order pricing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderKind {
    Market,
    Limit,
}

impl OrderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderKind::Market => "MARKET",
            OrderKind::Limit => "LIMIT",
        }
    }
}

/// Time-in-force. Carried through on orders and fills; expiry logic is a
/// future extension and all TIFs currently queue the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeInForce {
    Day,
    Ioc,
    Fok,
    Gtc,
}

impl TimeInForce {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeInForce::Day => "DAY",
            TimeInForce::Ioc => "IOC",
            TimeInForce::Fok => "FOK",
            TimeInForce::Gtc => "GTC",
        }
    }
}

/// One level-2 snapshot for a single symbol: D levels of resting bids and
/// asks plus the feed timestamp.
///
/// A quote is valid when `bid_px[0] < ask_px[0]` and `bid_px[0] > 0`;
/// crossed or empty books are filtered by the market-data source. Prices
/// are monotone by level (bids descending, asks ascending).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote<const D: usize> {
    pub timestamp: TimeStamp,
    pub bid_px: [Ticks; D],
    pub ask_px: [Ticks; D],
    pub bid_sz: [Quantity; D],
    pub ask_sz: [Quantity; D],
}

impl<const D: usize> Quote<D> {
    pub const EMPTY: Quote<D> = Quote {
        timestamp: TimeStamp::ZERO,
        bid_px: [Ticks::ZERO; D],
        ask_px: [Ticks::ZERO; D],
        bid_sz: [Quantity::ZERO; D],
        ask_sz: [Quantity::ZERO; D],
    };

    pub fn best_bid(&self) -> Ticks {
        self.bid_px[0]
    }

    pub fn best_ask(&self) -> Ticks {
        self.ask_px[0]
    }

    pub fn bid(&self, level: usize) -> (Ticks, Quantity) {
        (self.bid_px[level], self.bid_sz[level])
    }

    pub fn ask(&self, level: usize) -> (Ticks, Quantity) {
        (self.ask_px[level], self.ask_sz[level])
    }

    /// Level-1 validity: uncrossed and non-empty.
    pub fn is_valid(&self) -> bool {
        self.best_bid() < self.best_ask() && self.best_bid() > Ticks::ZERO
    }
}

impl<const D: usize> Default for Quote<D> {
    fn default() -> Self {
        Quote::EMPTY
    }
}

/// One simulation step's view of the market: a common timestamp plus one
/// quote per symbol index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketState<const D: usize, const S: usize> {
    pub timestamp: TimeStamp,
    pub quotes: [Quote<D>; S],
}

impl<const D: usize, const S: usize> MarketState<D, S> {
    pub fn quote(&self, symbol: SymbolIdx) -> &Quote<D> {
        &self.quotes[symbol.index()]
    }

    /// Level-0 bid per symbol, in symbol-index order.
    pub fn best_bids(&self) -> [Ticks; S] {
        let mut out = [Ticks::ZERO; S];
        for i in 0..S {
            out[i] = self.quotes[i].best_bid();
        }
        out
    }

    /// Level-0 ask per symbol, in symbol-index order.
    pub fn best_asks(&self) -> [Ticks; S] {
        let mut out = [Ticks::ZERO; S];
        for i in 0..S {
            out[i] = self.quotes[i].best_ask();
        }
        out
    }
}

impl<const D: usize, const S: usize> Default for MarketState<D, S> {
    fn default() -> Self {
        MarketState {
            timestamp: TimeStamp::ZERO,
            quotes: [Quote::EMPTY; S],
        }
    }
}

/// A new order as created by the strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub id: OrderId,
    pub symbol: SymbolIdx,
    pub side: Side,
    pub kind: OrderKind,
    pub quantity: Quantity,
    pub tif: TimeInForce,
    /// Limit price; `Ticks::ZERO` for market orders.
    pub limit_price: Ticks,
}

/// An execution against the recorded book.
///
/// `timestamp` is the time of the snapshot the fill was decided against;
/// the strategy hears about it `receive_latency` later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: OrderId,
    pub symbol: SymbolIdx,
    pub side: Side,
    pub kind: OrderKind,
    pub tif: TimeInForce,
    pub quantity: Quantity,
    /// Volume-weighted execution price across the consumed levels.
    pub price: Ticks,
    /// The order's original limit price (zero for market orders).
    pub limit_price: Ticks,
    pub timestamp: TimeStamp,
}

impl Fill {
    /// Notional of the fill in ticks.
    pub fn notional(&self) -> Ticks {
        self.price * self.quantity
    }
}
