// src/strategy.rs
//
// The strategy callback surface. The engine borrows the strategy for
// each simulation step and hands it an `EngineHandle` scoped to that
// callback; the handle is the only way a strategy mutates engine state.

use crate::engine::EngineHandle;
use crate::types::{Fill, MarketState};

/// User-implemented trading logic.
///
/// `on_market_data` runs once per snapshot before queue processing.
/// `on_fill` runs when a fill notification matures, i.e. receive-latency
/// after the fill was decided; orders placed from `on_fill` take effect
/// one tick later like any other placement.
pub trait Strategy<const D: usize, const S: usize> {
    fn on_market_data(&mut self, state: &MarketState<D, S>, engine: &mut EngineHandle<'_, D, S>);

    fn on_fill(&mut self, fill: &Fill, engine: &mut EngineHandle<'_, D, S>) {
        let _ = (fill, engine);
    }

    fn on_end(&mut self) {}
}
