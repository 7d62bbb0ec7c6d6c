// src/error.rs
//
// Error kinds for the simulator. Data errors abort a run; config errors
// abort before the loop starts. Insufficient funds on order placement is
// deliberately NOT an error: `place_order` returns the `OrderId(0)`
// sentinel and the run continues.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("market data error: {0}")]
    Data(String),
    #[error("invalid run parameters: {0}")]
    Config(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimError {
    pub fn data(msg: impl Into<String>) -> SimError {
        SimError::Data(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> SimError {
        SimError::Config(msg.into())
    }
}
