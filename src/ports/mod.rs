//! Port traits for the collaborators the engine talks to.

pub mod candle_port;
pub mod config_port;
pub mod execution_port;
