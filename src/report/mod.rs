//! Report module - ranked column tables and JSON export

pub mod export;
pub mod ranking;

pub use export::*;
pub use ranking::*;
