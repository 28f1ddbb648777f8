//! Shared foundational types used across the gatesim workspace.
//!
//! This crate provides the two-state signal value model (single bits and packed
//! fixed-width buses), oscillator frequencies, and common result types.

#![warn(missing_docs)]

pub mod frequency;
pub mod result;
pub mod value;

pub use frequency::{Frequency, ParseFrequencyError};
pub use result::{GateResult, InternalError};
pub use value::{BusValue, Value, MAX_BUS_WIDTH};
