//! Core domain layer
//!
//! This module contains the fundamental data structures, the indicator
//! catalog and the traits that the collector, storage and forecasting
//! layers are written against.

pub mod catalog;
pub mod data;
pub mod traits;
