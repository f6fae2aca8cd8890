//! # System Module
//!
//! The build state machine: which stage a build is in, and which stage a
//! failure belongs to.

mod stage;

pub use stage::*;
