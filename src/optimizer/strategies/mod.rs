//! Concrete dispatch optimizers.

pub mod lti;

pub use lti::*;
