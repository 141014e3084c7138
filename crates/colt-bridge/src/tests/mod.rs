//! Crate-internal test support and behavioural scenarios.

mod behaviour;
pub(crate) mod support;
