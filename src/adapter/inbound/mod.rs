//! Inbound adapters driving the control surface.

pub mod cli;
