//! nodekit - Structured logging with size-capped retention for a node,
//! plus the configuration interface of its EVM execution harness.
//!
//! The entry point is [`logging::init`], which wires a [`logging::LogConfig`]
//! into console and/or rotating-file output and returns the owning
//! [`logging::LogSystem`] handle.

pub mod evm;
pub mod logging;
