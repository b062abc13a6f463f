//! Debug session controller on top of the Debug Adapter Protocol.
//!
//! [`controller::Controller`] drives one adapter session at a time and adds two things
//! plain adapters lack: range-targeted execution and step back by replay.

pub mod config;
pub mod console;
pub mod controller;
pub mod dap;
pub mod error;
pub mod source;
