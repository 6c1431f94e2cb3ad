//! Core modules: the record store and everything it stands on.

pub mod config;
pub mod error;
pub mod logging;
pub mod query;
pub mod record;
pub mod rpc;
pub mod sheet;
pub mod store;
pub mod time;
