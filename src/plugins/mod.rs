//! Tool surfaces built on the core store.

pub mod projects;
