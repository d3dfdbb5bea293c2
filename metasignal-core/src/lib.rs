#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod entities;
pub mod framework;
pub mod ledger;
pub mod pricing;
pub mod processors;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;
