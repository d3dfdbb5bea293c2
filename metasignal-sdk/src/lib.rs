//! Request and response types for the metasignal HTTP API.
//!
//! Shared between the server and any consumer (presentation layers, bots)
//! so both sides agree on the wire format.

pub mod objects;
