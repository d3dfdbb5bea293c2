//! Processors of the polling pipeline.
//!
//! - `PollScheduler`: ticks on an interval, runs one `PoolSync` per pool
//! - `PoolDiscovery`: adds pairs created by the factory to the pool list
//! - `PoolSync`: fetches a pool's new `Swapped` logs and advances its cursor
//! - `FanoutDispatcher`: copies each swap into the feeds of the actor's
//!   followers

pub mod fanout;
pub mod poll_scheduler;
pub mod pool_discovery;
pub mod pool_sync;

pub use fanout::{DispatchReport, FanoutDispatcher, SwapBatch};
pub use poll_scheduler::{PollScheduler, PoolOutcome, TickReport};
pub use pool_discovery::PoolDiscovery;
pub use pool_sync::{PoolSync, SyncError, SyncOutcome};
