//! Rate-limited load generator.
//!
//! This crate provides:
//! - A [`Generator`] that issues calls at a fixed rate for a fixed duration
//! - A [`TicketPool`] bounding how many calls are in flight
//! - Per-call timeouts with exactly one [`CallResult`] per call
//! - A lossy, non-blocking result stream
//!
//! The protocol spoken to the target is supplied by a [`Caller`].
//!
//! ## Example
//!
//! ```ignore
//! let (tx, mut rx) = tokio::sync::mpsc::channel(64);
//! let params = ParamSet::new(Arc::new(MyCaller::default()), tx)
//!     .timeout(Duration::from_millis(50))
//!     .loads_per_second(1000)
//!     .duration(Duration::from_secs(10));
//!
//! let generator = Generator::new(params)?;
//! assert!(generator.start());
//! while let Some(result) = rx.recv().await {
//!     println!("{result}");
//! }
//! ```

pub mod caller;
pub mod error;
pub mod generator;
pub mod lifecycle;
pub mod params;
pub mod result;
pub mod tickets;

pub use caller::{Caller, RawReq, RawResp};
pub use error::{CallError, LoadGenError, Result, TicketPoolError};
pub use generator::Generator;
pub use lifecycle::{GeneratorStatus, StatusCell};
pub use params::ParamSet;
pub use result::{CallResult, RetCode};
pub use tickets::{Ticket, TicketPool};
