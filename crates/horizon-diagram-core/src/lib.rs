//! Core systems for Horizon Diagram.
//!
//! This crate provides the foundations the diagram scene is built on:
//!
//! - **Signal/Slot System**: Type-safe, reentrancy-tolerant notifications
//! - **Thread Affinity**: Checks that single-threaded objects stay on their thread
//! - **Logging**: `tracing` targets, spans and tree formatting helpers
//!
//! # Signal/Slot Example
//!
//! ```
//! use horizon_diagram_core::Signal;
//!
//! let value_changed = Signal::<i32>::new();
//! let conn_id = value_changed.connect(|value| {
//!     println!("Value changed to: {}", value);
//! });
//!
//! value_changed.emit(42);
//! value_changed.disconnect(conn_id);
//! ```

mod error;
pub mod logging;
pub mod signal;
pub mod thread_check;

pub use error::{CoreError, Result, SignalError};
pub use logging::{PerfSpan, TreeFormatOptions, TreeStyle};
pub use signal::{ConnectionId, Signal};
pub use thread_check::ThreadAffinity;
