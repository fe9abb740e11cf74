//! Dispatch: routing decoded callbacks to a reply, under a deadline.
//!
//! - `dispatcher`: `MessageHandler` seam + the default canned-reply `Dispatcher`.
//! - `executor`: runs handler + encoder on a task and races it against the
//!   reply deadline.

pub mod dispatcher;
pub mod executor;

pub use dispatcher::{Dispatcher, MessageHandler, Outcome};
pub use executor::{Completion, DeadlineExecutor};
