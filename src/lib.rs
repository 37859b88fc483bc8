//! Provider core for declarative infrastructure tools
//!
//! Two halves:
//!
//! - [`value`] adapts tri-state (null / unknown / known) attribute values
//!   between the host tool's wire encoding and the JSON interchange format
//!   of the remote API, for scalars and for nested lists, maps and sets.
//! - [`api`] is the remote-call side: a rate-limited [`Gateway`] that every
//!   call passes through, and a poller that blocks until an asynchronous
//!   remote operation reports `READY`.
//!
//! [`config`] holds persisted settings for both.

pub mod api;
pub mod config;
pub mod value;

pub use api::{ApiError, Gateway, GatewayOptions, PollError, PollOptions};
pub use value::{Adapter, TriState, ValueError};
