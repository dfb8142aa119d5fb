//! # spot-desk
//!
//! The chat side of the spot-price desk: configuration, the Postgres price
//! store, the chat transport seam, usage analytics, and the per-message
//! handler that ties them to `spot-engine`.
//!
//! ## Modules
//!
//! - [`config`] — environment configuration
//! - [`store`] — [`PriceStore`] trait and the Postgres implementation
//! - [`transport`] — [`ChatTransport`] trait and progress helpers
//! - [`analytics`] — [`Recorder`] trait and in-memory counters
//! - [`plan`] — pure message planning
//! - [`handler`] — [`Desk`], the per-message flow
//! - [`error`] — Error types

pub mod analytics;
pub mod config;
pub mod error;
pub mod handler;
pub mod plan;
pub mod store;
pub mod transport;

pub use analytics::{Event, InMemoryRecorder, Recorder};
pub use config::Config;
pub use error::{DeskError, Result};
pub use handler::Desk;
pub use plan::{plan_message, Plan, PeriodPlan};
pub use store::{fetch_spot_rows, PgStore, PriceStore};
pub use transport::{BufferedTransport, ChatTransport, MessageId};
