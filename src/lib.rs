//! Client library for a hosted publish/subscribe messaging service.
//!
//! A [`Context`](context::Context) is the unit of work and the unit of
//! mutual exclusion: it drives one HTTP transaction at a time from URL
//! assembly through DNS resolution, connect, send, receive, and parse,
//! and exposes the result as an [`Outcome`](error::Outcome).

pub mod channel_group;
pub mod context;
pub mod error;
#[cfg(feature = "advanced-history")]
pub mod history;
pub mod json;
pub mod publish;
pub mod resolver;
pub mod subscribe;
pub mod transaction;
pub mod transport;
pub mod url;
mod uuid_gen;

pub use context::{Context, ContextConfig, NotifyMode, OperationKind};
pub use error::{Error, Outcome, PublishFailure};
pub use publish::{PublishMethod, PublishOptions};
