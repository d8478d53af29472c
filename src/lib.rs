/*!
 * A stress-testing ("diff") judging pipeline: compiles a user solution, a
 * reference solution, and an optional input generator, then repeatedly
 * runs them against each other inside an unprivileged sandbox, comparing
 * outputs with a pluggable checker and streaming per-test verdicts.
 *
 * This crate is the judging engine only. HTTP framing, session storage,
 * authentication, and schema validation are the caller's responsibility —
 * see [`persistence`] for the seam the caller plugs a real database into.
 */

pub mod accounting;
pub mod checker;
pub mod compiler;
pub mod config;
pub mod controller;
pub mod error;
pub mod judge;
pub mod model;
pub mod persistence;
pub mod sandbox;
pub mod stopflags;
pub mod stream;

pub use config::Config;
pub use controller::Controller;
pub use error::{Error, ErrorKind, Result};
pub use stopflags::StopFlags;
pub use stream::Event;
