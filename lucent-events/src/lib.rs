//! Synchronous event emitters for Lucent
//!
//! This crate provides an in-process publish/subscribe primitive: named
//! events, listeners, latched "flag" events and emitter-to-emitter piping.
//! Dispatch is synchronous and depth-first; there is no queue.
//!
//! ## Features
//!
//! - **Namespaced events** - `emit("a.b.c")` also reaches `"a.b"` and `"a"` listeners
//! - **One-shot listeners** - `weak_bind` / `once`
//! - **Flags** - latched events replayed to listeners bound later
//! - **Pipes** - receive another emitter's events, all or by name
//! - **Meta-events** - `emitter.*` events describing the emitter's own activity
//! - **Re-entrant** - listeners may bind, unbind and emit while being dispatched
//!
//! ## Quick Start
//!
//! ```rust
//! use lucent_events::{Emitter, Listener};
//! use serde_json::json;
//!
//! # fn main() -> lucent_events::Result<()> {
//! let emitter = Emitter::new();
//!
//! emitter.bind("user", Listener::new(|event| {
//!     println!("{} fired with {:?}", event.name(), event.args());
//!     Ok(())
//! }))?;
//!
//! // Reaches "user.created" listeners, then "user" listeners
//! emitter.emit("user.created", &[json!({"id": 123})])?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Flags
//!
//! ```rust
//! # use lucent_events::{Emitter, Listener};
//! # use serde_json::json;
//! # fn main() -> lucent_events::Result<()> {
//! let emitter = Emitter::new();
//! emitter.flag("ready", &[json!("v1")])?;
//!
//! // Invoked immediately with ["v1"]
//! emitter.bind("ready", Listener::new(|event| {
//!     assert_eq!(event.args(), &[json!("v1")]);
//!     Ok(())
//! }))?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Piping
//!
//! ```rust
//! # use lucent_events::{Emitter, Listener};
//! # fn main() -> lucent_events::Result<()> {
//! let app = Emitter::new();
//! let socket = Emitter::new();
//!
//! // `app` now receives every event raised on `socket`
//! app.pipe(&socket)?;
//!
//! let expected = socket.clone();
//! app.bind("message", Listener::new(move |event| {
//!     assert_eq!(event.source(), &expected);
//!     Ok(())
//! }))?;
//! socket.emit("message", &[])?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Listener errors propagate out of `emit` unchanged. Emitting `"error"`
//! with nobody listening is itself an error:
//!
//! ```rust
//! # use lucent_events::{Emitter, EmitterError};
//! # use serde_json::json;
//! let emitter = Emitter::new();
//! match emitter.emit("error", &[json!("disk full")]) {
//!     Err(EmitterError::Unhandled(value)) => assert_eq!(value, json!("disk full")),
//!     other => panic!("unexpected: {:?}", other),
//! }
//! ```

pub mod config;
pub mod emitter;
pub mod error;
pub mod event;
pub mod evented;
pub mod listener;
pub mod pipe;
pub mod subscription;

pub use config::{EmitterBuilder, EmitterConfig};
pub use emitter::{Emitter, Latch, WeakEmitter};
pub use error::{EmitterError, Result};
pub use event::{Event, Events, Subject, expand, meta};
pub use evented::Evented;
pub use listener::{Flow, Listener, Listeners};
pub use pipe::Targets;
pub use subscription::Subscription;
