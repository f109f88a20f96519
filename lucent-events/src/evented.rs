//! Emitter behaviour for host types
//!
//! Any type that owns an [`Emitter`] can implement [`Evented`] and gains the
//! common operations as provided methods. Adapters bridging foreign
//! notification systems (UI toolkits, sockets) implement this trait and call
//! `emit` from their own callbacks.

use crate::emitter::Emitter;
use crate::error::Result;
use crate::event::Events;
use crate::listener::Listeners;
use crate::pipe::Targets;
use serde_json::Value;

/// A type that carries an emitter.
///
/// ```rust
/// use lucent_events::{Emitter, Evented, Listener};
///
/// struct Player {
///     events: Emitter,
/// }
///
/// impl Evented for Player {
///     fn emitter(&self) -> &Emitter {
///         &self.events
///     }
/// }
///
/// # fn main() -> lucent_events::Result<()> {
/// let player = Player { events: Emitter::new() };
/// player.on("ended", Listener::new(|_| Ok(())))?;
/// player.flag("loaded", &[])?;
/// assert!(player.emitter().is_flagged("loaded"));
/// # Ok(())
/// # }
/// ```
pub trait Evented {
    fn emitter(&self) -> &Emitter;

    fn on(&self, events: impl Into<Events>, listeners: impl Into<Listeners>) -> Result<&Self> {
        self.emitter().bind(events, listeners)?;
        Ok(self)
    }

    fn once(&self, events: impl Into<Events>, listeners: impl Into<Listeners>) -> Result<&Self> {
        self.emitter().weak_bind(events, listeners)?;
        Ok(self)
    }

    fn off(&self, events: impl Into<Events>, listeners: impl Into<Listeners>) -> Result<&Self> {
        self.emitter().unbind(events, listeners)?;
        Ok(self)
    }

    fn emit(&self, events: impl Into<Events>, args: &[Value]) -> Result<&Self> {
        self.emitter().emit(events, args)?;
        Ok(self)
    }

    fn flag(&self, events: impl Into<Events>, args: &[Value]) -> Result<&Self> {
        self.emitter().flag(events, args)?;
        Ok(self)
    }

    /// Receive every event of `targets` on this type's emitter.
    fn pipe(&self, targets: impl Into<Targets>) -> Result<&Self> {
        self.emitter().pipe(targets)?;
        Ok(self)
    }

    /// Forward this type's events into another evented value.
    fn pipe_into<T: Evented + ?Sized>(&self, receiver: &T) -> Result<&Self> {
        receiver.emitter().pipe(self.emitter())?;
        Ok(self)
    }
}

impl Evented for Emitter {
    fn emitter(&self) -> &Emitter {
        self
    }
}
