//! Subscription handles

use crate::emitter::{Emitter, WeakEmitter};
use crate::error::Result;
use crate::listener::{Binding, Listener};
use std::sync::Arc;

/// The bindings made by one [`Emitter::subscribe`] call.
///
/// [`clear`](Self::clear) removes exactly those bindings, even when the same
/// listener is bound elsewhere on the emitter. Dropping the handle leaves the
/// bindings in place.
#[derive(Debug)]
pub struct Subscription {
    emitter: WeakEmitter,
    bindings: Vec<(String, Arc<Binding>)>,
}

impl Subscription {
    pub(crate) fn new(emitter: &Emitter, bindings: Vec<(String, Arc<Binding>)>) -> Self {
        Self {
            emitter: emitter.downgrade(),
            bindings,
        }
    }

    /// Event names this subscription bound, one entry per binding.
    pub fn events(&self) -> Vec<&str> {
        self.bindings.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn listeners(&self) -> Vec<Listener> {
        self.bindings
            .iter()
            .map(|(_, binding)| binding.listener.clone())
            .collect()
    }

    /// Unbind everything this subscription bound. Returns how many bindings
    /// were still present.
    pub fn clear(&self) -> Result<usize> {
        let Some(emitter) = self.emitter.upgrade() else {
            return Ok(0);
        };
        let mut removed = 0;
        for (name, binding) in &self.bindings {
            if emitter.detach(name, binding)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
