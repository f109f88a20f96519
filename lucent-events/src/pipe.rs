//! Pipe registries
//!
//! An emitter raising events owns an [`OutboundPipes`] listing who receives
//! them. The receiving side keeps [`InboundPipes`], weak links back to the
//! emitters it listens to, so it can replay their latches and detach itself.

use crate::emitter::{Emitter, WeakEmitter};
use crate::error::{EmitterError, Result};
use std::collections::HashMap;

/// One emitter or several, resolved once at the API boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Targets {
    One(Emitter),
    Many(Vec<Emitter>),
}

impl Targets {
    pub(crate) fn into_vec(self) -> Result<Vec<Emitter>> {
        let targets = match self {
            Targets::One(target) => vec![target],
            Targets::Many(targets) => targets,
        };
        if targets.is_empty() {
            return Err(EmitterError::invalid("pipe target list must not be empty"));
        }
        Ok(targets)
    }
}

impl From<Emitter> for Targets {
    fn from(target: Emitter) -> Self {
        Targets::One(target)
    }
}

impl From<&Emitter> for Targets {
    fn from(target: &Emitter) -> Self {
        Targets::One(target.clone())
    }
}

impl From<Vec<Emitter>> for Targets {
    fn from(targets: Vec<Emitter>) -> Self {
        Targets::Many(targets)
    }
}

impl From<&[Emitter]> for Targets {
    fn from(targets: &[Emitter]) -> Self {
        Targets::Many(targets.to_vec())
    }
}

impl<const N: usize> From<[&Emitter; N]> for Targets {
    fn from(targets: [&Emitter; N]) -> Self {
        Targets::Many(targets.into_iter().cloned().collect())
    }
}

/// Emitters that receive this emitter's events.
#[derive(Debug, Default)]
pub(crate) struct OutboundPipes {
    /// Receive every event, in registration order
    all: Vec<Emitter>,
    /// Receive one event name (and its sub-events), in registration order
    scoped: HashMap<String, Vec<Emitter>>,
}

impl OutboundPipes {
    pub(crate) fn add(&mut self, scope: Option<&str>, receiver: Emitter) {
        match scope {
            None => self.all.push(receiver),
            Some(name) => self
                .scoped
                .entry(name.to_string())
                .or_default()
                .push(receiver),
        }
    }

    /// Remove the first matching registration. Returns whether one existed.
    pub(crate) fn remove(&mut self, scope: Option<&str>, receiver: &Emitter) -> bool {
        match scope {
            None => remove_first(&mut self.all, receiver),
            Some(name) => {
                let Some(receivers) = self.scoped.get_mut(name) else {
                    return false;
                };
                let removed = remove_first(receivers, receiver);
                if receivers.is_empty() {
                    self.scoped.remove(name);
                }
                removed
            }
        }
    }

    /// Receivers for one dispatch: unscoped pipes first, then scoped pipes
    /// for each level of the namespace chain, most specific first.
    pub(crate) fn receivers_for(&self, chain: &[&str]) -> Vec<Emitter> {
        let mut receivers = self.all.clone();
        for level in chain {
            if let Some(scoped) = self.scoped.get(*level) {
                receivers.extend(scoped.iter().cloned());
            }
        }
        receivers
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.all.is_empty() && self.scoped.is_empty()
    }

    /// Every registration as `(scope, receiver)`, unscoped first.
    pub(crate) fn registrations(&self) -> Vec<(Option<String>, Emitter)> {
        let mut registrations: Vec<(Option<String>, Emitter)> = self
            .all
            .iter()
            .map(|receiver| (None, receiver.clone()))
            .collect();
        for (name, receivers) in &self.scoped {
            registrations.extend(
                receivers
                    .iter()
                    .map(|receiver| (Some(name.clone()), receiver.clone())),
            );
        }
        registrations
    }

    pub(crate) fn len(&self) -> usize {
        self.all.len() + self.scoped.values().map(Vec::len).sum::<usize>()
    }
}

fn remove_first(receivers: &mut Vec<Emitter>, receiver: &Emitter) -> bool {
    match receivers.iter().position(|candidate| candidate == receiver) {
        Some(index) => {
            receivers.remove(index);
            true
        }
        None => false,
    }
}

/// A weak link from a receiving emitter back to the emitter it pipes from.
#[derive(Debug, Clone)]
pub(crate) struct SourceLink {
    pub(crate) scope: Option<String>,
    pub(crate) emitter: WeakEmitter,
}

impl SourceLink {
    /// Whether this link carries events named exactly `name`.
    pub(crate) fn covers(&self, name: &str) -> bool {
        match &self.scope {
            None => true,
            Some(scope) => scope == name,
        }
    }
}

/// Emitters this emitter receives events from.
#[derive(Debug, Default)]
pub(crate) struct InboundPipes {
    links: Vec<SourceLink>,
}

impl InboundPipes {
    pub(crate) fn add(&mut self, scope: Option<&str>, source: &Emitter) {
        self.links.push(SourceLink {
            scope: scope.map(str::to_string),
            emitter: source.downgrade(),
        });
    }

    pub(crate) fn remove(&mut self, scope: Option<&str>, source: &Emitter) {
        let position = self.links.iter().position(|link| {
            link.scope.as_deref() == scope && link.emitter.points_to(source)
        });
        if let Some(index) = position {
            self.links.remove(index);
        }
    }

    /// Live sources whose pipe carries `name`, in registration order.
    pub(crate) fn sources_covering(&mut self, name: &str) -> Vec<Emitter> {
        self.prune();
        self.links
            .iter()
            .filter(|link| link.covers(name))
            .filter_map(|link| link.emitter.upgrade())
            .collect()
    }

    /// Forget links to emitters that no longer exist.
    pub(crate) fn prune(&mut self) {
        self.links.retain(|link| link.emitter.is_alive());
    }

    /// Every link, live or not.
    pub(crate) fn links(&self) -> Vec<SourceLink> {
        self.links.clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.links.len()
    }
}
