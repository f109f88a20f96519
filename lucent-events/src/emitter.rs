//! The emitter: listener registry, latches, pipes and the dispatch engine

use crate::config::EmitterConfig;
use crate::error::{EmitterError, Result};
use crate::event::{self, Event, Events, Subject, expand, meta};
use crate::listener::{Binding, Flow, Listener, Listeners};
use crate::pipe::{InboundPipes, OutboundPipes, Targets};
use crate::subscription::Subscription;
use chrono::{DateTime, Utc};
use parking_lot::{ReentrantMutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, trace, warn};
use uuid::Uuid;

// ============================================================================
// State
// ============================================================================

/// A latched flag value: the arguments a late listener is replayed with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Latch {
    /// Arguments passed to `flag`
    pub args: Vec<Value>,

    /// When the flag was raised
    pub raised_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    listeners: BTreeMap<String, Vec<Arc<Binding>>>,
    outbound: OutboundPipes,
    inbound: InboundPipes,

    // Valid only while an operation is running, restored on exit.
    source: Option<Emitter>,
    event: Option<String>,
    cancel_bubble: bool,
}

struct Shared {
    id: Uuid,
    config: EmitterConfig,
    /// Held for the whole of every public operation. Re-entrant so listeners
    /// may call back into the emitter on the same thread.
    ///
    /// Operations spanning two emitters lock the forwarding source before the
    /// receiver, the same order forwarding itself uses.
    state: ReentrantMutex<RefCell<State>>,
    /// Latches. A leaf lock: never held while another lock is taken, so
    /// receivers can read a source's latches without its state lock.
    flags: RwLock<BTreeMap<String, Latch>>,
}

/// Synchronous event emitter.
///
/// `Emitter` is a cheap handle: clones share the same registry, and two
/// handles compare equal when they point at the same emitter.
///
/// ```rust
/// use lucent_events::{Emitter, Listener};
/// use serde_json::json;
///
/// # fn main() -> lucent_events::Result<()> {
/// let emitter = Emitter::new();
/// emitter
///     .bind("user.login", Listener::new(|event| {
///         assert_eq!(event.arg(0), Some(&json!("alice")));
///         Ok(())
///     }))?
///     .emit("user.login", &[json!("alice")])?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Emitter {
    shared: Arc<Shared>,
}

/// Non-owning handle to an emitter.
#[derive(Clone)]
pub struct WeakEmitter {
    shared: Weak<Shared>,
}

impl WeakEmitter {
    pub fn upgrade(&self) -> Option<Emitter> {
        self.shared.upgrade().map(|shared| Emitter { shared })
    }

    pub fn is_alive(&self) -> bool {
        self.shared.strong_count() > 0
    }

    pub(crate) fn points_to(&self, emitter: &Emitter) -> bool {
        std::ptr::eq(self.shared.as_ptr(), Arc::as_ptr(&emitter.shared))
    }
}

impl fmt::Debug for WeakEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(emitter) => write!(f, "WeakEmitter({:?})", emitter),
            None => write!(f, "WeakEmitter(<dropped>)"),
        }
    }
}

// ============================================================================
// Scope guards
// ============================================================================

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Counts nested dispatches on this thread.
struct DepthGuard;

impl DepthGuard {
    fn enter(limit: usize, event: &str) -> Result<Self> {
        DEPTH.with(|depth| {
            let next = depth.get() + 1;
            if next > limit {
                return Err(EmitterError::DepthExceeded {
                    event: event.to_string(),
                    depth: limit,
                });
            }
            depth.set(next);
            Ok(DepthGuard)
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Sets `source` (and optionally `event`) and puts the previous values back
/// on drop, including when a listener error unwinds the operation.
struct ContextGuard<'a> {
    emitter: &'a Emitter,
    source: Option<Emitter>,
    event: Option<Option<String>>,
}

impl<'a> ContextGuard<'a> {
    fn enter(emitter: &'a Emitter, source: Emitter, event: Option<&str>) -> Self {
        emitter.with_state(|state| {
            let previous_source = state.source.replace(source);
            let previous_event =
                event.map(|name| std::mem::replace(&mut state.event, Some(name.to_string())));
            Self {
                emitter,
                source: previous_source,
                event: previous_event,
            }
        })
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        let source = self.source.take();
        let event = self.event.take();
        self.emitter.with_state(|state| {
            state.source = source;
            if let Some(event) = event {
                state.event = event;
            }
        });
    }
}

/// Resets `cancel_bubble` for one dispatch and restores the outer value on drop.
struct BubbleGuard<'a> {
    emitter: &'a Emitter,
    previous: bool,
}

impl<'a> BubbleGuard<'a> {
    fn enter(emitter: &'a Emitter) -> Self {
        let previous =
            emitter.with_state(|state| std::mem::replace(&mut state.cancel_bubble, false));
        Self { emitter, previous }
    }

    fn cancelled(&self) -> bool {
        self.emitter.with_state(|state| state.cancel_bubble)
    }
}

impl Drop for BubbleGuard<'_> {
    fn drop(&mut self) {
        let previous = self.previous;
        self.emitter.with_state(|state| state.cancel_bubble = previous);
    }
}

fn prepend(head: &str, args: &[Value]) -> Vec<Value> {
    let mut full = Vec::with_capacity(args.len() + 1);
    full.push(Value::String(head.to_string()));
    full.extend_from_slice(args);
    full
}

fn scope_value(scope: Option<&str>) -> Value {
    scope.map_or(Value::Null, |name| Value::String(name.to_string()))
}

// ============================================================================
// Emitter
// ============================================================================

impl Emitter {
    /// Create an empty emitter with the default configuration.
    pub fn new() -> Self {
        Self::with_config(EmitterConfig::default())
    }

    /// Create an empty emitter with custom config
    pub fn with_config(config: EmitterConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                id: Uuid::new_v4(),
                config,
                state: ReentrantMutex::new(RefCell::new(State::default())),
                flags: RwLock::new(BTreeMap::new()),
            }),
        }
    }

    /// Create an emitter configured from `LUCENT_EVENTS_*` variables.
    pub fn from_env() -> Self {
        Self::with_config(EmitterConfig::from_env())
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn config(&self) -> &EmitterConfig {
        &self.shared.config
    }

    pub fn downgrade(&self) -> WeakEmitter {
        WeakEmitter {
            shared: Arc::downgrade(&self.shared),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let guard = self.shared.state.lock();
        let mut state = guard.borrow_mut();
        f(&mut state)
    }

    fn logging(&self) -> bool {
        self.shared.config.enable_logging
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    /// Emit an event (or each of several) with the given arguments.
    ///
    /// Listeners of the name and of each namespace ancestor run in
    /// registration order, then the event is forwarded to piped emitters
    /// unless a listener cancelled bubbling. Listener errors propagate.
    pub fn emit(&self, events: impl Into<Events>, args: &[Value]) -> Result<&Self> {
        self.trigger(events, args)?;
        Ok(self)
    }

    /// Like [`emit`](Self::emit), but reports whether every dispatch was
    /// allowed to bubble (`false` if any listener cancelled).
    pub fn trigger(&self, events: impl Into<Events>, args: &[Value]) -> Result<bool> {
        let names = events.into().into_names()?;
        let _op = self.shared.state.lock();
        let mut bubbled = true;
        for name in &names {
            bubbled &= self.dispatch(name, args, None, None)?;
        }
        Ok(bubbled)
    }

    fn dispatch(
        &self,
        name: &str,
        args: &[Value],
        origin: Option<&Emitter>,
        subject: Option<&Subject>,
    ) -> Result<bool> {
        let _depth = DepthGuard::enter(self.shared.config.max_depth, name)?;
        let _op = self.shared.state.lock();

        let is_meta = meta::is_meta(name);
        let source = origin.cloned().unwrap_or_else(|| self.clone());
        let context = ContextGuard::enter(self, source.clone(), (!is_meta).then_some(name));
        let raise_meta = !is_meta && self.shared.config.meta_events;

        if self.logging() {
            trace!(
                emitter = %self.shared.config.label,
                id = %self.shared.id,
                source = %source.id(),
                event = name,
                "Dispatching event"
            );
        }

        if raise_meta {
            self.dispatch(meta::EMIT, &prepend(name, args), None, None)?;
        }

        let bubble = BubbleGuard::enter(self);
        let chain = expand(name);
        let mut handled = false;

        for &level in &chain {
            if raise_meta {
                self.dispatch(meta::EVENT, &prepend(level, args), None, None)?;
            }

            let bindings = self.snapshot(level);
            if bindings.is_empty() {
                continue;
            }
            handled = true;

            let event = Event {
                emitter: self,
                name,
                level,
                source: &source,
                args,
                subject,
            };
            for binding in &bindings {
                self.invoke(level, binding, &event)?;
            }
        }

        if !handled && event::root(name) == "error" {
            if self.logging() {
                warn!(
                    emitter = %self.shared.config.label,
                    event = name,
                    "Unhandled error event"
                );
            }
            return Err(EmitterError::unhandled(args));
        }

        drop(context);

        let bubbled = !bubble.cancelled();
        if bubbled && !is_meta {
            let receivers = self.with_state(|state| state.outbound.receivers_for(&chain));
            for receiver in receivers {
                receiver.dispatch(name, args, Some(self), None)?;
            }
        }

        drop(bubble);
        Ok(bubbled)
    }

    /// Listeners bound to exactly `level`, as they are right now.
    fn snapshot(&self, level: &str) -> Vec<Arc<Binding>> {
        self.with_state(|state| state.listeners.get(level).cloned().unwrap_or_default())
    }

    /// Run one binding. A one-shot binding leaves the registry before its
    /// listener runs; `emitter.unbind` for it is raised afterwards, and the
    /// listener's own error wins over an error from that meta-event.
    fn invoke(&self, level: &str, binding: &Arc<Binding>, event: &Event<'_>) -> Result<()> {
        if !binding.claim() {
            return Ok(());
        }
        let removed = binding.is_once() && self.remove_binding(level, binding);

        let flow = binding.listener.call(event);
        let announced = if removed {
            self.announce_unbind(level, binding)
        } else {
            Ok(())
        };

        if flow? == Flow::Stop {
            self.cancel_bubble();
        }
        announced
    }

    /// Raise a meta-event about `concerning` on this emitter.
    fn raise(
        &self,
        name: &str,
        concerning: Option<&str>,
        args: &[Value],
        subject: Option<&Subject>,
    ) -> Result<()> {
        if !self.shared.config.meta_events {
            return Ok(());
        }
        let _op = self.shared.state.lock();
        let _context = ContextGuard::enter(self, self.clone(), concerning);
        self.dispatch(name, args, None, subject)?;
        Ok(())
    }

    /// Stop the running dispatch from forwarding to piped emitters.
    ///
    /// Cancellation sticks for the rest of that dispatch; it cannot be
    /// rescinded by a later listener.
    pub fn cancel_bubble(&self) {
        self.with_state(|state| state.cancel_bubble = true);
    }

    pub fn is_bubble_cancelled(&self) -> bool {
        self.with_state(|state| state.cancel_bubble)
    }

    /// Event currently being processed, if any.
    pub fn current_event(&self) -> Option<String> {
        self.with_state(|state| state.event.clone())
    }

    /// Emitter that raised the event currently being processed, if any.
    pub fn current_source(&self) -> Option<Emitter> {
        self.with_state(|state| state.source.clone())
    }

    // ------------------------------------------------------------------------
    // Listener lifecycle
    // ------------------------------------------------------------------------

    /// Bind listeners to events.
    ///
    /// If an event is flagged, each new listener is invoked with the latched
    /// arguments before `bind` returns.
    pub fn bind(&self, events: impl Into<Events>, listeners: impl Into<Listeners>) -> Result<&Self> {
        self.register(events.into(), listeners.into(), false)?;
        Ok(self)
    }

    /// Alias of [`bind`](Self::bind).
    pub fn on(&self, events: impl Into<Events>, listeners: impl Into<Listeners>) -> Result<&Self> {
        self.bind(events, listeners)
    }

    /// Bind listeners that run at most once per binding, whichever path
    /// (emit, flag replay, pipe) reaches them first.
    pub fn weak_bind(
        &self,
        events: impl Into<Events>,
        listeners: impl Into<Listeners>,
    ) -> Result<&Self> {
        self.register(events.into(), listeners.into(), true)?;
        Ok(self)
    }

    /// Alias of [`weak_bind`](Self::weak_bind).
    pub fn once(&self, events: impl Into<Events>, listeners: impl Into<Listeners>) -> Result<&Self> {
        self.weak_bind(events, listeners)
    }

    /// Bind listeners and return a handle that can unbind exactly these bindings.
    pub fn subscribe(
        &self,
        events: impl Into<Events>,
        listeners: impl Into<Listeners>,
    ) -> Result<Subscription> {
        let bindings = self.register(events.into(), listeners.into(), false)?;
        Ok(Subscription::new(self, bindings))
    }

    fn register(
        &self,
        events: Events,
        listeners: Listeners,
        once: bool,
    ) -> Result<Vec<(String, Arc<Binding>)>> {
        let names = events.into_names()?;
        let listeners = listeners.into_vec();
        if listeners.is_empty() {
            return Err(EmitterError::invalid("listener list must not be empty"));
        }

        let _op = self.shared.state.lock();
        let mut registered = Vec::with_capacity(names.len() * listeners.len());

        for name in names {
            if !meta::is_meta(&name) {
                let subject = Subject::Listeners(listeners.clone());
                self.raise(
                    meta::BIND,
                    Some(name.as_str()),
                    &[Value::String(name.clone())],
                    Some(&subject),
                )?;
            }

            let bindings: Vec<Arc<Binding>> = listeners
                .iter()
                .map(|listener| Binding::new(listener.clone(), once))
                .collect();
            self.with_state(|state| {
                state
                    .listeners
                    .entry(name.clone())
                    .or_default()
                    .extend(bindings.iter().cloned());
            });

            if self.logging() {
                debug!(
                    emitter = %self.shared.config.label,
                    event = %name,
                    count = bindings.len(),
                    once,
                    "Bound listeners"
                );
            }

            self.replay_latches(&name, &bindings)?;
            registered.extend(bindings.into_iter().map(|binding| (name.clone(), binding)));
        }

        Ok(registered)
    }

    /// Remove the first binding of each listener from each event.
    ///
    /// Listeners that are not bound are ignored.
    pub fn unbind(&self, events: impl Into<Events>, listeners: impl Into<Listeners>) -> Result<&Self> {
        let names = events.into().into_names()?;
        let listeners = listeners.into().into_vec();
        if listeners.is_empty() {
            return Err(EmitterError::invalid("listener list must not be empty"));
        }

        let _op = self.shared.state.lock();
        for name in &names {
            for listener in &listeners {
                let found = self.with_state(|state| {
                    state.listeners.get(name).and_then(|bindings| {
                        bindings
                            .iter()
                            .find(|binding| binding.listener == *listener)
                            .cloned()
                    })
                });
                if let Some(binding) = found {
                    self.detach(name, &binding)?;
                }
            }
        }
        Ok(self)
    }

    /// Alias of [`unbind`](Self::unbind).
    pub fn off(&self, events: impl Into<Events>, listeners: impl Into<Listeners>) -> Result<&Self> {
        self.unbind(events, listeners)
    }

    /// Remove every listener bound to the given events.
    pub fn unbind_all(&self, events: impl Into<Events>) -> Result<&Self> {
        let names = events.into().into_names()?;
        let _op = self.shared.state.lock();
        for name in &names {
            for binding in self.snapshot(name) {
                self.detach(name, &binding)?;
            }
        }
        Ok(self)
    }

    /// Remove every listener from every event.
    pub fn unbind_all_events(&self) -> Result<&Self> {
        let _op = self.shared.state.lock();
        let names: Vec<String> = self.with_state(|state| state.listeners.keys().cloned().collect());
        for name in &names {
            for binding in self.snapshot(name) {
                self.detach(name, &binding)?;
            }
        }
        Ok(self)
    }

    /// Remove one binding and announce it. The event's entry goes away with
    /// its last listener.
    pub(crate) fn detach(&self, name: &str, binding: &Arc<Binding>) -> Result<bool> {
        let _op = self.shared.state.lock();
        let removed = self.remove_binding(name, binding);
        if removed {
            self.announce_unbind(name, binding)?;
        }
        Ok(removed)
    }

    fn remove_binding(&self, name: &str, binding: &Arc<Binding>) -> bool {
        let removed = self.with_state(|state| {
            let Some(bindings) = state.listeners.get_mut(name) else {
                return false;
            };
            let Some(index) = bindings.iter().position(|bound| bound.id == binding.id) else {
                return false;
            };
            bindings.remove(index);
            if bindings.is_empty() {
                state.listeners.remove(name);
            }
            true
        });

        if removed && self.logging() {
            debug!(
                emitter = %self.shared.config.label,
                event = name,
                listener = ?binding.listener,
                "Unbound listener"
            );
        }
        removed
    }

    fn announce_unbind(&self, name: &str, binding: &Arc<Binding>) -> Result<()> {
        if meta::is_meta(name) {
            return Ok(());
        }
        let subject = Subject::Listeners(vec![binding.listener.clone()]);
        self.raise(
            meta::UNBIND,
            Some(name),
            &[Value::String(name.to_string())],
            Some(&subject),
        )
    }

    // ------------------------------------------------------------------------
    // Flags
    // ------------------------------------------------------------------------

    /// Latch events with arguments and notify current listeners.
    ///
    /// Listeners bound later are invoked with the latched arguments during
    /// their `bind` call. Flagging again overwrites the latch.
    pub fn flag(&self, events: impl Into<Events>, args: &[Value]) -> Result<&Self> {
        let names = events.into().into_names()?;
        let _op = self.shared.state.lock();
        for name in &names {
            let latch = Latch {
                args: args.to_vec(),
                raised_at: Utc::now(),
            };
            self.shared.flags.write().insert(name.clone(), latch);

            if self.logging() {
                debug!(emitter = %self.shared.config.label, event = %name, "Flagged event");
            }

            if !meta::is_meta(name) {
                self.raise(meta::FLAG, Some(name.as_str()), &prepend(name, args), None)?;
            }
            self.dispatch(name, args, None, None)?;
        }
        Ok(self)
    }

    /// Clear latches. Unflagged events are ignored.
    pub fn unflag(&self, events: impl Into<Events>) -> Result<&Self> {
        let names = events.into().into_names()?;
        let _op = self.shared.state.lock();
        for name in &names {
            let removed = self.shared.flags.write().remove(name).is_some();
            if !removed {
                continue;
            }
            if self.logging() {
                debug!(emitter = %self.shared.config.label, event = %name, "Unflagged event");
            }
            if !meta::is_meta(name) {
                self.raise(
                    meta::UNFLAG,
                    Some(name.as_str()),
                    &[Value::String(name.clone())],
                    None,
                )?;
            }
        }
        Ok(self)
    }

    /// Clear every latch.
    pub fn unflag_all(&self) -> Result<&Self> {
        let names = self.flagged_events();
        if names.is_empty() {
            return Ok(self);
        }
        self.unflag(names)
    }

    pub fn latch(&self, event: &str) -> Option<Latch> {
        self.shared.flags.read().get(event).cloned()
    }

    pub fn is_flagged(&self, event: &str) -> bool {
        self.shared.flags.read().contains_key(event)
    }

    pub fn flagged_events(&self) -> Vec<String> {
        self.shared.flags.read().keys().cloned().collect()
    }

    /// Latches whose name a pipe with `scope` carries.
    fn latches_in(&self, scope: Option<&str>) -> Vec<(String, Latch)> {
        self.shared
            .flags
            .read()
            .iter()
            .filter(|(name, _)| scope.is_none_or(|scope| scope == name.as_str()))
            .map(|(name, latch)| (name.clone(), latch.clone()))
            .collect()
    }

    /// Replay this emitter's latch, and latches of emitters piping into it,
    /// to freshly registered bindings. Sources are read through their latch
    /// lock only, never their state lock.
    fn replay_latches(&self, name: &str, bindings: &[Arc<Binding>]) -> Result<()> {
        if let Some(latch) = self.latch(name) {
            self.replay(name, &latch.args, self, bindings)?;
        }

        let sources = self.with_state(|state| state.inbound.sources_covering(name));
        for source in sources {
            if let Some(latch) = source.latch(name) {
                self.replay(name, &latch.args, &source, bindings)?;
            }
        }
        Ok(())
    }

    fn replay(
        &self,
        name: &str,
        args: &[Value],
        source: &Emitter,
        bindings: &[Arc<Binding>],
    ) -> Result<()> {
        let _context = ContextGuard::enter(self, source.clone(), Some(name));
        let _bubble = BubbleGuard::enter(self);
        let event = Event {
            emitter: self,
            name,
            level: name,
            source,
            args,
            subject: None,
        };
        for binding in bindings {
            self.invoke(name, binding, &event)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Pipes
    // ------------------------------------------------------------------------

    /// Receive every event raised on each target, as if raised here.
    ///
    /// Latches already held by a target are replayed to this emitter's
    /// listeners of the same name, as `bind` does for late listeners.
    pub fn pipe(&self, targets: impl Into<Targets>) -> Result<&Self> {
        let targets = targets.into().into_vec()?;
        for target in &targets {
            self.connect(None, target)?;
        }
        Ok(self)
    }

    /// Receive only the given events (and their sub-events) from each target.
    pub fn pipe_events(&self, events: impl Into<Events>, targets: impl Into<Targets>) -> Result<&Self> {
        let names = events.into().into_names()?;
        let targets = targets.into().into_vec()?;
        for name in &names {
            for target in &targets {
                self.connect(Some(name.as_str()), target)?;
            }
        }
        Ok(self)
    }

    /// Remove an unscoped pipe from each target. Missing pipes are ignored.
    pub fn unpipe(&self, targets: impl Into<Targets>) -> Result<&Self> {
        let targets = targets.into().into_vec()?;
        for target in &targets {
            self.disconnect(None, target)?;
        }
        Ok(self)
    }

    /// Remove scoped pipes from each target. Missing pipes are ignored.
    pub fn unpipe_events(
        &self,
        events: impl Into<Events>,
        targets: impl Into<Targets>,
    ) -> Result<&Self> {
        let names = events.into().into_names()?;
        let targets = targets.into().into_vec()?;
        for name in &names {
            for target in &targets {
                self.disconnect(Some(name.as_str()), target)?;
            }
        }
        Ok(self)
    }

    /// Remove every pipe this emitter receives through.
    pub fn unpipe_all(&self) -> Result<&Self> {
        let links = self.with_state(|state| {
            state.inbound.prune();
            state.inbound.links()
        });
        for link in links {
            if let Some(target) = link.emitter.upgrade() {
                self.disconnect(link.scope.as_deref(), &target)?;
            }
        }
        Ok(self)
    }

    fn connect(&self, scope: Option<&str>, target: &Emitter) -> Result<()> {
        if target == self {
            return Err(EmitterError::invalid("an emitter cannot pipe from itself"));
        }

        let _source = target.shared.state.lock();
        let _op = self.shared.state.lock();

        target.with_state(|state| state.outbound.add(scope, self.clone()));
        self.with_state(|state| state.inbound.add(scope, target));

        if self.logging() {
            debug!(
                emitter = %self.shared.config.label,
                target = %target.id(),
                scope = ?scope,
                "Piped emitter"
            );
        }

        let subject = Subject::Emitter(target.clone());
        self.raise(meta::PIPE, scope, &[scope_value(scope)], Some(&subject))?;

        for (name, latch) in target.latches_in(scope) {
            let bindings = self.snapshot(&name);
            if !bindings.is_empty() {
                self.replay(&name, &latch.args, target, &bindings)?;
            }
        }
        Ok(())
    }

    fn disconnect(&self, scope: Option<&str>, target: &Emitter) -> Result<()> {
        let _source = target.shared.state.lock();
        let _op = self.shared.state.lock();

        let removed = target.with_state(|state| state.outbound.remove(scope, self));
        if !removed {
            return Ok(());
        }
        self.with_state(|state| state.inbound.remove(scope, target));

        if self.logging() {
            debug!(
                emitter = %self.shared.config.label,
                target = %target.id(),
                scope = ?scope,
                "Unpiped emitter"
            );
        }

        let subject = Subject::Emitter(target.clone());
        self.raise(meta::UNPIPE, scope, &[scope_value(scope)], Some(&subject))
    }

    /// Number of pipe registrations forwarding this emitter's events.
    pub fn receiver_count(&self) -> usize {
        self.with_state(|state| state.outbound.len())
    }

    pub fn has_receivers(&self) -> bool {
        self.with_state(|state| !state.outbound.is_empty())
    }

    /// Number of pipes this emitter receives through.
    pub fn source_count(&self) -> usize {
        self.with_state(|state| state.inbound.len())
    }

    // ------------------------------------------------------------------------
    // Introspection and teardown
    // ------------------------------------------------------------------------

    /// Listeners bound to exactly `event`, in dispatch order.
    pub fn listeners(&self, event: &str) -> Vec<Listener> {
        self.snapshot(event)
            .iter()
            .map(|binding| binding.listener.clone())
            .collect()
    }

    /// Every event with at least one listener.
    pub fn listener_map(&self) -> BTreeMap<String, Vec<Listener>> {
        self.with_state(|state| {
            state
                .listeners
                .iter()
                .map(|(name, bindings)| {
                    let listeners = bindings.iter().map(|binding| binding.listener.clone());
                    (name.clone(), listeners.collect())
                })
                .collect()
        })
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.with_state(|state| state.listeners.get(event).map_or(0, Vec::len))
    }

    pub fn has_listeners(&self, event: &str) -> bool {
        self.listener_count(event) > 0
    }

    /// Remove every listener, latch and pipe, in both directions.
    ///
    /// Each step locks on its own; pipes into this emitter are removed with
    /// their source locked first.
    pub fn clear(&self) -> Result<&Self> {
        self.raise(meta::CLEAR, None, &[], None)?;

        self.unbind_all_events()?;
        self.unflag_all()?;
        self.unpipe_all()?;

        let receivers = self.with_state(|state| state.outbound.registrations());
        for (scope, receiver) in receivers {
            receiver.disconnect(scope.as_deref(), self)?;
        }

        if self.logging() {
            debug!(emitter = %self.shared.config.label, id = %self.shared.id, "Cleared emitter");
        }
        Ok(self)
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Emitter {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for Emitter {}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("label", &self.shared.config.label)
            .field("id", &self.shared.id)
            .finish()
    }
}

impl AsRef<Emitter> for Emitter {
    fn as_ref(&self) -> &Emitter {
        self
    }
}
