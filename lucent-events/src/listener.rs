//! Listener handles and registry entries

use crate::error::Result;
use crate::event::Event;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// What a listener asks of the dispatch that invoked it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    /// Keep going, forward to piped emitters
    #[default]
    Continue,
    /// Suppress forwarding to piped emitters for this dispatch
    Stop,
}

impl From<()> for Flow {
    fn from(_: ()) -> Self {
        Flow::Continue
    }
}

/// `false` stops bubbling, anything else continues.
impl From<bool> for Flow {
    fn from(keep_bubbling: bool) -> Self {
        if keep_bubbling {
            Flow::Continue
        } else {
            Flow::Stop
        }
    }
}

type Callback = dyn Fn(&Event<'_>) -> Result<Flow> + Send + Sync;

fn erase<F>(callback: F) -> Arc<Callback>
where
    F: Fn(&Event<'_>) -> Result<Flow> + Send + Sync + 'static,
{
    Arc::new(callback)
}

/// A callback registered against one or more event names.
///
/// Cloning a `Listener` clones the handle, not the callback: clones compare
/// equal and `unbind` with any of them removes the binding. Two separate
/// `Listener::new` calls never compare equal, even for the same closure.
#[derive(Clone)]
pub struct Listener {
    callback: Arc<Callback>,
}

impl Listener {
    /// Wrap a callback.
    ///
    /// The callback may return `Ok(())`, `Ok(bool)` or `Ok(Flow)`.
    ///
    /// ```rust
    /// use lucent_events::{Flow, Listener};
    ///
    /// let quiet = Listener::new(|_event| Ok(()));
    /// let stopper = Listener::new(|_event| Ok(Flow::Stop));
    /// assert_ne!(quiet, stopper);
    /// assert_eq!(quiet, quiet.clone());
    /// ```
    pub fn new<F, R>(callback: F) -> Self
    where
        F: Fn(&Event<'_>) -> Result<R> + Send + Sync + 'static,
        R: Into<Flow>,
    {
        Self {
            callback: erase(move |event| callback(event).map(Into::into)),
        }
    }

    pub(crate) fn call(&self, event: &Event<'_>) -> Result<Flow> {
        (self.callback)(event)
    }

    /// Stable identity of this handle, for logging.
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.callback) as *const () as usize
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Listener {}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener({:#x})", self.id())
    }
}

/// One listener or several, resolved once at the API boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listeners {
    One(Listener),
    Many(Vec<Listener>),
}

impl Listeners {
    pub(crate) fn into_vec(self) -> Vec<Listener> {
        match self {
            Listeners::One(listener) => vec![listener],
            Listeners::Many(listeners) => listeners,
        }
    }
}

impl From<Listener> for Listeners {
    fn from(listener: Listener) -> Self {
        Listeners::One(listener)
    }
}

impl From<&Listener> for Listeners {
    fn from(listener: &Listener) -> Self {
        Listeners::One(listener.clone())
    }
}

impl From<Vec<Listener>> for Listeners {
    fn from(listeners: Vec<Listener>) -> Self {
        Listeners::Many(listeners)
    }
}

impl From<&[Listener]> for Listeners {
    fn from(listeners: &[Listener]) -> Self {
        Listeners::Many(listeners.to_vec())
    }
}

impl<const N: usize> From<[Listener; N]> for Listeners {
    fn from(listeners: [Listener; N]) -> Self {
        Listeners::Many(listeners.into())
    }
}

static NEXT_BINDING: AtomicU64 = AtomicU64::new(1);

/// A registry entry: one listener bound once to one event name.
pub(crate) struct Binding {
    pub(crate) id: u64,
    pub(crate) listener: Listener,
    once: bool,
    spent: AtomicBool,
}

impl Binding {
    pub(crate) fn new(listener: Listener, once: bool) -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_BINDING.fetch_add(1, Ordering::Relaxed),
            listener,
            once,
            spent: AtomicBool::new(false),
        })
    }

    pub(crate) fn is_once(&self) -> bool {
        self.once
    }

    /// Claim the single run of a one-shot binding. Always true for plain bindings.
    pub(crate) fn claim(&self) -> bool {
        !self.once || !self.spent.swap(true, Ordering::AcqRel)
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("id", &self.id)
            .field("listener", &self.listener)
            .field("once", &self.once)
            .finish()
    }
}
