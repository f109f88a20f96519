//! Event names, namespace expansion and the per-dispatch event context

use crate::emitter::Emitter;
use crate::error::{EmitterError, Result};
use crate::listener::Listener;
use serde_json::Value;

/// Reserved names of the meta-events an emitter raises about itself.
pub mod meta {
    /// Prefix shared by every meta-event. Names with this prefix never raise
    /// further meta-events and are never forwarded through pipes.
    pub const PREFIX: &str = "emitter.";

    /// Raised once per non-meta emit. Args: `[name, ...args]`.
    pub const EMIT: &str = "emitter.emit";

    /// Raised once per namespace level of a non-meta emit. Args: `[level, ...args]`.
    pub const EVENT: &str = "emitter.event";

    /// Raised before listeners are registered. Args: `[name]`, subject: the listeners.
    pub const BIND: &str = "emitter.bind";

    /// Raised per removed listener. Args: `[name]`, subject: the listener.
    pub const UNBIND: &str = "emitter.unbind";

    /// Raised when a latch is set. Args: `[name, ...args]`.
    pub const FLAG: &str = "emitter.flag";

    /// Raised when a latch is cleared. Args: `[name]`.
    pub const UNFLAG: &str = "emitter.unflag";

    /// Raised per established pipe. Args: `[name | null]`, subject: the target.
    pub const PIPE: &str = "emitter.pipe";

    /// Raised per removed pipe. Args: `[name | null]`, subject: the target.
    pub const UNPIPE: &str = "emitter.unpipe";

    /// Raised before `Emitter::clear` tears everything down.
    pub const CLEAR: &str = "emitter.clear";

    /// Whether `name` is a meta-event.
    pub fn is_meta(name: &str) -> bool {
        name.starts_with(PREFIX)
    }
}

/// Expand a dot-namespaced name into itself and each ancestor, most specific first.
///
/// ```rust
/// use lucent_events::expand;
///
/// assert_eq!(expand("a.b.c"), vec!["a.b.c", "a.b", "a"]);
/// assert_eq!(expand("ready"), vec!["ready"]);
/// ```
pub fn expand(name: &str) -> Vec<&str> {
    let mut chain = vec![name];
    let mut rest = name;
    while let Some(dot) = rest.rfind('.') {
        rest = &rest[..dot];
        if rest.is_empty() {
            break;
        }
        chain.push(rest);
    }
    chain
}

/// Root segment of a namespaced name (`"error"` for `"error.io.read"`).
pub(crate) fn root(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}

pub(crate) fn validate(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(EmitterError::invalid("event name must not be empty"));
    }
    Ok(())
}

/// One event name or several, resolved once at the API boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Events {
    One(String),
    Many(Vec<String>),
}

impl Events {
    /// Flatten into validated names, in the given order.
    pub(crate) fn into_names(self) -> Result<Vec<String>> {
        let names = match self {
            Events::One(name) => vec![name],
            Events::Many(names) => names,
        };
        if names.is_empty() {
            return Err(EmitterError::invalid("event list must not be empty"));
        }
        for name in &names {
            validate(name)?;
        }
        Ok(names)
    }
}

impl From<&str> for Events {
    fn from(name: &str) -> Self {
        Events::One(name.to_string())
    }
}

impl From<String> for Events {
    fn from(name: String) -> Self {
        Events::One(name)
    }
}

impl From<&String> for Events {
    fn from(name: &String) -> Self {
        Events::One(name.clone())
    }
}

impl From<Vec<String>> for Events {
    fn from(names: Vec<String>) -> Self {
        Events::Many(names)
    }
}

impl From<Vec<&str>> for Events {
    fn from(names: Vec<&str>) -> Self {
        Events::Many(names.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Events {
    fn from(names: &[&str]) -> Self {
        Events::Many(names.iter().map(|name| name.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Events {
    fn from(names: [&str; N]) -> Self {
        Events::Many(names.iter().map(|name| name.to_string()).collect())
    }
}

/// What a meta-event is about, beyond its plain arguments.
#[derive(Debug, Clone)]
pub enum Subject {
    /// Listeners being bound or unbound
    Listeners(Vec<Listener>),
    /// The other end of a pipe being established or removed
    Emitter(Emitter),
}

/// Context handed to a listener for one invocation.
#[derive(Debug)]
pub struct Event<'a> {
    pub(crate) emitter: &'a Emitter,
    pub(crate) name: &'a str,
    pub(crate) level: &'a str,
    pub(crate) source: &'a Emitter,
    pub(crate) args: &'a [Value],
    pub(crate) subject: Option<&'a Subject>,
}

impl<'a> Event<'a> {
    /// Emitter the listener is bound on.
    pub fn emitter(&self) -> &'a Emitter {
        self.emitter
    }

    /// Name as it was emitted, e.g. `"a.b.c"` even while `"a"` listeners run.
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Namespace level whose listeners are currently running.
    pub fn level(&self) -> &'a str {
        self.level
    }

    /// Emitter that originally raised the event. Differs from
    /// [`emitter`](Self::emitter) when the event arrived through a pipe.
    pub fn source(&self) -> &'a Emitter {
        self.source
    }

    pub fn args(&self) -> &'a [Value] {
        self.args
    }

    pub fn arg(&self, index: usize) -> Option<&'a Value> {
        self.args.get(index)
    }

    /// Listener or emitter a meta-event refers to.
    pub fn subject(&self) -> Option<&'a Subject> {
        self.subject
    }

    /// Listeners carried by `emitter.bind` / `emitter.unbind`.
    pub fn subject_listeners(&self) -> &'a [Listener] {
        match self.subject {
            Some(Subject::Listeners(listeners)) => listeners,
            _ => &[],
        }
    }

    /// Emitter carried by `emitter.pipe` / `emitter.unpipe`.
    pub fn subject_emitter(&self) -> Option<&'a Emitter> {
        match self.subject {
            Some(Subject::Emitter(emitter)) => Some(emitter),
            _ => None,
        }
    }

    /// The emitter's current event. For meta-events this is the event the
    /// operation concerns, e.g. the name being bound during `emitter.bind`.
    pub fn current_event(&self) -> Option<String> {
        self.emitter.current_event()
    }

    /// Whether the event arrived through a pipe.
    pub fn is_forwarded(&self) -> bool {
        self.source != self.emitter
    }

    pub fn is_meta(&self) -> bool {
        meta::is_meta(self.name)
    }

    /// Stop this dispatch from forwarding to piped emitters.
    pub fn cancel_bubble(&self) {
        self.emitter.cancel_bubble();
    }
}
