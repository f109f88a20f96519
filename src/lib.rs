// Lucent - synchronous event emitters for Rust
//
// This library provides in-process publish/subscribe with namespaced events,
// latched flags and emitter-to-emitter piping.

// Re-export the emitter crate
pub use lucent_events::*;

// Payload values are JSON
pub use serde_json::{Value, json};

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Emitter,
        EmitterBuilder,
        EmitterConfig,
        EmitterError,
        Event,
        Evented,
        Flow,
        Listener,
        Result,
        Subscription,
        Value,
        json,
    };
}
