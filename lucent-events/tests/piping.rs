//! Forwarding between emitters.

use lucent_events::*;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

type Log = Arc<Mutex<Vec<String>>>;

fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn recorder(log: &Log, tag: &str) -> Listener {
    let log = log.clone();
    let tag = tag.to_string();
    Listener::new(move |_| {
        log.lock().push(tag.clone());
        Ok(())
    })
}

fn counter() -> (Arc<AtomicU32>, Listener) {
    let count = Arc::new(AtomicU32::new(0));
    let seen = count.clone();
    let listener = Listener::new(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    (count, listener)
}

#[test]
fn test_forwarded_event_carries_source() {
    let a = Emitter::new();
    let b = Emitter::new();
    let expected = b.clone();
    let (count, _) = counter();
    let seen = count.clone();

    a.pipe(&b).unwrap();
    a.bind(
        "x",
        Listener::new(move |event| {
            assert_eq!(event.source(), &expected);
            assert!(event.is_forwarded());
            assert_eq!(event.emitter().current_source().as_ref(), Some(&expected));
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }),
    )
    .unwrap();

    b.emit("x", &[json!(1)]).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(a.current_source(), None);
}

#[test]
fn test_scoped_pipe_only_carries_its_event() {
    let a = Emitter::new();
    let b = Emitter::new();
    let (foo_count, foo) = counter();
    let (bar_count, bar) = counter();

    a.pipe_events("foo", &b).unwrap();
    a.bind("foo", foo).unwrap();
    b.emit("foo", &[]).unwrap();
    assert_eq!(foo_count.load(Ordering::SeqCst), 1);

    a.pipe_events("bar", &b).unwrap();
    a.bind("bar", bar).unwrap();
    b.emit("foo", &[]).unwrap();
    assert_eq!(bar_count.load(Ordering::SeqCst), 0);
    assert_eq!(foo_count.load(Ordering::SeqCst), 2);
}

#[test]
fn test_scoped_pipe_matches_namespace_ancestors() {
    let a = Emitter::new();
    let b = Emitter::new();
    let calls = log();

    a.pipe_events("user", &b).unwrap();
    a.bind("user.created", recorder(&calls, "created")).unwrap();
    a.bind("user", recorder(&calls, "user")).unwrap();
    b.emit("user.created", &[]).unwrap();

    assert_eq!(*calls.lock(), vec!["created", "user"]);
}

#[test]
fn test_pipe_event_lists_and_target_lists() {
    let hub = Emitter::new();
    let left = Emitter::new();
    let right = Emitter::new();
    let (count, listener) = counter();

    hub.pipe_events(["open", "close"], [&left, &right]).unwrap();
    hub.bind(["open", "close"], listener).unwrap();

    left.emit("open", &[]).unwrap();
    right.emit("close", &[]).unwrap();
    right.emit("other", &[]).unwrap();

    assert_eq!(count.load(Ordering::SeqCst), 2);
    assert_eq!(left.receiver_count(), 2);
    assert_eq!(hub.source_count(), 4);
}

#[test]
fn test_fan_out_order() {
    let origin = Emitter::new();
    let calls = log();
    let scoped_first = Emitter::new();
    let unscoped = Emitter::new();
    let scoped_root = Emitter::new();

    scoped_first.bind("a.b", recorder(&calls, "scoped a.b")).unwrap();
    unscoped.bind("a.b", recorder(&calls, "unscoped")).unwrap();
    scoped_root.bind("a.b", recorder(&calls, "scoped a")).unwrap();

    scoped_root.pipe_events("a", &origin).unwrap();
    scoped_first.pipe_events("a.b", &origin).unwrap();
    unscoped.pipe(&origin).unwrap();

    origin.emit("a.b", &[]).unwrap();
    assert_eq!(*calls.lock(), vec!["unscoped", "scoped a.b", "scoped a"]);
}

#[test]
fn test_cancel_by_return_suppresses_forwarding() {
    let a = Emitter::new();
    let b = Emitter::new();
    let (count, listener) = counter();

    b.pipe(&a).unwrap();
    b.bind("e", listener).unwrap();
    a.bind("e", Listener::new(|_| Ok(Flow::Stop))).unwrap();
    a.bind("e", Listener::new(|_| Ok(Flow::Continue))).unwrap();

    a.emit("e", &[]).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert!(!a.is_bubble_cancelled());
}

#[test]
fn test_cancel_by_flag_suppresses_forwarding() {
    let a = Emitter::new();
    let b = Emitter::new();
    let (count, listener) = counter();

    b.pipe(&a).unwrap();
    b.bind("e", listener).unwrap();
    a.bind(
        "e",
        Listener::new(|event| {
            event.cancel_bubble();
            Ok(())
        }),
    )
    .unwrap();

    a.emit("e", &[]).unwrap();
    a.emit("other", &[]).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_cancel_is_per_dispatch() {
    let a = Emitter::new();
    let b = Emitter::new();
    let calls = log();

    b.pipe(&a).unwrap();
    b.bind("outer", recorder(&calls, "b outer")).unwrap();
    b.bind("inner", recorder(&calls, "b inner")).unwrap();
    a.bind(
        "outer",
        Listener::new(|event| {
            event.emitter().emit("inner", &[])?;
            Ok(())
        }),
    )
    .unwrap();
    a.bind("inner", Listener::new(|_| Ok(false))).unwrap();

    a.emit("outer", &[]).unwrap();
    assert_eq!(*calls.lock(), vec!["b outer"]);
}

#[test]
fn test_unpipe_scopes_are_independent() {
    let a = Emitter::new();
    let b = Emitter::new();
    let (count, listener) = counter();

    a.pipe(&b).unwrap();
    a.pipe_events("x", &b).unwrap();
    a.bind("x", listener).unwrap();

    b.emit("x", &[]).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 2);

    a.unpipe_events("x", &b).unwrap();
    b.emit("x", &[]).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 3);

    a.unpipe(&b).unwrap();
    b.emit("x", &[]).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 3);
    assert_eq!(b.receiver_count(), 0);
    assert_eq!(a.source_count(), 0);
}

#[test]
fn test_unpipe_missing_is_noop() {
    let a = Emitter::new();
    let b = Emitter::new();
    let c = Emitter::new();
    a.pipe(&b).unwrap();

    a.unpipe(&c).unwrap();
    a.unpipe_events("x", &b).unwrap();

    assert_eq!(b.receiver_count(), 1);
    assert_eq!(a.source_count(), 1);
}

#[test]
fn test_unpipe_all() {
    let a = Emitter::new();
    let b = Emitter::new();
    let c = Emitter::new();

    a.pipe(&b).unwrap();
    a.pipe_events("x", &c).unwrap();
    a.unpipe_all().unwrap();

    assert_eq!(a.source_count(), 0);
    assert!(!b.has_receivers());
    assert!(!c.has_receivers());
}

#[test]
fn test_flag_on_source_replays_through_pipe() {
    let a = Emitter::new();
    let b = Emitter::new();
    let expected = b.clone();
    let (count, _) = counter();
    let seen = count.clone();

    b.flag("foo", &[json!("latched")]).unwrap();
    a.pipe_events("foo", &b).unwrap();
    a.bind(
        "foo",
        Listener::new(move |event| {
            assert_eq!(event.source(), &expected);
            assert_eq!(event.args(), &[json!("latched")]);
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }),
    )
    .unwrap();

    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_pipe_replays_existing_flags_to_existing_listeners() {
    let a = Emitter::new();
    let b = Emitter::new();
    let (count, listener) = counter();

    b.flag("foo", &[]).unwrap();
    a.bind(["foo", "bar"], listener).unwrap();
    a.pipe(&b).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);

    b.flag("bar", &[]).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[test]
fn test_flag_reaches_piped_listeners() {
    let a = Emitter::new();
    let b = Emitter::new();
    let (count, listener) = counter();

    a.pipe(&b).unwrap();
    a.bind("ready", listener).unwrap();
    b.flag("ready", &[]).unwrap();

    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_chain_of_pipes() {
    let top = Emitter::new();
    let middle = Emitter::new();
    let bottom = Emitter::new();
    let expected = middle.clone();
    let (count, _) = counter();
    let seen = count.clone();

    middle.pipe(&bottom).unwrap();
    top.pipe(&middle).unwrap();
    top.bind(
        "deep",
        Listener::new(move |event| {
            assert_eq!(event.source(), &expected);
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }),
    )
    .unwrap();

    bottom.emit("deep", &[]).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_pipe_cycle_fails_with_depth_error() {
    let a = EmitterBuilder::new().max_depth(32).enable_logging(false).build();
    let b = EmitterBuilder::new().max_depth(32).enable_logging(false).build();

    a.pipe(&b).unwrap();
    b.pipe(&a).unwrap();

    let err = a.emit("spin", &[]).unwrap_err();
    assert!(matches!(err, EmitterError::DepthExceeded { .. }));
    assert_eq!(a.current_event(), None);
    assert_eq!(b.current_event(), None);
}

#[test]
fn test_dropped_receiver_kept_alive_by_source() {
    let source = Emitter::new();
    let (count, listener) = counter();
    {
        let receiver = Emitter::new();
        receiver.pipe(&source).unwrap();
        receiver.bind("e", listener).unwrap();
    }

    source.emit("e", &[]).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_receiver_outlives_dropped_source() {
    let receiver = Emitter::new();
    {
        let source = Emitter::new();
        source.flag("ready", &[]).unwrap();
        receiver.pipe(&source).unwrap();
    }

    let (count, listener) = counter();
    receiver.bind("ready", listener).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert_eq!(receiver.source_count(), 0);
}

#[test]
fn test_once_through_pipe() {
    let a = Emitter::new();
    let b = Emitter::new();
    let (count, listener) = counter();

    a.pipe(&b).unwrap();
    a.once("x", &listener).unwrap();

    b.emit("x", &[]).unwrap();
    b.emit("x", &[]).unwrap();

    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(a.listeners("x").is_empty());
}

#[test]
fn test_pipe_replay_matches_bind_replay() {
    let a = Emitter::new();
    let b = Emitter::new();
    let downstream = Emitter::new();
    let calls = log();

    a.bind("a", recorder(&calls, "ancestor")).unwrap();
    a.bind("a.b", recorder(&calls, "exact")).unwrap();
    a.bind(meta::EMIT, recorder(&calls, "meta")).unwrap();
    downstream.pipe(&a).unwrap();
    downstream.bind("a.b", recorder(&calls, "downstream")).unwrap();

    b.flag("a.b", &[]).unwrap();
    a.pipe(&b).unwrap();

    assert_eq!(*calls.lock(), vec!["exact"]);
}

#[test]
fn test_pipe_from_emitter_with_latched_error() {
    let a = Emitter::new();
    let b = Emitter::new();
    let expected = b.clone();
    let (count, _) = counter();
    let seen = count.clone();

    assert!(b.flag("error", &[json!("boom")]).is_err());
    assert!(b.is_flagged("error"));

    a.pipe(&b).unwrap();
    assert_eq!(a.source_count(), 1);

    a.bind(
        "error",
        Listener::new(move |event| {
            assert_eq!(event.source(), &expected);
            assert_eq!(event.arg(0), Some(&json!("boom")));
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }),
    )
    .unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}
