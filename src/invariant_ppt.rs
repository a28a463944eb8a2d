//! Construction-time invariants for graphs, plans, patches and notes.
//!
//! Each check records its id so integration tests can confirm that a code
//! path really exercised it. Only graph building, plan compilation and note
//! triggering assert; `tick` and `process_block` never do.

#[cfg(feature = "ppt")]
use lazy_static::lazy_static;
#[cfg(feature = "ppt")]
use std::collections::HashSet;
#[cfg(feature = "ppt")]
use std::sync::Mutex;

/// Inserted node resolves all inputs and keeps the graph acyclic.
pub const GRAPH_LEGALITY: u32 = 1;
/// A self reference or cycle-closing insert was refused.
pub const GRAPH_REJECTS_INVALID: u32 = 2;
/// Plan walked every template node exactly once.
pub const PLAN_SOUNDNESS: u32 = 3;
/// A note was cloned from the template.
pub const NOTE_TRIGGERED: u32 = 4;
/// Active notes stay within a configured `max_notes`.
pub const VOICE_LIMIT_BOUND: u32 = 5;
/// A patch's named output resolved to a node.
pub const PATCH_NAMES_RESOLVED: u32 = 6;

fn invariant_name(id: u32) -> &'static str {
    match id {
        GRAPH_LEGALITY => "graph legality",
        GRAPH_REJECTS_INVALID => "graph rejects invalid insert",
        PLAN_SOUNDNESS => "plan soundness",
        NOTE_TRIGGERED => "note triggered",
        VOICE_LIMIT_BOUND => "voice limit",
        PATCH_NAMES_RESOLVED => "patch names resolved",
        _ => "unnamed",
    }
}

#[cfg(feature = "ppt")]
lazy_static! {
    static ref INVARIANT_LOG: Mutex<HashSet<u32>> = Mutex::new(HashSet::new());
}

fn failure_message(id: u32, message: &str, context: Option<&str>) -> String {
    match context {
        Some(ctx) => format!(
            "invariant {} ({}) failed in {}: {}",
            id,
            invariant_name(id),
            ctx,
            message
        ),
        None => format!("invariant {} ({}) failed: {}", id, invariant_name(id), message),
    }
}

#[cfg(feature = "ppt")]
/// Record invariant `id`; logs and panics if `condition` is false.
pub(crate) fn assert_invariant(id: u32, condition: bool, message: &str, context: Option<&str>) {
    if !condition {
        let full_message = failure_message(id, message, context);
        log::error!("{}", full_message);
        panic!("{}", full_message);
    }
    // A poisoned log only means another test panicked mid-insert.
    let mut log = INVARIANT_LOG.lock().unwrap_or_else(|e| e.into_inner());
    log.insert(id);
}

#[cfg(not(feature = "ppt"))]
/// Panics if `condition` is false; nothing is recorded.
pub(crate) fn assert_invariant(id: u32, condition: bool, message: &str, context: Option<&str>) {
    if !condition {
        panic!("{}", failure_message(id, message, context));
    }
}

#[cfg(feature = "ppt")]
/// Panic unless every id in `required_invariants` has been recorded.
pub fn contract_test(test_name: &str, required_invariants: &[u32]) {
    let log = INVARIANT_LOG.lock().unwrap_or_else(|e| e.into_inner());
    let missing: Vec<u32> = required_invariants
        .iter()
        .copied()
        .filter(|inv| !log.contains(inv))
        .collect();
    drop(log); // Drop the lock before panicking
    if !missing.is_empty() {
        panic!(
            "contract '{}' failed, never asserted: {:?}",
            test_name,
            missing.iter().map(|&id| invariant_name(id)).collect::<Vec<_>>()
        );
    }
}

#[cfg(not(feature = "ppt"))]
/// Contract test: no-op when PPT feature is disabled.
pub fn contract_test(_test_name: &str, _required_invariants: &[u32]) {}

#[cfg(feature = "ppt")]
/// Clear invariant log (for between test runs).
pub fn clear_invariant_log() {
    INVARIANT_LOG.lock().unwrap_or_else(|e| e.into_inner()).clear();
}

#[cfg(not(feature = "ppt"))]
/// Clear invariant log: no-op when PPT feature is disabled.
pub fn clear_invariant_log() {}
