//! In-process status event bus.
//!
//! The bus keeps a capped history of [`StatusEvent`]s and notifies
//! subscribers synchronously on every [`EventBus::emit`]: first those
//! registered for the event's exact kind, then wildcard subscribers. There is
//! no persistence and no redelivery.

mod schema;

pub use schema::{
    new_event_id, now_unix_millis, ApiRequestEvent, EventKind, LifecycleStatus, RequestSettings,
    StatusEvent, StreamEvent, SystemEvent, SystemLevel, ToolCallEvent,
};

use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

/// Events retained in history; older ones are evicted first.
pub const EVENT_HISTORY_CAPACITY: usize = 50;

/// Subscription key: one event kind, or every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTopic {
    Kind(EventKind),
    All,
}

impl From<EventKind> for EventTopic {
    fn from(kind: EventKind) -> Self {
        Self::Kind(kind)
    }
}

/// Handle returned by [`EventBus::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn(&StatusEvent) + Send + Sync>;

/// Derived counters over the retained history.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BusStats {
    pub total_events: usize,
    pub api_requests: usize,
    pub tool_calls: usize,
    pub streams: usize,
    pub system_events: usize,
    /// System events at error level.
    pub errors: usize,
    pub last_activity_ms: Option<u64>,
    /// Mean duration of api_request events that carry one; 0 when none do.
    pub avg_response_time_ms: f64,
}

#[derive(Default)]
struct BusState {
    history: VecDeque<StatusEvent>,
    listeners: HashMap<EventTopic, Vec<(SubscriptionId, Callback)>>,
    next_subscription: u64,
}

/// Publish/subscribe channel shared by concurrent orchestration runs.
pub struct EventBus {
    state: Mutex<BusState>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(EVENT_HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(BusState::default()),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        // A panicking subscriber never holds the lock, so poisoning only
        // follows a panic in our own bookkeeping; the state is still usable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Subscribe to one kind (or [`EventTopic::All`]).
    pub fn on<F>(&self, topic: impl Into<EventTopic>, callback: F) -> SubscriptionId
    where
        F: Fn(&StatusEvent) + Send + Sync + 'static,
    {
        let mut state = self.lock();
        let id = SubscriptionId(state.next_subscription);
        state.next_subscription += 1;
        state
            .listeners
            .entry(topic.into())
            .or_default()
            .push((id, Arc::new(callback)));
        id
    }

    /// Remove a subscription. Unknown ids are ignored.
    pub fn off(&self, topic: impl Into<EventTopic>, id: SubscriptionId) {
        let mut state = self.lock();
        if let Some(callbacks) = state.listeners.get_mut(&topic.into()) {
            callbacks.retain(|(sub, _)| *sub != id);
        }
    }

    /// Record an event and notify subscribers.
    ///
    /// Callbacks run after the history lock is released, each isolated: a
    /// panicking subscriber is logged and the remaining ones still run.
    pub fn emit(&self, event: StatusEvent) {
        let callbacks: Vec<Callback> = {
            let mut state = self.lock();
            state.history.push_back(event.clone());
            while state.history.len() > self.capacity {
                state.history.pop_front();
            }
            let exact = state.listeners.get(&EventTopic::Kind(event.kind()));
            let wildcard = state.listeners.get(&EventTopic::All);
            exact
                .into_iter()
                .chain(wildcard)
                .flatten()
                .map(|(_, cb)| Arc::clone(cb))
                .collect()
        };

        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(&event))).is_err() {
                warn!(
                    event_id = %event.id(),
                    kind = event.kind().as_str(),
                    "status event subscriber panicked"
                );
            }
        }
    }

    /// The last `count` events, oldest first.
    pub fn recent_events(&self, count: usize) -> Vec<StatusEvent> {
        let state = self.lock();
        let skip = state.history.len().saturating_sub(count);
        state.history.iter().skip(skip).cloned().collect()
    }

    pub fn events_by_type(&self, kind: EventKind) -> Vec<StatusEvent> {
        self.lock()
            .history
            .iter()
            .filter(|e| e.kind() == kind)
            .cloned()
            .collect()
    }

    /// Drop the history. Subscriptions stay in place.
    pub fn clear(&self) {
        self.lock().history.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().history.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> BusStats {
        let state = self.lock();
        let count = |kind: EventKind| state.history.iter().filter(|e| e.kind() == kind).count();

        let durations: Vec<u64> = state
            .history
            .iter()
            .filter(|e| e.kind() == EventKind::ApiRequest)
            .filter_map(StatusEvent::duration_ms)
            .collect();
        let avg_response_time_ms = if durations.is_empty() {
            0.0
        } else {
            durations.iter().sum::<u64>() as f64 / durations.len() as f64
        };

        BusStats {
            total_events: state.history.len(),
            api_requests: count(EventKind::ApiRequest),
            tool_calls: count(EventKind::ToolCall),
            streams: count(EventKind::Stream),
            system_events: count(EventKind::System),
            errors: state
                .history
                .iter()
                .filter(|e| matches!(e, StatusEvent::System(s) if s.level == SystemLevel::Error))
                .count(),
            last_activity_ms: state.history.back().map(StatusEvent::timestamp_ms),
            avg_response_time_ms,
        }
    }
}
