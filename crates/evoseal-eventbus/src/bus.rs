// crates/evoseal-eventbus/src/bus.rs
// ============================================================================
// Module: Event Bus
// Description: Process-wide publish/subscribe dispatcher and bounded history.
// Purpose: The single integration point every EVOSEAL component talks
//          through, doubling as the structured-logging substrate.
// Dependencies: evoseal-core, tokio::sync::Mutex
// ============================================================================

//! ## Overview
//! [`EventBusHandle`] is a cheaply cloneable handle onto one shared bus
//! instance. Subscriptions are ordered by `(priority desc, insertion order
//! asc)`; ties always favor the subscriber that registered first. Dispatch
//! is asynchronous end to end: `publish` awaits every matching handler
//! before returning, so publishers observe full fan-out completion.
//!
//! Each topic retains a bounded ring of its most recent events
//! ([`DEFAULT_HISTORY_CAPACITY`] per topic by default) so a newly attached
//! dashboard client or diagnostic query can replay recent activity without
//! a separate log store.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use evoseal_core::identifiers::SubscriptionId;
use evoseal_core::model::Event;
use evoseal_core::model::EventTopic;
use evoseal_core::time::Timestamp;
use tokio::sync::Mutex;

use crate::handler::DispatchControl;
use crate::handler::EventHandler;

/// Default number of retained events per topic when a bus is constructed
/// with [`EventBusHandle::new`].
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

// ============================================================================
// SECTION: Subscription
// ============================================================================

/// An optional topic filter; `None` matches every topic.
type TopicFilter = Option<BTreeSet<EventTopic>>;

/// One registered handler and its dispatch ordering key.
struct Subscription {
    /// Identifier returned to the caller for later unsubscription.
    id: SubscriptionId,
    /// Topics this subscription matches; `None` matches all topics.
    topics: TopicFilter,
    /// Dispatch priority; higher values run first.
    priority: i32,
    /// Monotonic registration order, used to break priority ties.
    sequence: u64,
    /// The handler itself.
    handler: Arc<dyn EventHandler>,
}

impl Subscription {
    /// Returns whether this subscription should receive `topic`.
    fn matches(&self, topic: EventTopic) -> bool {
        self.topics.as_ref().is_none_or(|topics| topics.contains(&topic))
    }
}

// ============================================================================
// SECTION: Event Bus
// ============================================================================

/// Shared state behind every [`EventBusHandle`] clone.
struct EventBusInner {
    /// Registered subscriptions.
    subscriptions: Mutex<Vec<Subscription>>,
    /// Next subscription sequence number.
    next_sequence: AtomicU64,
    /// Bounded per-topic event history.
    history: Mutex<BTreeMap<EventTopic, VecDeque<Event>>>,
    /// Maximum events retained per topic.
    history_capacity: usize,
}

/// A cheaply cloneable handle to a shared event bus.
///
/// # Invariants
/// - All clones of a handle observe the same subscriptions and history.
#[derive(Clone)]
pub struct EventBusHandle(Arc<EventBusInner>);

impl EventBusHandle {
    /// Creates a new, empty bus with [`DEFAULT_HISTORY_CAPACITY`] per topic.
    #[must_use]
    pub fn new() -> Self {
        Self::with_history_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Creates a new, empty bus retaining at most `history_capacity` events
    /// per topic.
    #[must_use]
    pub fn with_history_capacity(history_capacity: usize) -> Self {
        Self(Arc::new(EventBusInner {
            subscriptions: Mutex::new(Vec::new()),
            next_sequence: AtomicU64::new(0),
            history: Mutex::new(BTreeMap::new()),
            history_capacity,
        }))
    }

    /// Subscribes `handler` to every event whose topic is in `topics`, or to
    /// every topic when `topics` is empty.
    ///
    /// Returns a [`SubscriptionId`] usable with [`Self::unsubscribe`].
    pub async fn subscribe(
        &self,
        topics: impl IntoIterator<Item = EventTopic>,
        priority: i32,
        handler: Arc<dyn EventHandler>,
    ) -> SubscriptionId {
        let topics: BTreeSet<EventTopic> = topics.into_iter().collect();
        let id = SubscriptionId::generate();
        let sequence = self.0.next_sequence.fetch_add(1, Ordering::Relaxed);
        let subscription = Subscription {
            id: id.clone(),
            topics: if topics.is_empty() { None } else { Some(topics) },
            priority,
            sequence,
            handler,
        };
        let mut subscriptions = self.0.subscriptions.lock().await;
        subscriptions.push(subscription);
        subscriptions.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.sequence.cmp(&b.sequence)));
        id
    }

    /// Subscribes `handler` to every topic.
    pub async fn subscribe_all(&self, priority: i32, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        self.subscribe(std::iter::empty(), priority, handler).await
    }

    /// Removes a subscription, returning whether one was found.
    pub async fn unsubscribe(&self, id: &SubscriptionId) -> bool {
        let mut subscriptions = self.0.subscriptions.lock().await;
        let before = subscriptions.len();
        subscriptions.retain(|s| &s.id != id);
        subscriptions.len() != before
    }

    /// Publishes a single event, awaiting every matching handler in
    /// priority order before returning.
    ///
    /// Handler failures are isolated: a failing handler is recorded as a
    /// [`EventTopic::HandlerError`] entry in the history and does not
    /// prevent remaining handlers from running, nor does it surface to the
    /// caller.
    pub async fn publish(&self, event: Event) {
        self.record_history(event.clone()).await;

        let subscriptions = self.0.subscriptions.lock().await;
        let matching: Vec<Arc<dyn EventHandler>> = subscriptions
            .iter()
            .filter(|s| s.matches(event.topic))
            .map(|s| Arc::clone(&s.handler))
            .collect();
        drop(subscriptions);

        for handler in matching {
            match handler.handle(&event).await {
                Ok(DispatchControl::Continue) => {}
                Ok(DispatchControl::StopPropagation) => break,
                Err(err) => {
                    let error_event = Event::new(
                        EventTopic::HandlerError,
                        "eventbus",
                        format!("handler failed while processing {:?}: {err}", event.topic),
                    );
                    self.record_history(error_event).await;
                }
            }
        }
    }

    /// Publishes each event in `events` in order, awaiting full dispatch of
    /// one before starting the next.
    pub async fn publish_batch(&self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            self.publish(event).await;
        }
    }

    /// Returns the retained history for `topic`, optionally filtered to
    /// events at or after `since`, oldest first.
    pub async fn history(&self, topic: EventTopic, since: Option<Timestamp>) -> Vec<Event> {
        let history = self.0.history.lock().await;
        let Some(events) = history.get(&topic) else {
            return Vec::new();
        };
        events.iter().filter(|e| since.is_none_or(|cutoff| e.occurred_at >= cutoff)).cloned().collect()
    }

    /// Appends `event` to its topic's bounded history ring.
    async fn record_history(&self, event: Event) {
        let mut history = self.0.history.lock().await;
        let ring = history.entry(event.topic).or_insert_with(VecDeque::new);
        ring.push_back(event);
        while ring.len() > self.0.history_capacity {
            ring.pop_front();
        }
    }
}

impl Default for EventBusHandle {
    fn default() -> Self {
        Self::new()
    }
}
