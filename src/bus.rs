//! Event-name subscriptions.
//!
//! The bus is the client side of the channel's `on(event, handler)`: it
//! records which target handles each event name. Handlers themselves live in
//! the [`Dashboard`](crate::Dashboard), which looks up routes for each
//! inbound event and dispatches to the graph or watcher they name.

use std::collections::HashMap;

/// What handles an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    /// Metric samples for the graph with this id.
    Graph(String),
    /// PID membership for the dynamic watcher at this index.
    PidMembership(usize),
    /// Socket FD membership for the dynamic watcher at this index.
    FdMembership(usize),
}

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Maps event names to the routes subscribed to them.
#[derive(Debug, Default)]
pub struct EventBus {
    routes: HashMap<String, Vec<(SubscriptionId, Route)>>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a route to an event name.
    pub fn subscribe(&mut self, event: impl Into<String>, route: Route) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.routes.entry(event.into()).or_default().push((id, route));
        id
    }

    /// Remove a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let mut removed = false;
        self.routes.retain(|_, subs| {
            let before = subs.len();
            subs.retain(|(sub, _)| *sub != id);
            removed |= subs.len() != before;
            !subs.is_empty()
        });
        removed
    }

    /// Routes subscribed to an event, in subscription order.
    pub fn routes(&self, event: &str) -> Vec<Route> {
        self.routes
            .get(event)
            .map(|subs| subs.iter().map(|(_, route)| route.clone()).collect())
            .unwrap_or_default()
    }

    pub fn is_subscribed(&self, event: &str) -> bool {
        self.routes.contains_key(event)
    }

    /// Total number of live subscriptions.
    pub fn len(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_in_subscription_order() {
        let mut bus = EventBus::new();
        bus.subscribe("stats-web-ep", Route::Graph("a".into()));
        bus.subscribe("stats-web-ep", Route::PidMembership(0));

        assert_eq!(
            bus.routes("stats-web-ep"),
            vec![Route::Graph("a".into()), Route::PidMembership(0)]
        );
        assert!(bus.routes("unknown").is_empty());
        assert_eq!(bus.len(), 2);
    }

    #[test]
    fn test_unsubscribe() {
        let mut bus = EventBus::new();
        let id = bus.subscribe("e", Route::Graph("a".into()));
        let other = bus.subscribe("f", Route::Graph("b".into()));

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert!(!bus.is_subscribed("e"));
        assert!(bus.is_subscribed("f"));

        assert!(bus.unsubscribe(other));
        assert!(bus.is_empty());
    }
}
