use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::parser::ParsedEvent;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub name: String,
    pub joined_at: DateTime<Utc>,
}

/// Online players, keyed by name.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    players: BTreeMap<String, Player>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_join(&mut self, name: &str) {
        self.players.insert(
            name.to_string(),
            Player {
                name: name.to_string(),
                joined_at: Utc::now(),
            },
        );
    }

    pub fn apply_leave(&mut self, name: &str) {
        self.players.remove(name);
    }

    /// Roster lines carry no join times; every listed player gets `now`.
    pub fn apply_roster_replace<S: AsRef<str>>(&mut self, names: &[S]) {
        let now = Utc::now();
        self.players = names
            .iter()
            .map(|name| {
                let name = name.as_ref().to_string();
                (
                    name.clone(),
                    Player {
                        name,
                        joined_at: now,
                    },
                )
            })
            .collect();
    }

    pub fn apply(&mut self, event: &ParsedEvent) {
        match event {
            ParsedEvent::PlayerJoined(name) => self.apply_join(name),
            ParsedEvent::PlayerLeft(name) => self.apply_leave(name),
            ParsedEvent::RosterReplaced(names) => self.apply_roster_replace(names),
        }
    }

    pub fn clear(&mut self) {
        self.players.clear();
    }

    pub fn contains(&self, name: &str) -> bool {
        self.players.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Full roster, sorted by name.
    pub fn snapshot(&self) -> Vec<Player> {
        self.players.values().cloned().collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.players.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn join_then_leave() {
        let mut tracker = PresenceTracker::new();
        tracker.apply_join("Steve");
        assert!(tracker.contains("Steve"));

        tracker.apply_leave("Steve");
        assert!(tracker.is_empty());
    }

    #[test]
    fn leave_for_unknown_player_is_noop() {
        let mut tracker = PresenceTracker::new();
        tracker.apply_join("Alex");
        tracker.apply_leave("Herobrine");
        assert_eq!(tracker.names(), vec!["Alex".to_string()]);
    }

    #[test]
    fn roster_replaces_stale_entries() {
        let mut tracker = PresenceTracker::new();
        tracker.apply_join("Stale");
        tracker.apply_roster_replace(&["Alice", "Bob"]);
        assert_eq!(tracker.names(), vec!["Alice".to_string(), "Bob".to_string()]);
    }

    #[test]
    fn duplicate_join_keeps_one_entry() {
        let mut tracker = PresenceTracker::new();
        tracker.apply_join("Steve");
        tracker.apply_join("Steve");
        assert_eq!(tracker.snapshot().len(), 1);
    }

    fn event_strategy() -> impl Strategy<Value = ParsedEvent> {
        let name = prop::sample::select(vec!["Alice", "Bob", "Carl", "Dana"]).prop_map(String::from);
        prop_oneof![
            name.clone().prop_map(ParsedEvent::PlayerJoined),
            name.clone().prop_map(ParsedEvent::PlayerLeft),
            prop::collection::vec(name, 0..4).prop_map(ParsedEvent::RosterReplaced),
        ]
    }

    proptest! {
        #[test]
        fn replay_matches_set_model(events in prop::collection::vec(event_strategy(), 0..64)) {
            let mut tracker = PresenceTracker::new();
            let mut model: BTreeSet<String> = BTreeSet::new();

            for event in &events {
                tracker.apply(event);
                match event {
                    ParsedEvent::PlayerJoined(n) => { model.insert(n.clone()); }
                    ParsedEvent::PlayerLeft(n) => { model.remove(n); }
                    ParsedEvent::RosterReplaced(ns) => { model = ns.iter().cloned().collect(); }
                }
            }

            prop_assert_eq!(tracker.names(), model.into_iter().collect::<Vec<_>>());
        }
    }
}
