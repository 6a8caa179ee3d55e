//! Observation filtering

use std::collections::HashSet;
use termtally_config::ReaderConfig;
use termtally_host_api::SessionRecord;
use termtally_util::Username;
use tracing::debug;

/// Drops sessions that must never be tallied
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    ignored_users: HashSet<Username>,
    count_disconnected: bool,
}

impl SessionFilter {
    pub fn new(ignored_users: HashSet<Username>, count_disconnected: bool) -> Self {
        Self {
            ignored_users,
            count_disconnected,
        }
    }

    pub fn from_config(config: &ReaderConfig) -> Self {
        Self::new(config.ignored_users.clone(), config.count_disconnected)
    }

    pub fn accepts(&self, record: &SessionRecord) -> bool {
        if self.ignored_users.contains(&record.username) {
            return false;
        }
        self.count_disconnected || !record.state.is_disconnected()
    }

    /// Keep only the records that count
    pub fn apply(&self, records: Vec<SessionRecord>) -> Vec<SessionRecord> {
        records
            .into_iter()
            .filter(|r| {
                let keep = self.accepts(r);
                if !keep {
                    debug!(user = %r.username, session_id = %r.session_id, state = ?r.state, "Ignoring session");
                }
                keep
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use termtally_host_api::SessionState;

    #[test]
    fn default_config_ignores_admin_and_disconnected() {
        let filter = SessionFilter::from_config(&ReaderConfig::default());

        let kept = filter.apply(vec![
            SessionRecord::active("1", "admin"),
            SessionRecord::active("2", "alice"),
            SessionRecord::new("3", "bob", SessionState::Disconnected),
        ]);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].username.as_str(), "alice");
    }

    #[test]
    fn disconnected_counted_when_enabled() {
        let filter = SessionFilter::new(HashSet::new(), true);
        assert!(filter.accepts(&SessionRecord::new("3", "bob", SessionState::Disconnected)));
        assert!(filter.accepts(&SessionRecord::active("1", "admin")));
    }
}
