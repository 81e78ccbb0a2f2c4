use std::sync::Arc;

use tracing::info;

use crate::feed::FeedEvent;
use crate::history::History;
use crate::models::MetricsSnapshot;
use crate::view::{self, View};

/// State of the link to the metrics producer, as shown in the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    Connecting(u32),
    Live,
    Down(String),
}

/// Main application state
pub struct App {
    pub endpoint: String,
    pub current: Option<Arc<MetricsSnapshot>>,
    pub history: History,
    pub link: LinkState,
    pub dropped: u64,
    pub frame_count: u64,
}

impl App {
    pub fn new(endpoint: impl Into<String>) -> Self {
        App {
            endpoint: endpoint.into(),
            current: None,
            history: History::new(),
            link: LinkState::Connecting(1),
            dropped: 0,
            frame_count: 0,
        }
    }

    /// Applies one feed event. Returns whether the screen needs a redraw.
    pub fn apply(&mut self, event: FeedEvent) -> bool {
        match event {
            FeedEvent::Snapshot(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.history = self.history.append(Arc::clone(&snapshot));
                self.current = Some(snapshot);
                true
            }
            FeedEvent::Malformed(_) => {
                self.dropped += 1;
                true
            }
            FeedEvent::Connecting { attempt } => self.set_link(LinkState::Connecting(attempt)),
            FeedEvent::Connected => self.set_link(LinkState::Live),
            FeedEvent::Disconnected { reason } => self.set_link(LinkState::Down(reason)),
        }
    }

    /// Current render description.
    pub fn view(&self) -> View {
        view::build(self.current.as_deref(), &self.history)
    }

    /// Increment frame counter
    pub fn tick(&mut self) {
        self.frame_count += 1;
    }

    fn set_link(&mut self, link: LinkState) -> bool {
        if self.link == link {
            return false;
        }
        info!(?link, "feed link state changed");
        self.link = link;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use chrono::Utc;

    fn snapshot(cpu: f64) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            cpu_percent: cpu,
            memory_percent: 0.0,
            gpu_info: Vec::new(),
            active_sessions: 0,
        }
    }

    #[test]
    fn starts_in_loading_state() {
        let app = App::new("ws://localhost:8000/ws");
        assert!(app.current.is_none());
        assert!(app.history.is_empty());
        assert_eq!(app.view(), View::Loading);
    }

    #[test]
    fn every_snapshot_refreshes_and_lands_in_history() {
        let mut app = App::new("ws://x");
        for n in 0..40 {
            assert!(app.apply(FeedEvent::Snapshot(snapshot(n as f64))));
            let current = app.current.as_ref().unwrap();
            assert!(Arc::ptr_eq(current, app.history.latest().unwrap()));
        }
        assert_eq!(app.history.len(), crate::history::HISTORY_CAPACITY);
        assert_eq!(app.current.as_ref().unwrap().cpu_percent, 39.0);
    }

    #[test]
    fn malformed_messages_are_counted_not_stored() {
        let mut app = App::new("ws://x");
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        app.apply(FeedEvent::Malformed(DecodeError::Json(err)));
        assert_eq!(app.dropped, 1);
        assert!(app.current.is_none());
        assert!(app.history.is_empty());
    }

    #[test]
    fn link_changes_redraw_only_when_different() {
        let mut app = App::new("ws://x");
        assert!(!app.apply(FeedEvent::Connecting { attempt: 1 }));
        assert!(app.apply(FeedEvent::Connected));
        assert!(!app.apply(FeedEvent::Connected));
        assert_eq!(app.link, LinkState::Live);
        assert!(app.apply(FeedEvent::Disconnected {
            reason: "connection closed by server".into()
        }));
        assert_eq!(app.link, LinkState::Down("connection closed by server".into()));
    }

    #[test]
    fn snapshot_survives_disconnect() {
        let mut app = App::new("ws://x");
        app.apply(FeedEvent::Snapshot(snapshot(12.0)));
        app.apply(FeedEvent::Disconnected { reason: "gone".into() });
        assert_eq!(app.current.as_ref().unwrap().cpu_percent, 12.0);
    }
}
