use std::collections::HashMap;

/// Opaque pagination position for one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct PageCursor {
    pub token: Option<String>,
    pub has_more: bool,
}

/// Per-channel pagination cursors.
///
/// Cleared at the start of every full refresh; seeded by that refresh's
/// page-1 results; advanced only by load-more.
#[derive(Debug, Default, Clone)]
pub struct PaginationCursors {
    cursors: HashMap<String, PageCursor>,
}

impl PaginationCursors {
    pub fn clear(&mut self) {
        self.cursors.clear();
    }

    /// Record the position a page fetch left a channel at. A page with no
    /// more history drops the channel's entry.
    pub fn record(&mut self, channel_id: &str, token: Option<String>, has_more: bool) {
        if has_more {
            self.cursors
                .insert(channel_id.to_string(), PageCursor { token, has_more });
        } else {
            self.cursors.remove(channel_id);
        }
    }

    /// Channels that still hold a cursor, with their tokens.
    #[must_use]
    pub fn holding(&self) -> Vec<(String, Option<String>)> {
        self.cursors
            .iter()
            .map(|(id, c)| (id.clone(), c.token.clone()))
            .collect()
    }

    /// Whether any channel still has more history to page through.
    #[must_use]
    pub fn any_more(&self) -> bool {
        !self.cursors.is_empty()
    }
}

#[cfg(test)]
mod cursor_tests {
    use super::*;

    #[test]
    fn test_record_and_clear_on_exhausted_channel() {
        let mut cursors = PaginationCursors::default();

        cursors.record("C1", Some("t1".to_string()), true);
        cursors.record("C2", Some("t2".to_string()), true);
        assert!(cursors.any_more());
        assert_eq!(cursors.holding().len(), 2);

        cursors.record("C1", None, false);
        let holding = cursors.holding();
        assert_eq!(holding.len(), 1);
        assert_eq!(holding[0].0, "C2");

        cursors.record("C2", None, false);
        assert!(!cursors.any_more());
    }

    #[test]
    fn test_full_refresh_clears_everything() {
        let mut cursors = PaginationCursors::default();
        cursors.record("C1", Some("t1".to_string()), true);

        cursors.clear();
        assert!(!cursors.any_more());
        assert!(cursors.holding().is_empty());
    }
}
