//! Allowlist enforcement for the Telegram adapter.
//!
//! Deny-by-default: an empty list admits no one. `"*"` admits everyone.

use std::collections::HashSet;

/// Parsed `allow_users` entries.
///
/// Telegram usernames always start with a letter, so an all-digit entry is a
/// numeric user id and anything else is a username (leading `@` optional).
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    any: bool,
    ids: HashSet<u64>,
    usernames: HashSet<String>,
}

impl AllowList {
    pub fn new(entries: &[String]) -> Self {
        let mut list = AllowList::default();
        for entry in entries {
            let entry = entry.trim().trim_start_matches('@');
            if entry == "*" {
                list.any = true;
            } else if let Ok(id) = entry.parse::<u64>() {
                list.ids.insert(id);
            } else if !entry.is_empty() {
                list.usernames.insert(entry.to_string());
            }
        }
        list
    }

    /// Usernames compare case-sensitively, as the Bot API reports them.
    pub fn permits(&self, username: Option<&str>, user_id: u64) -> bool {
        self.any
            || self.ids.contains(&user_id)
            || username.is_some_and(|u| self.usernames.contains(u))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(entries: &[&str]) -> AllowList {
        AllowList::new(&entries.iter().map(|s| s.to_string()).collect::<Vec<_>>())
    }

    #[test]
    fn empty_list_denies_all() {
        assert!(!list(&[]).permits(Some("alice"), 111));
    }

    #[test]
    fn wildcard_allows_all() {
        let l = list(&["*"]);
        assert!(l.permits(Some("alice"), 111));
        assert!(l.permits(None, 999));
    }

    #[test]
    fn username_with_or_without_at() {
        let l = list(&["alice", "@bob"]);
        assert!(l.permits(Some("alice"), 1));
        assert!(l.permits(Some("bob"), 2));
        assert!(!l.permits(Some("carol"), 3));
        assert!(!l.permits(None, 4));
    }

    #[test]
    fn numeric_entries_match_ids() {
        let l = list(&["123456789"]);
        assert!(l.permits(None, 123_456_789));
        assert!(!l.permits(Some("alice"), 111));
    }

    #[test]
    fn usernames_are_case_sensitive() {
        let l = list(&["Alice"]);
        assert!(l.permits(Some("Alice"), 1));
        assert!(!l.permits(Some("alice"), 1));
    }

    #[test]
    fn blank_entries_are_ignored() {
        let l = list(&["", "  ", "@"]);
        assert!(!l.permits(Some(""), 0));
    }
}
