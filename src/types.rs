//! Core types for the subscription ledger.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                $name(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:?})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                $name(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                $name(id)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Opaque user identifier; the key of a subscription record.
    UserId
);

string_id!(
    /// Identifier of a content item that users can follow.
    ActivityId
);

string_id!(
    /// Identifier of a feedback thread attached to an activity.
    ThreadId
);

/// Microseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(duration.as_micros() as i64)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// Everything a single user follows.
///
/// Both collections keep insertion order and reject duplicates. A user
/// without a stored record behaves exactly like [`SubscriptionRecord::empty`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub user_id: UserId,

    /// Activities the user follows, oldest subscription first.
    pub activity_ids: IndexSet<ActivityId>,

    /// Feedback threads the user follows, oldest subscription first.
    pub feedback_thread_ids: IndexSet<ThreadId>,

    pub created: Timestamp,
    pub last_updated: Timestamp,
}

impl SubscriptionRecord {
    /// A record with no subscriptions.
    pub fn empty(user_id: UserId) -> Self {
        let now = Timestamp::now();
        Self {
            user_id,
            activity_ids: IndexSet::new(),
            feedback_thread_ids: IndexSet::new(),
            created: now,
            last_updated: now,
        }
    }

    /// Add an activity. Returns false if it was already followed.
    pub fn add_activity(&mut self, activity_id: ActivityId) -> bool {
        let inserted = self.activity_ids.insert(activity_id);
        if inserted {
            self.last_updated = Timestamp::now();
        }
        inserted
    }

    /// Add a feedback thread. Returns false if it was already followed.
    pub fn add_thread(&mut self, thread_id: ThreadId) -> bool {
        let inserted = self.feedback_thread_ids.insert(thread_id);
        if inserted {
            self.last_updated = Timestamp::now();
        }
        inserted
    }

    pub fn follows_activity(&self, activity_id: &ActivityId) -> bool {
        self.activity_ids.contains(activity_id)
    }

    pub fn follows_thread(&self, thread_id: &ThreadId) -> bool {
        self.feedback_thread_ids.contains(thread_id)
    }

    pub fn is_empty(&self) -> bool {
        self.activity_ids.is_empty() && self.feedback_thread_ids.is_empty()
    }
}
