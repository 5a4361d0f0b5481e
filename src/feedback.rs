//! Feedback threads attached to activities.
//!
//! Every identified author of a message in a thread ends up subscribed to
//! that thread. Anonymous messages subscribe nobody.

use crate::error::{LedgerError, Result};
use crate::ledger::SubscriptionLedger;
use crate::types::{ActivityId, ThreadId, Timestamp, UserId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Lifecycle status of a feedback thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadStatus {
    #[default]
    Open,
    Fixed,
    Ignored,
    Compliment,
    NotActionable,
}

/// A feedback thread.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeedbackThread {
    pub id: ThreadId,
    /// Creation order across the service; the `n` in the thread id.
    pub sequence: u64,
    pub activity_id: ActivityId,
    /// Part of the activity the feedback is about, if any.
    pub state_name: Option<String>,
    /// `None` for anonymous feedback.
    pub original_author_id: Option<UserId>,
    pub status: ThreadStatus,
    pub subject: String,
    pub message_count: u64,
    pub created: Timestamp,
    pub last_updated: Timestamp,
}

/// A single message in a feedback thread.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeedbackMessage {
    pub thread_id: ThreadId,
    /// Position in the thread, starting at 0.
    pub message_id: u64,
    pub author_id: Option<UserId>,
    pub updated_status: Option<ThreadStatus>,
    pub updated_subject: Option<String>,
    pub text: String,
    pub created: Timestamp,
}

/// Stores threads and messages and subscribes their authors.
pub struct FeedbackService {
    threads: RwLock<HashMap<ThreadId, FeedbackThread>>,
    messages: RwLock<HashMap<ThreadId, Vec<FeedbackMessage>>>,
    /// Counter for generating thread IDs.
    next_thread: AtomicU64,
    ledger: Arc<SubscriptionLedger>,
}

impl FeedbackService {
    pub fn new(ledger: Arc<SubscriptionLedger>) -> Self {
        Self {
            threads: RwLock::new(HashMap::new()),
            messages: RwLock::new(HashMap::new()),
            next_thread: AtomicU64::new(1),
            ledger,
        }
    }

    /// Open a thread on an activity and post its first message.
    ///
    /// Returns the new thread's id, `"{activity_id}.{n}"`.
    pub fn create_thread(
        &self,
        activity_id: &ActivityId,
        state_name: Option<&str>,
        original_author: Option<&UserId>,
        subject: &str,
        text: &str,
    ) -> Result<ThreadId> {
        let n = self.next_thread.fetch_add(1, Ordering::SeqCst);
        let thread_id = ThreadId::new(format!("{}.{}", activity_id, n));
        let now = Timestamp::now();

        let thread = FeedbackThread {
            id: thread_id.clone(),
            sequence: n,
            activity_id: activity_id.clone(),
            state_name: state_name.map(str::to_string),
            original_author_id: original_author.cloned(),
            status: ThreadStatus::Open,
            subject: subject.to_string(),
            message_count: 0,
            created: now,
            last_updated: now,
        };
        self.threads.write().insert(thread_id.clone(), thread);
        self.messages.write().insert(thread_id.clone(), Vec::new());

        debug!(thread = %thread_id, activity = %activity_id, "created feedback thread");

        self.create_message(
            &thread_id,
            original_author,
            Some(ThreadStatus::Open),
            Some(subject),
            text,
        )?;
        Ok(thread_id)
    }

    /// Post a message to an existing thread.
    ///
    /// `updated_status` and `updated_subject` change the thread when given.
    pub fn create_message(
        &self,
        thread_id: &ThreadId,
        author: Option<&UserId>,
        updated_status: Option<ThreadStatus>,
        updated_subject: Option<&str>,
        text: &str,
    ) -> Result<FeedbackMessage> {
        let message = {
            let mut threads = self.threads.write();
            let thread = threads
                .get_mut(thread_id)
                .ok_or_else(|| LedgerError::ThreadNotFound(thread_id.clone()))?;

            let message = FeedbackMessage {
                thread_id: thread_id.clone(),
                message_id: thread.message_count,
                author_id: author.cloned(),
                updated_status,
                updated_subject: updated_subject.map(str::to_string),
                text: text.to_string(),
                created: Timestamp::now(),
            };

            if let Some(status) = updated_status {
                thread.status = status;
            }
            if let Some(subject) = updated_subject {
                thread.subject = subject.to_string();
            }
            thread.message_count += 1;
            thread.last_updated = message.created;

            self.messages
                .write()
                .entry(thread_id.clone())
                .or_default()
                .push(message.clone());
            message
        };

        if let Some(author) = author {
            self.ledger.subscribe_to_thread(author, thread_id)?;
        }
        Ok(message)
    }

    /// All messages in a thread, oldest first.
    pub fn get_messages(&self, thread_id: &ThreadId) -> Result<Vec<FeedbackMessage>> {
        self.messages
            .read()
            .get(thread_id)
            .cloned()
            .ok_or_else(|| LedgerError::ThreadNotFound(thread_id.clone()))
    }

    pub fn get_thread(&self, thread_id: &ThreadId) -> Option<FeedbackThread> {
        self.threads.read().get(thread_id).cloned()
    }

    /// Threads on an activity, oldest first.
    pub fn get_threads(&self, activity_id: &ActivityId) -> Vec<FeedbackThread> {
        let mut threads: Vec<_> = self
            .threads
            .read()
            .values()
            .filter(|thread| &thread.activity_id == activity_id)
            .cloned()
            .collect();
        threads.sort_by_key(|thread| thread.sequence);
        threads
    }
}
