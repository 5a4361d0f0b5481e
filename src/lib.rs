//! # Subscription Ledger
//!
//! Tracks which feedback threads and which activities each user follows, so
//! the surrounding application knows whom to notify.
//!
//! ## Core Concepts
//!
//! - **Ledger**: per-user, insertion-ordered, duplicate-free sets of
//!   followed threads and activities
//! - **Record store**: injected persistence for one record per user,
//!   in memory or as an append-only log on disk
//! - **Flows**: creating an activity, being made owner or editor, and
//!   posting feedback all subscribe the acting user
//!
//! Subscriptions are never retracted when the followed item is deleted.
//!
//! ## Example
//!
//! ```ignore
//! use subscription_ledger::{NewActivity, Role, Store, StoreConfig, UserId};
//!
//! let store = Store::open_or_create(StoreConfig {
//!     path: "./subscriptions".into(),
//!     ..Default::default()
//! })?;
//!
//! let owner = UserId::from("owner");
//! let activity = store
//!     .activities()
//!     .create_activity(&owner, NewActivity::new("exp_id", "Title", "Category"))?;
//!
//! store
//!     .rights()
//!     .assign_role(&owner, &activity.id, &UserId::from("editor"), Role::Editor)?;
//!
//! let followed = store.ledger().get_activity_ids_subscribed_to(&owner)?;
//! ```

pub mod activities;
pub mod error;
pub mod feedback;
pub mod ledger;
pub mod records;
pub mod rights;
pub mod store;
pub mod types;

// Re-exports
pub use activities::{Activity, ActivityService, NewActivity};
pub use error::{LedgerError, Result};
pub use feedback::{FeedbackMessage, FeedbackService, FeedbackThread, ThreadStatus};
pub use ledger::SubscriptionLedger;
pub use records::{FileRecordStore, FileStoreStats, MemoryRecordStore, RecordStore};
pub use rights::{ActivityRights, RightsManager, Role};
pub use store::{Store, StoreConfig};
pub use types::*;
