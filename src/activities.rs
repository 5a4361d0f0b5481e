//! Activities: the content items users follow.

use crate::error::{LedgerError, Result};
use crate::ledger::SubscriptionLedger;
use crate::rights::RightsManager;
use crate::types::{ActivityId, Timestamp, UserId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A stored activity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub title: String,
    pub category: String,
    pub created_by: UserId,
    pub created: Timestamp,
}

/// Input for creating an activity.
#[derive(Clone, Debug)]
pub struct NewActivity {
    pub id: ActivityId,
    pub title: String,
    pub category: String,
}

impl NewActivity {
    pub fn new(
        id: impl Into<ActivityId>,
        title: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            category: category.into(),
        }
    }
}

/// Creates and deletes activities.
///
/// Creating an activity makes the creator its owner and subscribes them to
/// it. Deleting one leaves every subscription to it in place.
pub struct ActivityService {
    activities: RwLock<HashMap<ActivityId, Activity>>,
    rights: Arc<RightsManager>,
    ledger: Arc<SubscriptionLedger>,
}

impl ActivityService {
    pub fn new(rights: Arc<RightsManager>, ledger: Arc<SubscriptionLedger>) -> Self {
        Self {
            activities: RwLock::new(HashMap::new()),
            rights,
            ledger,
        }
    }

    pub fn create_activity(&self, committer: &UserId, new: NewActivity) -> Result<Activity> {
        let activity = {
            let mut activities = self.activities.write();
            if activities.contains_key(&new.id) {
                return Err(LedgerError::ActivityExists(new.id));
            }

            let activity = Activity {
                id: new.id,
                title: new.title,
                category: new.category,
                created_by: committer.clone(),
                created: Timestamp::now(),
            };
            activities.insert(activity.id.clone(), activity.clone());
            activity
        };

        self.rights.create_rights(&activity.id, committer);
        self.ledger.subscribe_to_activity(committer, &activity.id)?;

        debug!(activity = %activity.id, creator = %committer, "created activity");
        Ok(activity)
    }

    /// Delete an activity and its rights. Only owners may delete.
    pub fn delete_activity(&self, committer: &UserId, activity_id: &ActivityId) -> Result<()> {
        let mut activities = self.activities.write();
        if !activities.contains_key(activity_id) {
            return Err(LedgerError::ActivityNotFound(activity_id.clone()));
        }

        let is_owner = self
            .rights
            .get_rights(activity_id)
            .map(|rights| rights.is_owner(committer))
            .unwrap_or(false);
        if !is_owner {
            return Err(LedgerError::Unauthorized {
                user: committer.clone(),
                action: format!("delete {}", activity_id),
            });
        }

        activities.remove(activity_id);
        self.rights.remove_rights(activity_id);

        debug!(activity = %activity_id, "deleted activity");
        Ok(())
    }

    pub fn get_activity(&self, activity_id: &ActivityId) -> Option<Activity> {
        self.activities.read().get(activity_id).cloned()
    }

    pub fn activity_count(&self) -> usize {
        self.activities.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::MemoryRecordStore;
    use crate::rights::Role;

    fn service() -> (Arc<SubscriptionLedger>, Arc<RightsManager>, ActivityService) {
        let ledger = Arc::new(SubscriptionLedger::new(Arc::new(MemoryRecordStore::new())));
        let rights = Arc::new(RightsManager::new(Arc::clone(&ledger)));
        let service = ActivityService::new(Arc::clone(&rights), Arc::clone(&ledger));
        (ledger, rights, service)
    }

    #[test]
    fn test_create_makes_owner_and_subscribes() {
        let (ledger, rights, service) = service();
        let user = UserId::from("user_id");

        let activity = service
            .create_activity(&user, NewActivity::new("exp_id", "Title", "Category"))
            .unwrap();

        assert_eq!(activity.created_by, user);
        assert_eq!(rights.role_of(&activity.id, &user), Some(Role::Owner));
        assert_eq!(
            ledger.get_activity_ids_subscribed_to(&user).unwrap(),
            vec![ActivityId::from("exp_id")]
        );
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let (_, _, service) = service();
        let user = UserId::from("u");

        service
            .create_activity(&user, NewActivity::new("exp_id", "A", "C"))
            .unwrap();
        let result = service.create_activity(&user, NewActivity::new("exp_id", "B", "C"));

        assert!(matches!(result, Err(LedgerError::ActivityExists(_))));
        assert_eq!(service.get_activity(&ActivityId::from("exp_id")).unwrap().title, "A");
    }

    #[test]
    fn test_only_owner_deletes() {
        let (_, rights, service) = service();
        let owner = UserId::from("owner");
        let editor = UserId::from("editor");
        let id = ActivityId::from("exp_id");

        service
            .create_activity(&owner, NewActivity::new("exp_id", "T", "C"))
            .unwrap();
        rights.assign_role(&owner, &id, &editor, Role::Editor).unwrap();

        let result = service.delete_activity(&editor, &id);
        assert!(matches!(result, Err(LedgerError::Unauthorized { .. })));
        assert_eq!(service.activity_count(), 1);

        service.delete_activity(&owner, &id).unwrap();
        assert!(service.get_activity(&id).is_none());
        assert!(rights.get_rights(&id).is_none());
    }

    #[test]
    fn test_delete_missing() {
        let (_, _, service) = service();
        let result = service.delete_activity(&UserId::from("u"), &ActivityId::from("nope"));
        assert!(matches!(result, Err(LedgerError::ActivityNotFound(_))));
    }
}
