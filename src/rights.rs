//! Collaboration roles on activities.
//!
//! Only the parts of the role model that drive subscriptions live here:
//! who owns, edits, or views an activity, and who may hand out roles.

use crate::error::{LedgerError, Result};
use crate::ledger::SubscriptionLedger;
use crate::types::{ActivityId, UserId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A collaboration role on an activity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Editor,
    Viewer,
}

impl Role {
    /// Whether receiving this role makes the user follow the activity.
    pub fn subscribes(self) -> bool {
        matches!(self, Role::Owner | Role::Editor)
    }
}

/// Who holds which role on one activity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRights {
    pub activity_id: ActivityId,
    pub owner_ids: Vec<UserId>,
    pub editor_ids: Vec<UserId>,
    pub viewer_ids: Vec<UserId>,
}

impl ActivityRights {
    fn new(activity_id: ActivityId, owner: UserId) -> Self {
        Self {
            activity_id,
            owner_ids: vec![owner],
            editor_ids: Vec::new(),
            viewer_ids: Vec::new(),
        }
    }

    pub fn is_owner(&self, user_id: &UserId) -> bool {
        self.owner_ids.contains(user_id)
    }

    /// The strongest role the user holds, if any.
    pub fn role_of(&self, user_id: &UserId) -> Option<Role> {
        if self.owner_ids.contains(user_id) {
            Some(Role::Owner)
        } else if self.editor_ids.contains(user_id) {
            Some(Role::Editor)
        } else if self.viewer_ids.contains(user_id) {
            Some(Role::Viewer)
        } else {
            None
        }
    }
}

/// Keeps role assignments and subscribes users who become owners or editors.
pub struct RightsManager {
    rights: RwLock<HashMap<ActivityId, ActivityRights>>,
    ledger: Arc<SubscriptionLedger>,
}

impl RightsManager {
    pub fn new(ledger: Arc<SubscriptionLedger>) -> Self {
        Self {
            rights: RwLock::new(HashMap::new()),
            ledger,
        }
    }

    /// Start tracking rights for a new activity with `owner` as sole owner.
    pub fn create_rights(&self, activity_id: &ActivityId, owner: &UserId) -> ActivityRights {
        let rights = ActivityRights::new(activity_id.clone(), owner.clone());
        self.rights
            .write()
            .insert(activity_id.clone(), rights.clone());
        rights
    }

    /// Give `assignee` a role on an activity. Only owners may assign roles.
    ///
    /// Promotion moves the user out of weaker role lists; assigning a role
    /// the user already holds, or a weaker one, fails. Owners and editors are
    /// subscribed to the activity once the assignment succeeds.
    pub fn assign_role(
        &self,
        committer: &UserId,
        activity_id: &ActivityId,
        assignee: &UserId,
        role: Role,
    ) -> Result<()> {
        {
            let mut all = self.rights.write();
            let rights = all
                .get_mut(activity_id)
                .ok_or_else(|| LedgerError::ActivityNotFound(activity_id.clone()))?;

            if !rights.is_owner(committer) {
                return Err(LedgerError::Unauthorized {
                    user: committer.clone(),
                    action: format!("assign roles on {}", activity_id),
                });
            }

            let held = rights.role_of(assignee);
            let already_held = || LedgerError::RoleAlreadyHeld {
                user: assignee.clone(),
                role,
            };

            match role {
                Role::Owner => {
                    if held == Some(Role::Owner) {
                        return Err(already_held());
                    }
                    rights.editor_ids.retain(|id| id != assignee);
                    rights.viewer_ids.retain(|id| id != assignee);
                    rights.owner_ids.push(assignee.clone());
                }
                Role::Editor => {
                    if matches!(held, Some(Role::Owner | Role::Editor)) {
                        return Err(already_held());
                    }
                    rights.viewer_ids.retain(|id| id != assignee);
                    rights.editor_ids.push(assignee.clone());
                }
                Role::Viewer => {
                    if held.is_some() {
                        return Err(already_held());
                    }
                    rights.viewer_ids.push(assignee.clone());
                }
            }
        }

        debug!(
            activity = %activity_id,
            assignee = %assignee,
            ?role,
            "assigned role"
        );

        if role.subscribes() {
            self.ledger.subscribe_to_activity(assignee, activity_id)?;
        }
        Ok(())
    }

    pub fn get_rights(&self, activity_id: &ActivityId) -> Option<ActivityRights> {
        self.rights.read().get(activity_id).cloned()
    }

    /// The strongest role `user_id` holds on the activity.
    pub fn role_of(&self, activity_id: &ActivityId, user_id: &UserId) -> Option<Role> {
        self.rights
            .read()
            .get(activity_id)
            .and_then(|rights| rights.role_of(user_id))
    }

    /// Stop tracking an activity's rights. Does not touch subscriptions.
    pub fn remove_rights(&self, activity_id: &ActivityId) -> Option<ActivityRights> {
        self.rights.write().remove(activity_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::MemoryRecordStore;

    fn setup() -> (Arc<SubscriptionLedger>, RightsManager, ActivityId, UserId) {
        let ledger = Arc::new(SubscriptionLedger::new(Arc::new(MemoryRecordStore::new())));
        let manager = RightsManager::new(Arc::clone(&ledger));
        let activity = ActivityId::from("exp_id");
        let owner = UserId::from("owner");
        manager.create_rights(&activity, &owner);
        (ledger, manager, activity, owner)
    }

    #[test]
    fn test_role_subscribes() {
        assert!(Role::Owner.subscribes());
        assert!(Role::Editor.subscribes());
        assert!(!Role::Viewer.subscribes());
    }

    #[test]
    fn test_viewer_promoted_to_editor() {
        let (ledger, manager, activity, owner) = setup();
        let user = UserId::from("u");

        manager.assign_role(&owner, &activity, &user, Role::Viewer).unwrap();
        assert!(ledger.get_activity_ids_subscribed_to(&user).unwrap().is_empty());

        manager.assign_role(&owner, &activity, &user, Role::Editor).unwrap();
        let rights = manager.get_rights(&activity).unwrap();
        assert!(rights.viewer_ids.is_empty());
        assert_eq!(rights.editor_ids, vec![user.clone()]);
        assert_eq!(
            ledger.get_activity_ids_subscribed_to(&user).unwrap(),
            vec![activity]
        );
    }

    #[test]
    fn test_editor_cannot_be_made_viewer() {
        let (_, manager, activity, owner) = setup();
        let user = UserId::from("u");

        manager.assign_role(&owner, &activity, &user, Role::Editor).unwrap();
        let result = manager.assign_role(&owner, &activity, &user, Role::Viewer);
        assert!(matches!(
            result,
            Err(LedgerError::RoleAlreadyHeld { role: Role::Viewer, .. })
        ));
        assert_eq!(manager.role_of(&activity, &user), Some(Role::Editor));
    }

    #[test]
    fn test_non_owner_cannot_assign() {
        let (ledger, manager, activity, owner) = setup();
        let editor = UserId::from("editor");
        let other = UserId::from("other");

        manager.assign_role(&owner, &activity, &editor, Role::Editor).unwrap();
        let result = manager.assign_role(&editor, &activity, &other, Role::Editor);

        assert!(matches!(result, Err(LedgerError::Unauthorized { .. })));
        assert!(ledger.get_activity_ids_subscribed_to(&other).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_activity() {
        let (_, manager, _, owner) = setup();
        let result = manager.assign_role(
            &owner,
            &ActivityId::from("missing"),
            &UserId::from("u"),
            Role::Owner,
        );
        assert!(matches!(result, Err(LedgerError::ActivityNotFound(_))));
    }
}
