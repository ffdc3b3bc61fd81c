//! Users and subscriptions
//!
//! User profiles and the user-to-branch subscription mapping behind
//! `GET /subscriptions`. Profiles are keyed by name (the login
//! identifier); subscriptions are keyed by user id.

use crate::branch::BranchRegistry;
use crate::error::FsError;
use crate::types::{BranchId, FileId, UserId};
use serde::{Deserialize, Serialize};
use sled::Tree;

pub(crate) const USERS_TREE: &str = "users";
pub(crate) const SUBSCRIPTIONS_TREE: &str = "subscriptions";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub password: String,
}

/// One row of the subscriptions listing served to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionView {
    pub branch_id: BranchId,
    pub branch_name: String,
    pub latest_version_id: FileId,
}

pub struct Users {
    users: Tree,
    subscriptions: Tree,
}

impl Users {
    pub fn open(db: &sled::Db) -> Result<Self, FsError> {
        Ok(Self {
            users: db.open_tree(USERS_TREE)?,
            subscriptions: db.open_tree(SUBSCRIPTIONS_TREE)?,
        })
    }

    pub fn create(&self, profile: &UserProfile) -> Result<(), FsError> {
        if self.users.get(profile.name.as_bytes())?.is_some() {
            return Err(FsError::AlreadyExists(profile.name.clone()));
        }
        self.users
            .insert(profile.name.as_bytes(), bincode::serialize(profile)?)?;
        Ok(())
    }

    pub fn by_name(&self, name: &str) -> Result<UserProfile, FsError> {
        let raw = self.users.get(name.as_bytes())?.ok_or(FsError::NotFound)?;
        Ok(bincode::deserialize(&raw)?)
    }

    /// Check credentials; `Ok(None)` for an unknown user or a wrong
    /// password, so callers cannot distinguish the two.
    pub fn authenticate(&self, name: &str, password: &str) -> Result<Option<UserId>, FsError> {
        match self.by_name(name) {
            Ok(profile) if profile.password == password => Ok(Some(profile.id)),
            Ok(_) => Ok(None),
            Err(FsError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn subscribe(&self, user: UserId, branch: BranchId) -> Result<(), FsError> {
        let mut branches = self.subscriptions_of(user)?;
        if !branches.contains(&branch) {
            branches.push(branch);
        }
        self.subscriptions
            .insert(user.to_be_bytes(), bincode::serialize(&branches)?)?;
        Ok(())
    }

    pub fn subscriptions_of(&self, user: UserId) -> Result<Vec<BranchId>, FsError> {
        match self.subscriptions.get(user.to_be_bytes())? {
            Some(raw) => Ok(bincode::deserialize(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// The user's subscriptions joined with the current branch heads.
    pub fn subscriptions_view(
        &self,
        user: UserId,
        registry: &BranchRegistry,
    ) -> Result<Vec<SubscriptionView>, FsError> {
        let mut views = Vec::new();
        for branch_id in self.subscriptions_of(user)? {
            let branch = registry.get(branch_id)?;
            views.push(SubscriptionView {
                branch_id: branch.id,
                branch_name: branch.name,
                latest_version_id: branch.latest_version_id,
            });
        }
        Ok(views)
    }
}
