//! Store seams for memberships and sessions
//!
//! The relational store lives outside this crate. Adapters implement
//! [`MembershipReader`] and [`SessionReader`]; the in-memory implementations
//! here back tests and embedded deployments.

use crate::error::BoxError;
use crate::gid::Gid;
use crate::model::{ChildSession, Membership};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Read access to memberships
#[async_trait]
pub trait MembershipReader: Send + Sync {
    /// All memberships of `principal_id`, in any state
    async fn load_all_memberships(
        &self,
        principal_id: &Gid,
    ) -> Result<Vec<Membership>, BoxError>;
}

/// Read access to child sessions
#[async_trait]
pub trait SessionReader: Send + Sync {
    /// Child session for `membership_id` under `root_session_id`, if any
    async fn load_child_session(
        &self,
        root_session_id: &Gid,
        membership_id: &Gid,
    ) -> Result<Option<ChildSession>, BoxError>;
}

/// In-memory membership store
pub struct InMemoryMembershipStore {
    memberships: Arc<RwLock<HashMap<Gid, Vec<Membership>>>>,
}

impl InMemoryMembershipStore {
    pub fn new() -> Self {
        Self {
            memberships: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Add a membership, indexed by its identity
    pub async fn insert(&self, membership: Membership) {
        let mut memberships = self.memberships.write().await;
        memberships
            .entry(membership.identity_id)
            .or_default()
            .push(membership);
    }
}

impl Default for InMemoryMembershipStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MembershipReader for InMemoryMembershipStore {
    async fn load_all_memberships(
        &self,
        principal_id: &Gid,
    ) -> Result<Vec<Membership>, BoxError> {
        let memberships = self.memberships.read().await;
        Ok(memberships.get(principal_id).cloned().unwrap_or_default())
    }
}

/// In-memory child session store
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<(Gid, Gid), ChildSession>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Add a child session, replacing any previous one for the same pair
    pub async fn insert(&self, session: ChildSession) {
        let mut sessions = self.sessions.write().await;
        sessions.insert((session.root_session_id, session.membership_id), session);
    }

    /// Remove the child session for a root session and membership
    pub async fn remove(&self, root_session_id: &Gid, membership_id: &Gid) -> Option<ChildSession> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(&(*root_session_id, *membership_id))
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionReader for InMemorySessionStore {
    async fn load_child_session(
        &self,
        root_session_id: &Gid,
        membership_id: &Gid,
    ) -> Result<Option<ChildSession>, BoxError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&(*root_session_id, *membership_id)).cloned())
    }
}
