//! In-process control plane.
//!
//! Holds a set of clusters and a map of database users, and journals every
//! call so tests can assert on what the managers asked for.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{ControlPlane, ControlPlaneError};
use crate::model::DatabaseUser;

/// One recorded control-plane request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlPlaneCall {
    ClusterExists(String),
    CreateUser(String),
    UpdateUser(String),
    DeleteUser(String),
}

#[derive(Debug, Default)]
pub struct InMemoryControlPlane {
    clusters: Mutex<HashSet<String>>,
    users: Mutex<HashMap<String, DatabaseUser>>,
    journal: Mutex<Vec<ControlPlaneCall>>,
    /// Artificial delay before every answer.
    latency: Option<Duration>,
}

impl InMemoryControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// A control plane that knows the given clusters.
    pub fn with_clusters<I, S>(clusters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            clusters: Mutex::new(clusters.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Seed a user as if created out of band.
    pub async fn insert_user(&self, user: DatabaseUser) {
        self.users.lock().await.insert(user.username.clone(), user);
    }

    pub async fn user(&self, username: &str) -> Option<DatabaseUser> {
        self.users.lock().await.get(username).cloned()
    }

    pub async fn user_count(&self) -> usize {
        self.users.lock().await.len()
    }

    pub async fn calls(&self) -> Vec<ControlPlaneCall> {
        self.journal.lock().await.clone()
    }

    async fn record(&self, call: ControlPlaneCall) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.journal.lock().await.push(call);
    }
}

#[async_trait]
impl ControlPlane for InMemoryControlPlane {
    async fn cluster_exists(&self, name: &str) -> Result<bool, ControlPlaneError> {
        self.record(ControlPlaneCall::ClusterExists(name.to_string()))
            .await;
        Ok(self.clusters.lock().await.contains(name))
    }

    async fn create_database_user(&self, user: &DatabaseUser) -> Result<(), ControlPlaneError> {
        self.record(ControlPlaneCall::CreateUser(user.username.clone()))
            .await;
        let mut users = self.users.lock().await;
        if users.contains_key(&user.username) {
            return Err(ControlPlaneError::AlreadyExists(user.username.clone()));
        }
        users.insert(user.username.clone(), user.clone());
        Ok(())
    }

    async fn update_database_user(&self, user: &DatabaseUser) -> Result<(), ControlPlaneError> {
        self.record(ControlPlaneCall::UpdateUser(user.username.clone()))
            .await;
        match self.users.lock().await.get_mut(&user.username) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(ControlPlaneError::NotFound(user.username.clone())),
        }
    }

    async fn delete_database_user(&self, username: &str) -> Result<(), ControlPlaneError> {
        self.record(ControlPlaneCall::DeleteUser(username.to_string()))
            .await;
        match self.users.lock().await.remove(username) {
            Some(_) => Ok(()),
            None => Err(ControlPlaneError::NotFound(username.to_string())),
        }
    }
}
