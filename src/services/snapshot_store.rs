//! Store backed by a JSON snapshot of the backend's records.
//!
//! Rows are kept in their wire form and parsed strictly on every read, the same way
//! a remote reply would be. New entries live in memory only.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::FetchError;
use crate::models::{self, ContestKey, ContestRecord, ContestantRecord, Principal, UserProfile};
use crate::services::store::{ContestStore, ContestantStore, IdentityProvider};

#[derive(Debug, Default, Deserialize)]
struct Snapshot {
    #[serde(default)]
    competitions: Vec<serde_json::Value>,
    #[serde(default)]
    contestants: Vec<serde_json::Value>,
    #[serde(default)]
    users: Vec<serde_json::Value>,
}

pub struct SnapshotStore {
    principal: Principal,
    competitions: Vec<serde_json::Value>,
    contestants: RwLock<Vec<serde_json::Value>>,
    users: Vec<serde_json::Value>,
}

impl SnapshotStore {
    pub fn load(path: &Path, principal: Principal) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        Self::from_json(&raw, principal)
            .with_context(|| format!("Failed to parse snapshot {}", path.display()))
    }

    pub fn from_json(raw: &str, principal: Principal) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(raw)?;
        info!(
            "Loaded snapshot: {} competitions, {} contestants, {} users",
            snapshot.competitions.len(),
            snapshot.contestants.len(),
            snapshot.users.len()
        );
        Ok(Self {
            principal,
            competitions: snapshot.competitions,
            contestants: RwLock::new(snapshot.contestants),
            users: snapshot.users,
        })
    }

    fn competitions(&self) -> Result<Vec<ContestRecord>, FetchError> {
        self.competitions
            .iter()
            .map(|row| models::parse_row("competition", row.clone()))
            .collect()
    }
}

fn parse_contestants(rows: &[serde_json::Value]) -> Result<Vec<ContestantRecord>, FetchError> {
    rows.iter()
        .map(|row| models::parse_row("contestant", row.clone()))
        .collect()
}

#[async_trait]
impl ContestStore for SnapshotStore {
    async fn get_competition_by_id(
        &self,
        key: &ContestKey,
    ) -> Result<Vec<ContestRecord>, FetchError> {
        let Some(id) = key.id() else {
            warn!("Competition lookup with malformed id {key}");
            return Ok(Vec::new());
        };
        Ok(self
            .competitions()?
            .into_iter()
            .filter(|record| record.competition_id == id)
            .take(1)
            .collect())
    }
}

#[async_trait]
impl ContestantStore for SnapshotStore {
    async fn get_contestants_by_competition_id(
        &self,
        key: &ContestKey,
    ) -> Result<Vec<ContestantRecord>, FetchError> {
        let Some(id) = key.id() else {
            return Ok(Vec::new());
        };
        let rows = self.contestants.read().await;
        Ok(parse_contestants(&rows)?
            .into_iter()
            .filter(|record| record.competition_id == id)
            .collect())
    }

    async fn add_contestant(
        &self,
        identity: &Principal,
        key: &ContestKey,
        photo: Vec<u8>,
    ) -> Result<(), FetchError> {
        let id = key
            .id()
            .ok_or_else(|| FetchError::Remote(format!("invalid competition id {key}")))?;
        if !self
            .competitions()?
            .iter()
            .any(|record| record.competition_id == id)
        {
            return Err(FetchError::Remote(format!("competition {id} does not exist")));
        }

        let mut rows = self.contestants.write().await;
        let next_id = parse_contestants(&rows)?
            .iter()
            .map(|record| record.contestant_id)
            .max()
            .map_or(1, |max| max + 1);
        rows.push(json!({
            "contestant_id": next_id,
            "principal": identity,
            "competition_id": id,
            "photo": photo,
        }));
        info!("Added contestant {next_id} to competition {id} for {identity}");
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for SnapshotStore {
    async fn get_principal(&self) -> Result<Principal, FetchError> {
        Ok(self.principal.clone())
    }

    async fn get_user_data(&self, identity: &Principal) -> Result<Vec<UserProfile>, FetchError> {
        let mut profiles = Vec::new();
        for row in &self.users {
            let profile: UserProfile = models::parse_row("user", row.clone())?;
            if &profile.principal == identity {
                profiles.push(profile);
            }
        }
        Ok(profiles)
    }
}
