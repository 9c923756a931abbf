//! Boundary to the remote record stores and the identity provider.
//!
//! The stores answer lookups with a list of zero or one rows; the helpers here turn
//! that convention into an explicit `NotFound`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::models::{ContestKey, ContestRecord, ContestantRecord, Principal, UserProfile};

#[async_trait]
pub trait ContestStore: Send + Sync {
    async fn get_competition_by_id(&self, key: &ContestKey)
    -> Result<Vec<ContestRecord>, FetchError>;
}

#[async_trait]
pub trait ContestantStore: Send + Sync {
    async fn get_contestants_by_competition_id(
        &self,
        key: &ContestKey,
    ) -> Result<Vec<ContestantRecord>, FetchError>;

    /// One remote mutation per call.
    async fn add_contestant(
        &self,
        identity: &Principal,
        key: &ContestKey,
        photo: Vec<u8>,
    ) -> Result<(), FetchError>;
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn get_principal(&self) -> Result<Principal, FetchError>;

    async fn get_user_data(&self, identity: &Principal) -> Result<Vec<UserProfile>, FetchError>;
}

/// The three collaborators a contest page talks to.
#[derive(Clone)]
pub struct Services {
    pub contests: Arc<dyn ContestStore>,
    pub contestants: Arc<dyn ContestantStore>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl Services {
    /// Uses one backend for all three roles.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: ContestStore + ContestantStore + IdentityProvider + 'static,
    {
        Self {
            contests: backend.clone(),
            contestants: backend.clone(),
            identity: backend,
        }
    }
}

pub fn first_or_not_found<T>(rows: Vec<T>, what: impl Into<String>) -> Result<T, FetchError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| FetchError::NotFound(what.into()))
}

pub async fn fetch_contest(
    store: &dyn ContestStore,
    key: &ContestKey,
) -> Result<ContestRecord, FetchError> {
    let rows = store.get_competition_by_id(key).await?;
    first_or_not_found(rows, format!("contest {key}"))
}

pub async fn fetch_profile(
    identity: &dyn IdentityProvider,
    principal: &Principal,
) -> Result<UserProfile, FetchError> {
    let rows = identity.get_user_data(principal).await?;
    first_or_not_found(rows, format!("profile for {principal}"))
}
