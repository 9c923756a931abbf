use std::collections::HashMap;
use std::rc::Rc;

use tracing::{info, warn};

use crate::models::{ContestantRecord, ContestantView, Principal};
use crate::services::photo::{self, DecodedImageData, PhotoBackend, PhotoHandle};
use crate::services::store::{self, IdentityProvider};

/// Contestant row with its owner's display name and the photo already decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedContestant {
    pub contestant_id: u64,
    pub principal: Principal,
    pub display_name: String,
    pub photo: Option<DecodedImageData>,
}

/// Looks up display names with one profile fetch per distinct principal.
/// A failed lookup falls back to the principal text.
pub async fn resolve_display_names(
    records: &[ContestantRecord],
    identity: &dyn IdentityProvider,
) -> HashMap<Principal, String> {
    let mut names: HashMap<Principal, String> = HashMap::new();
    for record in records {
        if names.contains_key(&record.principal) {
            continue;
        }
        let name = match store::fetch_profile(identity, &record.principal).await {
            Ok(profile) => profile.username,
            Err(err) => {
                warn!(
                    "Display name lookup for {} failed: {err}",
                    record.principal
                );
                record.principal.to_string()
            }
        };
        names.insert(record.principal.clone(), name);
    }
    info!(
        "Resolved {} display names for {} contestants",
        names.len(),
        records.len()
    );
    names
}

/// Decodes every photo on the blocking pool, in list order.
async fn decode_photos(
    payloads: Vec<Option<Vec<u8>>>,
    max_dimension: u32,
) -> Vec<Option<DecodedImageData>> {
    let count = payloads.len();
    let decoded = tokio::task::spawn_blocking(move || {
        payloads
            .iter()
            .map(|bytes| photo::decode_entry(bytes.as_deref(), max_dimension))
            .collect::<Vec<_>>()
    })
    .await;
    match decoded {
        Ok(decoded) => decoded,
        Err(err) => {
            warn!("Photo decoding task failed: {err}");
            std::iter::repeat_with(|| None).take(count).collect()
        }
    }
}

/// Runs inside the fetch task, so name lookups and decoding never touch the UI thread.
pub async fn resolve_contestants(
    mut records: Vec<ContestantRecord>,
    identity: &dyn IdentityProvider,
    max_dimension: u32,
) -> Vec<ResolvedContestant> {
    let names = resolve_display_names(&records, identity).await;
    let payloads = records.iter_mut().map(|record| record.photo.take()).collect();
    let photos = decode_photos(payloads, max_dimension).await;

    records
        .into_iter()
        .zip(photos)
        .map(|(record, photo)| {
            let display_name = names
                .get(&record.principal)
                .cloned()
                .unwrap_or_else(|| record.principal.to_string());
            ResolvedContestant {
                contestant_id: record.contestant_id,
                principal: record.principal,
                display_name,
                photo,
            }
        })
        .collect()
}

/// Builds the display entry. The returned view owns its photo handle.
pub fn project(resolved: ResolvedContestant, photos: &Rc<dyn PhotoBackend>) -> ContestantView {
    let photo = PhotoHandle::acquire(photos, resolved.photo.as_ref());

    ContestantView {
        contestant_id: resolved.contestant_id,
        principal: resolved.principal,
        display_name: resolved.display_name,
        photo,
    }
}

/// Handles created before a later entry is projected are owned by the partial
/// result, so they are released if projection unwinds.
pub fn project_all(
    resolved: Vec<ResolvedContestant>,
    photos: &Rc<dyn PhotoBackend>,
) -> Vec<ContestantView> {
    let mut views = Vec::with_capacity(resolved.len());
    for entry in resolved {
        views.push(project(entry, photos));
    }
    views
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::FetchError;
    use crate::models::UserProfile;
    use crate::services::photo::testing::{RecordingBackend, decoded, png};

    #[derive(Default)]
    struct CountingIdentity {
        lookups: Mutex<Vec<Principal>>,
    }

    #[async_trait]
    impl IdentityProvider for CountingIdentity {
        async fn get_principal(&self) -> Result<Principal, FetchError> {
            Ok(Principal::new("me"))
        }

        async fn get_user_data(
            &self,
            identity: &Principal,
        ) -> Result<Vec<UserProfile>, FetchError> {
            self.lookups.lock().unwrap().push(identity.clone());
            if identity.as_str() == "ghost" {
                return Ok(Vec::new());
            }
            Ok(vec![UserProfile {
                principal: identity.clone(),
                username: format!("@{}", identity),
                bio: None,
            }])
        }
    }

    fn record(id: u64, owner: &str, photo: Option<Vec<u8>>) -> ContestantRecord {
        ContestantRecord {
            contestant_id: id,
            principal: Principal::new(owner),
            competition_id: 7,
            photo,
        }
    }

    fn resolved(id: u64, owner: &str, photo: Option<DecodedImageData>) -> ResolvedContestant {
        ResolvedContestant {
            contestant_id: id,
            principal: Principal::new(owner),
            display_name: format!("@{owner}"),
            photo,
        }
    }

    #[tokio::test]
    async fn one_lookup_per_distinct_owner() {
        let identity = CountingIdentity::default();
        let records = vec![
            record(1, "alice", None),
            record(2, "bob", None),
            record(3, "alice", None),
        ];

        let resolved = resolve_contestants(records, &identity, 512).await;

        assert_eq!(identity.lookups.lock().unwrap().len(), 2);
        let names: Vec<&str> = resolved.iter().map(|r| r.display_name.as_str()).collect();
        assert_eq!(names, vec!["@alice", "@bob", "@alice"]);
    }

    #[tokio::test]
    async fn missing_profile_falls_back_to_principal() {
        let identity = CountingIdentity::default();
        let resolved = resolve_contestants(vec![record(1, "ghost", None)], &identity, 512).await;
        assert_eq!(resolved[0].display_name, "ghost");
    }

    #[tokio::test]
    async fn photos_are_decoded_before_projection() {
        let identity = CountingIdentity::default();
        let records = vec![
            record(1, "alice", Some(png(40, 20))),
            record(2, "bob", Some(Vec::new())),
            record(3, "carol", Some(vec![0xFF, 0xD8, 0x00])),
            record(4, "dave", None),
        ];

        let resolved = resolve_contestants(records, &identity, 10).await;

        let alice = resolved[0].photo.as_ref().expect("alice photo decoded");
        assert_eq!((alice.width, alice.height), (10, 5));
        assert!(resolved[1..].iter().all(|entry| entry.photo.is_none()));
        let ids: Vec<u64> = resolved.iter().map(|r| r.contestant_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn projection_creates_handles_only_for_decoded_photos() {
        let recorder = Rc::new(RecordingBackend::default());
        let photos: Rc<dyn PhotoBackend> = recorder.clone();
        let entries = vec![
            resolved(1, "alice", Some(decoded(3, 2))),
            resolved(2, "bob", None),
        ];

        let views = project_all(entries, &photos);

        assert_eq!(views.len(), 2);
        assert!(views[0].photo.is_some());
        assert!(views[1].photo.is_none());
        assert_eq!(views[0].display_name, "@alice");
        assert_eq!(*recorder.sizes.borrow(), vec![(3, 2)]);
        assert_eq!(recorder.live(), 1);

        drop(views);
        assert_eq!(recorder.live(), 0);
        assert_eq!(recorder.released.borrow().len(), 1);
    }
}
