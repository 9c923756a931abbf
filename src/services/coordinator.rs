//! Joins the contest, identity/profile and contestant-list reads into one page state.
//!
//! Fetches run as tasks on the async runtime and report back through a channel. The
//! page drains that channel on the UI side, so only the page itself mutates its state.
//! Every result is tagged with the generation it was issued for and is dropped when the
//! page has since been refreshed or unmounted.

use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

use crate::error::FetchError;
use crate::models::{ContestKey, ContestRecord, ContestView, ContestantView, Principal, UserProfile};
use crate::services::normalizer::{Clock, Normalizer, SystemClock};
use crate::services::photo::{DEFAULT_MAX_PHOTO_DIMENSION, PhotoBackend};
use crate::services::projector::{self, ResolvedContestant};
use crate::services::store::{self, Services};

pub const NO_CONTESTANTS: &str = "No contestants available";

#[derive(Debug)]
pub enum SourceState<T> {
    Pending,
    Resolved(T),
    Failed(FetchError),
}

impl<T> SourceState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, SourceState::Pending)
    }

    pub fn resolved(&self) -> Option<&T> {
        match self {
            SourceState::Resolved(value) => Some(value),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&FetchError> {
        match self {
            SourceState::Failed(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug)]
enum PageEvent {
    Contest(Result<ContestRecord, FetchError>),
    Principal(Result<Principal, FetchError>),
    Profile(Result<UserProfile, FetchError>),
    Contestants(Result<Vec<ResolvedContestant>, FetchError>),
}

/// Shared flag telling in-flight fetches whether the page still exists.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_live(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn end(&self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Clone)]
struct EventSender {
    tx: UnboundedSender<(u64, PageEvent)>,
    liveness: Liveness,
    generation: u64,
}

impl EventSender {
    fn deliver(&self, event: PageEvent) {
        if !self.liveness.is_live() {
            debug!("Page discarded, dropping late result {:?}", event_name(&event));
            return;
        }
        let _ = self.tx.send((self.generation, event));
    }
}

fn event_name(event: &PageEvent) -> &'static str {
    match event {
        PageEvent::Contest(_) => "contest",
        PageEvent::Principal(_) => "principal",
        PageEvent::Profile(_) => "profile",
        PageEvent::Contestants(_) => "contestants",
    }
}

pub enum PageView<'a> {
    Loading,
    Ready(ReadyView<'a>),
}

pub struct ReadyView<'a> {
    /// `None` when the contest could not be fetched.
    pub contest: Option<ContestView>,
    pub profile: &'a UserProfile,
    pub contestants: ContestantsPane<'a>,
}

pub enum ContestantsPane<'a> {
    /// Shown while the list is pending, failed or empty.
    Placeholder,
    Entries(&'a [ContestantView]),
}

pub struct ContestPage {
    key: ContestKey,
    services: Services,
    runtime: Handle,
    normalizer: Normalizer,
    clock: Arc<dyn Clock>,
    photos: Rc<dyn PhotoBackend>,
    max_photo_dimension: u32,
    liveness: Liveness,
    generation: u64,
    contest_attempted: bool,
    identity_attempted: bool,
    tx: UnboundedSender<(u64, PageEvent)>,
    rx: UnboundedReceiver<(u64, PageEvent)>,
    contest: SourceState<ContestRecord>,
    principal: SourceState<Principal>,
    profile: SourceState<UserProfile>,
    contestants: SourceState<Vec<ContestantView>>,
}

impl ContestPage {
    pub fn new(
        key: ContestKey,
        services: Services,
        runtime: Handle,
        photos: Rc<dyn PhotoBackend>,
        normalizer: Normalizer,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            key,
            services,
            runtime,
            normalizer,
            clock: Arc::new(SystemClock),
            photos,
            max_photo_dimension: DEFAULT_MAX_PHOTO_DIMENSION,
            liveness: Liveness::new(),
            generation: 0,
            contest_attempted: false,
            identity_attempted: false,
            tx,
            rx,
            contest: SourceState::Pending,
            principal: SourceState::Pending,
            profile: SourceState::Pending,
            contestants: SourceState::Pending,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_max_photo_dimension(mut self, max_dimension: u32) -> Self {
        self.max_photo_dimension = max_dimension;
        self
    }

    pub fn contest_key(&self) -> &ContestKey {
        &self.key
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.resolved()
    }

    pub fn is_live(&self) -> bool {
        self.liveness.is_live()
    }

    pub fn contest_failure(&self) -> Option<&FetchError> {
        self.contest.failure()
    }

    /// Issues every fetch that has not been attempted yet for the current contest.
    /// Calling it again is a no-op, whether the earlier attempts succeeded or not.
    pub fn mount(&mut self) {
        if !self.liveness.is_live() {
            warn!("mount called on a discarded page for contest {}", self.key);
            return;
        }
        if !self.contest_attempted {
            self.contest_attempted = true;
            self.spawn_contest_fetch();
        }
        if !self.identity_attempted {
            self.identity_attempted = true;
            self.spawn_identity_chain();
        }
    }

    /// Drops everything fetched so far and queries all three sources again.
    pub fn refresh(&mut self) {
        if !self.liveness.is_live() {
            return;
        }
        self.generation += 1;
        info!(
            "Refreshing contest {} (generation {})",
            self.key, self.generation
        );
        self.contest_attempted = false;
        self.identity_attempted = false;
        self.contest = SourceState::Pending;
        self.principal = SourceState::Pending;
        self.profile = SourceState::Pending;
        self.contestants = SourceState::Pending;
        self.mount();
    }

    /// Points the page at another contest. Same key keeps the current state.
    pub fn retarget(&mut self, key: ContestKey) {
        if key == self.key {
            return;
        }
        info!("Switching contest {} -> {}", self.key, key);
        self.key = key;
        self.refresh();
    }

    /// Marks the page discarded. Photo handles are released and later results ignored.
    pub fn unmount(&mut self) {
        if !self.liveness.is_live() {
            return;
        }
        self.liveness.end();
        self.contestants = SourceState::Pending;
        info!("Contest page {} unmounted", self.key);
    }

    /// Applies every result that has already arrived. Returns how many were applied.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Ok((generation, event)) = self.rx.try_recv() {
            if self.apply(generation, event) {
                applied += 1;
            }
        }
        applied
    }

    /// Waits for the next result and applies it.
    #[cfg(test)]
    async fn pump(&mut self) -> bool {
        match self.rx.recv().await {
            Some((generation, event)) => self.apply(generation, event),
            None => false,
        }
    }

    /// The page is loading until the contest has an outcome and the profile has resolved.
    /// A failed profile keeps it loading; the contestant list never does.
    pub fn is_loading(&self) -> bool {
        self.contest.is_pending() || self.profile.resolved().is_none()
    }

    pub fn has_pending_sources(&self) -> bool {
        self.contest.is_pending()
            || self.principal.is_pending()
            || self.profile.is_pending()
            || self.contestants.is_pending()
    }

    pub fn view(&self) -> PageView<'_> {
        self.view_at(self.clock.now())
    }

    /// Status and deadline are classified against `now` on every call.
    pub fn view_at(&self, now: DateTime<Utc>) -> PageView<'_> {
        let Some(profile) = self.profile.resolved() else {
            return PageView::Loading;
        };
        if self.contest.is_pending() {
            return PageView::Loading;
        }

        let contest = self
            .contest
            .resolved()
            .map(|raw| self.normalizer.normalize_at(raw, now));
        let contestants = match &self.contestants {
            SourceState::Resolved(entries) if !entries.is_empty() => {
                ContestantsPane::Entries(entries.as_slice())
            }
            _ => ContestantsPane::Placeholder,
        };

        PageView::Ready(ReadyView {
            contest,
            profile,
            contestants,
        })
    }

    fn sender(&self) -> EventSender {
        EventSender {
            tx: self.tx.clone(),
            liveness: self.liveness.clone(),
            generation: self.generation,
        }
    }

    fn spawn_contest_fetch(&self) {
        let contests = Arc::clone(&self.services.contests);
        let key = self.key.clone();
        let sender = self.sender();
        debug!("Fetching contest {}", key);
        self.runtime.spawn(async move {
            let result = store::fetch_contest(contests.as_ref(), &key).await;
            sender.deliver(PageEvent::Contest(result));
        });
    }

    fn spawn_identity_chain(&self) {
        let services = self.services.clone();
        let key = self.key.clone();
        let sender = self.sender();
        let max_dimension = self.max_photo_dimension;
        self.runtime.spawn(async move {
            let principal = services.identity.get_principal().await;
            sender.deliver(PageEvent::Principal(principal.clone()));

            match principal {
                Ok(principal) => {
                    let identity = Arc::clone(&services.identity);
                    let profile_sender = sender.clone();
                    tokio::spawn(async move {
                        let result = store::fetch_profile(identity.as_ref(), &principal).await;
                        profile_sender.deliver(PageEvent::Profile(result));
                    });
                }
                Err(err) => sender.deliver(PageEvent::Profile(Err(err))),
            }

            tokio::spawn(async move {
                let result = match services
                    .contestants
                    .get_contestants_by_competition_id(&key)
                    .await
                {
                    Ok(records) => Ok(projector::resolve_contestants(
                        records,
                        services.identity.as_ref(),
                        max_dimension,
                    )
                    .await),
                    Err(err) => Err(err),
                };
                sender.deliver(PageEvent::Contestants(result));
            });
        });
    }

    fn apply(&mut self, generation: u64, event: PageEvent) -> bool {
        if !self.liveness.is_live() {
            debug!(
                "Ignoring {} result for discarded page {}",
                event_name(&event),
                self.key
            );
            return false;
        }
        if generation != self.generation {
            debug!(
                "Ignoring stale {} result (generation {generation}, current {})",
                event_name(&event),
                self.generation
            );
            return false;
        }

        match event {
            PageEvent::Contest(Ok(record)) => {
                info!("Contest {} resolved: {}", self.key, record.name);
                self.contest = SourceState::Resolved(record);
            }
            PageEvent::Contest(Err(err)) => {
                error!("Error fetching contest {}: {err}", self.key);
                self.contest = SourceState::Failed(err);
            }
            PageEvent::Principal(Ok(principal)) => {
                info!("Signed in as {principal}");
                self.principal = SourceState::Resolved(principal);
            }
            PageEvent::Principal(Err(err)) => {
                error!("Error resolving identity: {err}");
                self.principal = SourceState::Failed(err);
            }
            PageEvent::Profile(Ok(profile)) => {
                info!("Profile resolved for {}", profile.username);
                self.profile = SourceState::Resolved(profile);
            }
            PageEvent::Profile(Err(err)) => {
                error!("Error fetching profile: {err}");
                self.profile = SourceState::Failed(err);
            }
            PageEvent::Contestants(Ok(resolved)) => {
                info!(
                    "Contest {} has {} contestants",
                    self.key,
                    resolved.len()
                );
                self.contestants =
                    SourceState::Resolved(projector::project_all(resolved, &self.photos));
            }
            PageEvent::Contestants(Err(err)) => {
                error!("Error fetching contestants for {}: {err}", self.key);
                self.contestants = SourceState::Failed(err);
            }
        }
        true
    }
}

impl Drop for ContestPage {
    fn drop(&mut self) {
        self.unmount();
    }
}
