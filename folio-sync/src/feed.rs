//! Feeds bridge store subscriptions to display surfaces.
//!
//! Each feed owns one store subscription and a reducer task that folds
//! every incoming snapshot into a [`SyncState`] published through a
//! `watch` channel. Snapshots always replace the whole local state;
//! nothing is patched incrementally, so the local view can never
//! diverge from what the store last said.

use folio_model::{sort_projects, Profile, Project};
use folio_store::{
    profile_path, CollectionQuery, Direction, DocumentEvent, DocumentStore,
    QueryEvent, Subscription, PROJECTS_COLLECTION,
};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio::sync::watch;

use crate::state::SyncState;

fn run_reducer<E, T, F>(
    mut events: UnboundedReceiver<E>,
    mut reduce: F,
) -> watch::Receiver<SyncState<T>>
where
    E: Send + 'static,
    T: Clone + Send + Sync + 'static,
    F: FnMut(E) -> SyncState<T> + Send + 'static,
{
    let (state_tx, state_rx) = watch::channel(SyncState::Loading);
    tokio::spawn(async move {
        // Ends when the subscription is detached and the event sender
        // drops, so a closed feed leaves no task behind.
        while let Some(event) = events.recv().await {
            if state_tx.send(reduce(event)).is_err() {
                break;
            }
        }
    });
    state_rx
}

/// Live view of the profile singleton. A missing remote document shows
/// as the caller-supplied fallback, never as an empty record.
pub struct ProfileFeed {
    state: watch::Receiver<SyncState<Profile>>,
    subscription: Option<Subscription>,
}

impl ProfileFeed {
    pub fn spawn<S: DocumentStore>(store: &S, fallback: Profile) -> Self {
        let (events_tx, events_rx) = unbounded_channel();
        let subscription =
            store.subscribe_document(&profile_path(), events_tx);
        let state = run_reducer(events_rx, move |event: DocumentEvent| {
            match event {
                Ok(Some(doc)) => SyncState::Ready(Profile::reconcile(
                    &doc.fields,
                    &fallback,
                )),
                Ok(None) => SyncState::Ready(fallback.clone()),
                Err(err) => {
                    log::warn!("profile subscription error: {err}");
                    SyncState::Failed(err.to_string())
                }
            }
        });
        Self {
            state,
            subscription: Some(subscription),
        }
    }

    pub fn state(&self) -> SyncState<Profile> {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SyncState<Profile>> {
        self.state.clone()
    }

    /// Tear down: the store watcher is detached exactly once (also on
    /// drop) and no further state updates can occur.
    pub fn close(mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

impl Drop for ProfileFeed {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

/// Live, ranked view of the projects collection.
///
/// The store is asked for `createdAt` descending only; the full
/// three-key ranking (pinned, sort order, recency) is applied locally.
/// Keeping the comparator client-side is the deliberate pick between
/// the two equivalent strategies: it needs no composite index support
/// from the store and the ordering logic stays unit-testable.
pub struct ProjectFeed {
    state: watch::Receiver<SyncState<Vec<Project>>>,
    subscription: Option<Subscription>,
}

impl ProjectFeed {
    pub fn query() -> CollectionQuery {
        CollectionQuery::new(PROJECTS_COLLECTION)
            .order_by("createdAt", Direction::Descending)
    }

    pub fn spawn<S: DocumentStore>(store: &S) -> Self {
        let (events_tx, events_rx) = unbounded_channel();
        let subscription = store.subscribe_query(&Self::query(), events_tx);
        let state = run_reducer(events_rx, |event: QueryEvent| match event {
            Ok(docs) => {
                let mut projects: Vec<Project> = docs
                    .iter()
                    .map(|doc| {
                        Project::from_fields(doc.id.as_str(), &doc.fields)
                    })
                    .collect();
                sort_projects(&mut projects);
                SyncState::Ready(projects)
            }
            Err(err) => {
                log::warn!("projects subscription error: {err}");
                SyncState::Failed(err.to_string())
            }
        });
        Self {
            state,
            subscription: Some(subscription),
        }
    }

    pub fn state(&self) -> SyncState<Vec<Project>> {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SyncState<Vec<Project>>> {
        self.state.clone()
    }

    pub fn close(mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

impl Drop for ProjectFeed {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}
