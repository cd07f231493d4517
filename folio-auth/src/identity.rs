use std::sync::{Arc, Mutex};

use folio_error::{FolioError, Result};
use folio_store::Subscription;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

/// The signed-in user as the identity provider reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
}

impl Identity {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
        }
    }
}

/// `None` means signed out.
pub type IdentityEvent = Option<Identity>;

/// The identity provider seam. The interactive popup sign-in of a real
/// deployment lives behind this trait; the crate only needs the current
/// identity and a change subscription.
#[allow(async_fn_in_trait)]
pub trait IdentityProvider: Send + Sync {
    fn current_identity(&self) -> Option<Identity>;

    async fn sign_in(&self) -> Result<Identity>;

    async fn sign_out(&self) -> Result<()>;

    /// Observe sign-in-state changes. The current state is delivered
    /// immediately, like a store snapshot subscription.
    fn subscribe(&self, events: UnboundedSender<IdentityEvent>) -> Subscription;
}

/// In-memory provider for tests and local development: `sign_in`
/// "completes the popup" with the account configured at construction.
#[derive(Clone, Default)]
pub struct MemoryIdentityProvider {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    account: Option<Identity>,
    current: Option<Identity>,
    watchers: Vec<(u64, UnboundedSender<IdentityEvent>)>,
    next_watcher_id: u64,
}

impl Inner {
    fn notify(&mut self) {
        let current = self.current.clone();
        self.watchers
            .retain(|(_, events)| events.send(current.clone()).is_ok());
    }
}

impl MemoryIdentityProvider {
    pub fn new(account: Option<Identity>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                account,
                ..Inner::default()
            })),
        }
    }

    /// Swap the account the next `sign_in` resolves to.
    pub fn set_account(&self, account: Option<Identity>) {
        self.inner.lock().unwrap().account = account;
    }
}

impl IdentityProvider for MemoryIdentityProvider {
    fn current_identity(&self) -> Option<Identity> {
        self.inner.lock().unwrap().current.clone()
    }

    async fn sign_in(&self) -> Result<Identity> {
        let mut inner = self.inner.lock().unwrap();
        let identity = inner.account.clone().ok_or_else(|| {
            FolioError::store("identity", "no account available for sign-in")
        })?;
        log::debug!("signed in as {}", identity.email);
        inner.current = Some(identity.clone());
        inner.notify();
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.current = None;
        inner.notify();
        Ok(())
    }

    fn subscribe(&self, events: UnboundedSender<IdentityEvent>) -> Subscription {
        let mut inner = self.inner.lock().unwrap();
        let _ = events.send(inner.current.clone());
        let id = inner.next_watcher_id;
        inner.next_watcher_id += 1;
        inner.watchers.push((id, events));
        let handle = self.inner.clone();
        Subscription::new(move || {
            handle.lock().unwrap().watchers.retain(|(w, _)| *w != id);
        })
    }
}
