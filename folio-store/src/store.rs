use folio_error::Result;
use tokio::sync::mpsc::UnboundedSender;

use crate::document::{
    CollectionQuery, DocId, DocPath, Document, WritePayload,
};

/// One change notification for a single-document subscription.
/// `Ok(None)` means the document does not exist (distinct from an error).
pub type DocumentEvent = Result<Option<Document>>;

/// One change notification for a collection subscription: the complete
/// result set, never an incremental patch.
pub type QueryEvent = Result<Vec<Document>>;

/// Detaches a store watcher. The detach runs exactly once, either on an
/// explicit [`Subscription::unsubscribe`] call or when the handle drops.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

/// The remote document store: per-document reads and writes, collection
/// queries, and snapshot subscriptions.
///
/// Writes accept [`WritePayload`] maps so server-assigned timestamps can
/// be expressed as a sentinel instead of a client clock reading.
/// Subscriptions push events through a caller-supplied channel and keep
/// doing so until the returned [`Subscription`] detaches them.
#[allow(async_fn_in_trait)]
pub trait DocumentStore: Send + Sync {
    async fn get_document(&self, path: &DocPath) -> Result<Option<Document>>;

    /// Upsert. With `merge` set, fields are merged into an existing
    /// document; otherwise the document is replaced wholesale.
    async fn set_document(
        &self,
        path: &DocPath,
        payload: WritePayload,
        merge: bool,
    ) -> Result<()>;

    /// Update an existing document in place. Erring when the document
    /// does not exist keeps `createdAt` from ever being re-stamped.
    async fn update_document(
        &self,
        path: &DocPath,
        payload: WritePayload,
    ) -> Result<()>;

    async fn delete_document(&self, path: &DocPath) -> Result<()>;

    /// Create a document with a store-assigned id.
    async fn add_document(
        &self,
        collection: &str,
        payload: WritePayload,
    ) -> Result<DocId>;

    async fn query_collection(
        &self,
        query: &CollectionQuery,
    ) -> Result<Vec<Document>>;

    /// Subscribe to one document. The current snapshot is delivered
    /// immediately, then again after every affecting mutation.
    fn subscribe_document(
        &self,
        path: &DocPath,
        events: UnboundedSender<DocumentEvent>,
    ) -> Subscription;

    /// Subscribe to a collection query, with the same snapshot semantics.
    fn subscribe_query(
        &self,
        query: &CollectionQuery,
        events: UnboundedSender<QueryEvent>,
    ) -> Subscription;
}
