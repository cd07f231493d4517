use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use folio_error::{FolioError, Result};
use serde_json::{Map, Value};
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::document::{
    compare_field, now_millis, CollectionQuery, Direction, DocId, DocPath,
    Document, FieldValue, WritePayload,
};
use crate::store::{DocumentEvent, DocumentStore, QueryEvent, Subscription};

/// In-memory reference implementation of [`DocumentStore`].
///
/// Backs tests and local development. Collections live in `BTreeMap`s
/// behind one mutex; every mutation pushes fresh snapshots to the
/// watchers registered against the affected collection. `set_fault`
/// makes the store misbehave on demand so error paths are testable.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    collections: BTreeMap<String, BTreeMap<String, Map<String, Value>>>,
    watchers: Vec<Watcher>,
    next_watcher_id: u64,
    fault: Option<String>,
}

enum Watcher {
    Document {
        id: u64,
        path: DocPath,
        events: UnboundedSender<DocumentEvent>,
    },
    Query {
        id: u64,
        query: CollectionQuery,
        events: UnboundedSender<QueryEvent>,
    },
}

impl Watcher {
    fn id(&self) -> u64 {
        match self {
            Watcher::Document { id, .. } | Watcher::Query { id, .. } => *id,
        }
    }
}

impl Inner {
    fn fault_error(&self) -> Option<FolioError> {
        self.fault
            .as_ref()
            .map(|message| FolioError::store("memory", message.clone()))
    }

    fn document_snapshot(&self, path: &DocPath) -> Option<Document> {
        self.collections
            .get(&path.collection)
            .and_then(|docs| docs.get(&path.doc))
            .map(|fields| Document {
                id: DocId::new(path.doc.clone()),
                fields: fields.clone(),
            })
    }

    fn query_snapshot(&self, query: &CollectionQuery) -> Vec<Document> {
        let mut docs: Vec<Document> = self
            .collections
            .get(&query.collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Document {
                        id: DocId::new(id.clone()),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        docs.sort_by(|a, b| {
            for clause in &query.order_by {
                let ordering = compare_field(
                    a.fields.get(&clause.field),
                    b.fields.get(&clause.field),
                );
                let ordering = match clause.direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                };
                if !ordering.is_eq() {
                    return ordering;
                }
            }
            a.id.cmp(&b.id)
        });
        docs
    }

    /// Push a fresh snapshot to every watcher of `collection`,
    /// dropping watchers whose receiving end is gone.
    fn notify_collection(&mut self, collection: &str) {
        let mut watchers = std::mem::take(&mut self.watchers);
        watchers.retain(|watcher| match watcher {
            Watcher::Document { path, events, .. }
                if path.collection == collection =>
            {
                events.send(Ok(self.document_snapshot(path))).is_ok()
            }
            Watcher::Query { query, events, .. }
                if query.collection == collection =>
            {
                events.send(Ok(self.query_snapshot(query))).is_ok()
            }
            _ => true,
        });
        self.watchers = watchers;
    }

    fn broadcast_fault(&mut self, message: &str) {
        self.watchers.retain(|watcher| match watcher {
            Watcher::Document { events, .. } => events
                .send(Err(FolioError::store("memory", message)))
                .is_ok(),
            Watcher::Query { events, .. } => events
                .send(Err(FolioError::store("memory", message)))
                .is_ok(),
        });
    }
}

fn apply_payload(
    fields: &mut Map<String, Value>,
    payload: WritePayload,
    now: i64,
) {
    for (key, value) in payload {
        let resolved = match value {
            FieldValue::Json(value) => value,
            FieldValue::ServerTimestamp => Value::from(now),
        };
        fields.insert(key, resolved);
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject (or clear) a fault. While set, every operation fails and
    /// every live watcher receives an error event, mimicking a
    /// permission denial or network outage.
    pub fn set_fault(&self, message: Option<&str>) {
        let mut inner = self.inner.lock().unwrap();
        inner.fault = message.map(str::to_owned);
        if let Some(message) = message.map(str::to_owned) {
            inner.broadcast_fault(&message);
        }
    }

    fn remove_watcher(inner: &Arc<Mutex<Inner>>, watcher_id: u64) {
        let mut inner = inner.lock().unwrap();
        inner.watchers.retain(|w| w.id() != watcher_id);
    }
}

impl DocumentStore for MemoryStore {
    async fn get_document(&self, path: &DocPath) -> Result<Option<Document>> {
        let inner = self.inner.lock().unwrap();
        if let Some(err) = inner.fault_error() {
            return Err(err);
        }
        Ok(inner.document_snapshot(path))
    }

    async fn set_document(
        &self,
        path: &DocPath,
        payload: WritePayload,
        merge: bool,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(err) = inner.fault_error() {
            return Err(err);
        }
        let now = now_millis();
        let docs = inner.collections.entry(path.collection.clone()).or_default();
        let mut fields = if merge {
            docs.get(&path.doc).cloned().unwrap_or_default()
        } else {
            Map::new()
        };
        apply_payload(&mut fields, payload, now);
        docs.insert(path.doc.clone(), fields);
        log::debug!("memory store: set {path}");
        inner.notify_collection(&path.collection);
        Ok(())
    }

    async fn update_document(
        &self,
        path: &DocPath,
        payload: WritePayload,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(err) = inner.fault_error() {
            return Err(err);
        }
        let now = now_millis();
        let fields = inner
            .collections
            .get_mut(&path.collection)
            .and_then(|docs| docs.get_mut(&path.doc))
            .ok_or_else(|| {
                FolioError::store(path.to_string(), "document does not exist")
            })?;
        apply_payload(fields, payload, now);
        log::debug!("memory store: update {path}");
        inner.notify_collection(&path.collection);
        Ok(())
    }

    async fn delete_document(&self, path: &DocPath) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(err) = inner.fault_error() {
            return Err(err);
        }
        let removed = inner
            .collections
            .get_mut(&path.collection)
            .and_then(|docs| docs.remove(&path.doc));
        if removed.is_some() {
            log::debug!("memory store: delete {path}");
            inner.notify_collection(&path.collection);
        }
        Ok(())
    }

    async fn add_document(
        &self,
        collection: &str,
        payload: WritePayload,
    ) -> Result<DocId> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(err) = inner.fault_error() {
            return Err(err);
        }
        let now = now_millis();
        let id = Uuid::new_v4().to_string();
        let mut fields = Map::new();
        apply_payload(&mut fields, payload, now);
        inner
            .collections
            .entry(collection.to_owned())
            .or_default()
            .insert(id.clone(), fields);
        log::debug!("memory store: add {collection}/{id}");
        inner.notify_collection(collection);
        Ok(DocId::new(id))
    }

    async fn query_collection(
        &self,
        query: &CollectionQuery,
    ) -> Result<Vec<Document>> {
        let inner = self.inner.lock().unwrap();
        if let Some(err) = inner.fault_error() {
            return Err(err);
        }
        Ok(inner.query_snapshot(query))
    }

    fn subscribe_document(
        &self,
        path: &DocPath,
        events: UnboundedSender<DocumentEvent>,
    ) -> Subscription {
        let mut inner = self.inner.lock().unwrap();
        let initial = match inner.fault_error() {
            Some(err) => Err(err),
            None => Ok(inner.document_snapshot(path)),
        };
        // A dead receiver still gets a watcher entry; it is dropped on
        // the first notification attempt.
        let _ = events.send(initial);
        let id = inner.next_watcher_id;
        inner.next_watcher_id += 1;
        inner.watchers.push(Watcher::Document {
            id,
            path: path.clone(),
            events,
        });
        let handle = self.inner.clone();
        Subscription::new(move || Self::remove_watcher(&handle, id))
    }

    fn subscribe_query(
        &self,
        query: &CollectionQuery,
        events: UnboundedSender<QueryEvent>,
    ) -> Subscription {
        let mut inner = self.inner.lock().unwrap();
        let initial = match inner.fault_error() {
            Some(err) => Err(err),
            None => Ok(inner.query_snapshot(query)),
        };
        let _ = events.send(initial);
        let id = inner.next_watcher_id;
        inner.next_watcher_id += 1;
        inner.watchers.push(Watcher::Query {
            id,
            query: query.clone(),
            events,
        });
        let handle = self.inner.clone();
        Subscription::new(move || Self::remove_watcher(&handle, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Direction;
    use serde_json::json;
    use tokio::sync::mpsc::unbounded_channel;

    fn payload(pairs: &[(&str, Value)]) -> WritePayload {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), FieldValue::Json(v.clone())))
            .collect()
    }

    #[tokio::test]
    async fn test_set_then_get_document() {
        let store = MemoryStore::new();
        let path = DocPath::new("site", "profile");
        store
            .set_document(&path, payload(&[("name", json!("Ada"))]), true)
            .await
            .unwrap();
        let doc = store.get_document(&path).await.unwrap().unwrap();
        assert_eq!(doc.fields["name"], json!("Ada"));
    }

    #[tokio::test]
    async fn test_set_with_merge_keeps_existing_fields() {
        let store = MemoryStore::new();
        let path = DocPath::new("site", "profile");
        store
            .set_document(&path, payload(&[("name", json!("Ada"))]), true)
            .await
            .unwrap();
        store
            .set_document(&path, payload(&[("role", json!("Engineer"))]), true)
            .await
            .unwrap();
        let doc = store.get_document(&path).await.unwrap().unwrap();
        assert_eq!(doc.fields["name"], json!("Ada"));
        assert_eq!(doc.fields["role"], json!("Engineer"));
    }

    #[tokio::test]
    async fn test_set_without_merge_replaces_document() {
        let store = MemoryStore::new();
        let path = DocPath::new("site", "profile");
        store
            .set_document(&path, payload(&[("name", json!("Ada"))]), false)
            .await
            .unwrap();
        store
            .set_document(&path, payload(&[("role", json!("Engineer"))]), false)
            .await
            .unwrap();
        let doc = store.get_document(&path).await.unwrap().unwrap();
        assert!(doc.fields.get("name").is_none());
    }

    #[tokio::test]
    async fn test_update_missing_document_errors() {
        let store = MemoryStore::new();
        let path = DocPath::new("projects", "nope");
        let result = store
            .update_document(&path, payload(&[("title", json!("x"))]))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_server_timestamp_is_resolved_by_store() {
        let store = MemoryStore::new();
        let mut fields = WritePayload::new();
        fields.insert("createdAt".to_owned(), FieldValue::ServerTimestamp);
        let id = store.add_document("projects", fields).await.unwrap();
        let doc = store
            .get_document(&DocPath::project(&id))
            .await
            .unwrap()
            .unwrap();
        assert!(doc.fields["createdAt"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_add_assigns_distinct_ids() {
        let store = MemoryStore::new();
        let a = store
            .add_document("projects", WritePayload::new())
            .await
            .unwrap();
        let b = store
            .add_document("projects", WritePayload::new())
            .await
            .unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_query_orders_by_clause_descending() {
        let store = MemoryStore::new();
        for year in [2021, 2023, 2022] {
            store
                .add_document("projects", payload(&[("year", json!(year))]))
                .await
                .unwrap();
        }
        let query = CollectionQuery::new("projects")
            .order_by("year", Direction::Descending);
        let docs = store.query_collection(&query).await.unwrap();
        let years: Vec<_> = docs
            .iter()
            .map(|d| d.fields["year"].as_i64().unwrap())
            .collect();
        assert_eq!(years, vec![2023, 2022, 2021]);
    }

    #[tokio::test]
    async fn test_subscription_receives_initial_and_updates() {
        let store = MemoryStore::new();
        let path = DocPath::new("site", "profile");
        let (tx, mut rx) = unbounded_channel();
        let _sub = store.subscribe_document(&path, tx);

        // Initial snapshot: document missing.
        assert!(rx.recv().await.unwrap().unwrap().is_none());

        store
            .set_document(&path, payload(&[("name", json!("Ada"))]), true)
            .await
            .unwrap();
        let doc = rx.recv().await.unwrap().unwrap().unwrap();
        assert_eq!(doc.fields["name"], json!("Ada"));
    }

    #[tokio::test]
    async fn test_unsubscribed_watcher_gets_no_late_notifications() {
        let store = MemoryStore::new();
        let path = DocPath::new("site", "profile");
        let (tx, mut rx) = unbounded_channel();
        let sub = store.subscribe_document(&path, tx);
        assert!(rx.recv().await.unwrap().is_ok());

        sub.unsubscribe();
        store
            .set_document(&path, payload(&[("name", json!("late"))]), true)
            .await
            .unwrap();
        // Channel is empty and closed: the sender side was dropped when
        // the watcher was detached.
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_fault_surfaces_as_error_event_and_failed_ops() {
        let store = MemoryStore::new();
        let (tx, mut rx) = unbounded_channel();
        let _sub = store.subscribe_query(
            &CollectionQuery::new("projects"),
            tx,
        );
        assert!(rx.recv().await.unwrap().is_ok());

        store.set_fault(Some("permission denied"));
        assert!(rx.recv().await.unwrap().is_err());
        assert!(store
            .add_document("projects", WritePayload::new())
            .await
            .is_err());

        store.set_fault(None);
        assert!(store
            .add_document("projects", WritePayload::new())
            .await
            .is_ok());
    }
}
