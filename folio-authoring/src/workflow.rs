use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use folio_auth::{AccessGate, IdentityProvider};
use folio_error::{FolioError, Result};
use folio_store::{
    avatar_image_path, now_millis, profile_path, project_image_path, DocId,
    DocPath, DocumentStore, FieldValue, ObjectStorage, WritePayload,
    PROJECTS_COLLECTION,
};
use tokio::sync::mpsc::unbounded_channel;

use crate::draft::{ProfileDraft, ProjectDraft};

/// A file picked in the edit form, ready to upload.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl ImageAttachment {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    fn extension(&self) -> &str {
        self.filename
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .unwrap_or("img")
    }
}

/// Clears the busy flag on every exit path, including early returns on
/// upload or write failure.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| FolioError::Busy)?;
        Ok(Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The authoring workflow behind the admin console.
///
/// Every mutation re-checks the access gate at call time and runs under
/// an advisory busy flag. Image uploads strictly precede document
/// writes, so a record can never reference an unresolvable image.
pub struct Authoring<S, O, P> {
    store: Arc<S>,
    objects: Arc<O>,
    gate: AccessGate<P>,
    busy: AtomicBool,
    editing: Mutex<Option<DocId>>,
}

impl<S, O, P> Authoring<S, O, P>
where
    S: DocumentStore,
    O: ObjectStorage,
    P: IdentityProvider,
{
    pub fn new(store: Arc<S>, objects: Arc<O>, gate: AccessGate<P>) -> Self {
        Self {
            store,
            objects,
            gate,
            busy: AtomicBool::new(false),
            editing: Mutex::new(None),
        }
    }

    /// Caller-visible duplicate-submission guard. Advisory: it does not
    /// serialize two separate admin sessions.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Mark a record as the current edit target; the next submit
    /// updates it in place instead of creating a new record.
    pub fn begin_edit(&self, id: DocId) {
        *self.editing.lock().unwrap() = Some(id);
    }

    pub fn cancel_edit(&self) {
        *self.editing.lock().unwrap() = None;
    }

    pub fn editing(&self) -> Option<DocId> {
        self.editing.lock().unwrap().clone()
    }

    fn check_gate(&self) -> Result<()> {
        if self.gate.allows() {
            Ok(())
        } else {
            Err(FolioError::Unauthorized)
        }
    }

    /// Create or update a project from a draft.
    ///
    /// `existing` selects update-in-place (preserving `createdAt`);
    /// otherwise a new record is created and `createdAt` stamped once.
    /// An attached image is uploaded first and the submit aborts before
    /// any document write when the upload fails.
    pub async fn submit_project(
        &self,
        draft: &ProjectDraft,
        existing: Option<&DocId>,
        image: Option<ImageAttachment>,
    ) -> Result<()> {
        self.check_gate()?;
        let _busy = BusyGuard::acquire(&self.busy)?;

        let image_url = match image {
            Some(attachment) => {
                let path =
                    project_image_path(now_millis(), &attachment.filename);
                let (progress_tx, mut progress_rx) = unbounded_channel();
                let url = self
                    .objects
                    .upload_resumable(&path, attachment.bytes, progress_tx)
                    .await?;
                while let Ok(event) = progress_rx.try_recv() {
                    log::debug!(
                        "upload {path}: {}/{} bytes",
                        event.transferred,
                        event.total
                    );
                }
                url.to_string()
            }
            None => draft.image_url.trim().to_owned(),
        };

        let payload = draft.normalize(&image_url);
        match existing {
            Some(id) => {
                self.store
                    .update_document(&DocPath::project(id), payload)
                    .await?;
                log::info!("updated project {id}");
            }
            None => {
                let mut payload = payload;
                payload.insert(
                    "createdAt".to_owned(),
                    FieldValue::ServerTimestamp,
                );
                let id = self
                    .store
                    .add_document(PROJECTS_COLLECTION, payload)
                    .await?;
                log::info!("created project {id}");
            }
        }

        // The next sync snapshot carries the canonical record; no echo
        // read here.
        self.cancel_edit();
        Ok(())
    }

    /// Merge-upsert the profile singleton, uploading a new avatar first
    /// when one is attached.
    pub async fn save_profile(
        &self,
        draft: &ProfileDraft,
        avatar: Option<ImageAttachment>,
    ) -> Result<()> {
        self.check_gate()?;
        let _busy = BusyGuard::acquire(&self.busy)?;

        let avatar_url = match avatar {
            Some(attachment) => {
                let path = avatar_image_path(
                    now_millis(),
                    attachment.extension(),
                );
                let url =
                    self.objects.upload(&path, attachment.bytes).await?;
                url.to_string()
            }
            None => draft.avatar_url.trim().to_owned(),
        };

        let payload: WritePayload = draft.normalize(&avatar_url);
        self.store
            .set_document(&profile_path(), payload, true)
            .await?;
        log::info!("profile saved");
        Ok(())
    }

    /// Destroy a project. The confirmation step lives in the UI; by the
    /// time this runs the decision is final.
    pub async fn delete_project(&self, id: &DocId) -> Result<()> {
        self.check_gate()?;
        let _busy = BusyGuard::acquire(&self.busy)?;

        self.store.delete_document(&DocPath::project(id)).await?;
        log::info!("deleted project {id}");
        if self.editing().as_ref() == Some(id) {
            self.cancel_edit();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_auth::{Identity, MemoryIdentityProvider};
    use folio_model::Project;
    use folio_store::{CollectionQuery, MemoryObjectStorage, MemoryStore};

    async fn authoring_as_admin() -> (
        Arc<MemoryStore>,
        Arc<MemoryObjectStorage>,
        Arc<MemoryIdentityProvider>,
        Authoring<MemoryStore, MemoryObjectStorage, MemoryIdentityProvider>,
    ) {
        let store = Arc::new(MemoryStore::new());
        let objects = Arc::new(MemoryObjectStorage::new());
        let provider = Arc::new(MemoryIdentityProvider::new(Some(
            Identity::new("admin@site.dev"),
        )));
        provider.sign_in().await.unwrap();
        let gate = AccessGate::new(
            provider.clone(),
            Some("Admin@Site.dev".to_owned()),
        );
        let authoring =
            Authoring::new(store.clone(), objects.clone(), gate);
        (store, objects, provider, authoring)
    }

    async fn stored_projects(store: &MemoryStore) -> Vec<Project> {
        store
            .query_collection(&CollectionQuery::new(PROJECTS_COLLECTION))
            .await
            .unwrap()
            .iter()
            .map(|doc| Project::from_fields(doc.id.as_str(), &doc.fields))
            .collect()
    }

    #[tokio::test]
    async fn test_create_then_update_preserves_created_at() {
        let (store, _objects, _provider, authoring) =
            authoring_as_admin().await;
        let draft = ProjectDraft {
            title: "Folio".to_owned(),
            ..ProjectDraft::default()
        };
        authoring.submit_project(&draft, None, None).await.unwrap();

        let created = stored_projects(&store).await.remove(0);
        assert!(created.created_at > 0);

        let id = DocId::new(created.id.clone());
        let update = ProjectDraft {
            title: "Folio v2".to_owned(),
            ..ProjectDraft::default()
        };
        authoring
            .submit_project(&update, Some(&id), None)
            .await
            .unwrap();

        let updated = stored_projects(&store).await.remove(0);
        assert_eq!(updated.title, "Folio v2");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_whitespace_title_persists_untitled() {
        let (store, _objects, _provider, authoring) =
            authoring_as_admin().await;
        let draft = ProjectDraft {
            title: "  ".to_owned(),
            ..ProjectDraft::default()
        };
        authoring.submit_project(&draft, None, None).await.unwrap();
        assert_eq!(stored_projects(&store).await[0].title, "Untitled");
    }

    #[tokio::test]
    async fn test_unauthorized_submit_touches_nothing() {
        let (store, objects, provider, authoring) =
            authoring_as_admin().await;
        provider.sign_out().await.unwrap();

        let result = authoring
            .submit_project(
                &ProjectDraft::default(),
                None,
                Some(ImageAttachment::new("shot.png", vec![1])),
            )
            .await;
        assert!(matches!(result, Err(FolioError::Unauthorized)));
        assert!(stored_projects(&store).await.is_empty());
        assert_eq!(objects.object_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_upload_aborts_before_any_write() {
        let (store, objects, _provider, authoring) =
            authoring_as_admin().await;
        objects.set_fail_uploads(true);

        let result = authoring
            .submit_project(
                &ProjectDraft::default(),
                None,
                Some(ImageAttachment::new("shot.png", vec![1, 2, 3])),
            )
            .await;
        assert!(matches!(result, Err(FolioError::Upload(_))));
        assert!(stored_projects(&store).await.is_empty());
        // Failure path released the busy flag.
        assert!(!authoring.is_busy());
    }

    #[tokio::test]
    async fn test_uploaded_image_url_lands_in_record() {
        let (store, objects, _provider, authoring) =
            authoring_as_admin().await;
        authoring
            .submit_project(
                &ProjectDraft::default(),
                None,
                Some(ImageAttachment::new("shot.png", vec![9; 16])),
            )
            .await
            .unwrap();
        let project = stored_projects(&store).await.remove(0);
        assert!(project.image_url.starts_with("memfs://objects/project-images/"));
        assert!(project.image_url.ends_with("-shot.png"));
        assert_eq!(objects.object_count(), 1);
    }

    #[tokio::test]
    async fn test_overlapping_submit_is_refused_as_busy() {
        let (store, _objects, _provider, authoring) =
            authoring_as_admin().await;
        let authoring = Arc::new(authoring);

        // First submit carries an image, so it parks on the staged
        // upload and holds the busy flag across await points.
        let first = {
            let authoring = authoring.clone();
            tokio::spawn(async move {
                authoring
                    .submit_project(
                        &ProjectDraft {
                            title: "First".to_owned(),
                            ..ProjectDraft::default()
                        },
                        None,
                        Some(ImageAttachment::new("big.png", vec![0; 64])),
                    )
                    .await
            })
        };
        for _ in 0..100 {
            if authoring.is_busy() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(authoring.is_busy());

        let second = authoring
            .submit_project(&ProjectDraft::default(), None, None)
            .await;
        assert!(matches!(second, Err(FolioError::Busy)));

        // The refusal does not disturb the submit already in flight.
        first.await.unwrap().unwrap();
        assert!(!authoring.is_busy());
        let projects = stored_projects(&store).await;
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].title, "First");
    }

    #[tokio::test]
    async fn test_write_failure_clears_busy_flag() {
        let (store, _objects, _provider, authoring) =
            authoring_as_admin().await;
        store.set_fault(Some("offline"));
        let result = authoring
            .submit_project(&ProjectDraft::default(), None, None)
            .await;
        assert!(result.is_err());
        assert!(!authoring.is_busy());
    }

    #[tokio::test]
    async fn test_delete_removes_record_and_edit_state() {
        let (store, _objects, _provider, authoring) =
            authoring_as_admin().await;
        authoring
            .submit_project(&ProjectDraft::default(), None, None)
            .await
            .unwrap();
        let id = DocId::new(stored_projects(&store).await[0].id.clone());

        authoring.begin_edit(id.clone());
        authoring.delete_project(&id).await.unwrap();
        assert!(stored_projects(&store).await.is_empty());
        assert!(authoring.editing().is_none());
    }

    #[tokio::test]
    async fn test_profile_save_is_merge_upsert_keeping_avatar() {
        let (store, _objects, _provider, authoring) =
            authoring_as_admin().await;
        let first = ProfileDraft {
            name: "Ada".to_owned(),
            ..ProfileDraft::default()
        };
        authoring
            .save_profile(
                &first,
                Some(ImageAttachment::new("me.jpg", vec![1, 2])),
            )
            .await
            .unwrap();

        let doc = store
            .get_document(&profile_path())
            .await
            .unwrap()
            .unwrap();
        let avatar = doc.fields["avatarUrl"].as_str().unwrap().to_owned();
        assert!(avatar.starts_with("memfs://objects/profile-images/avatar-"));
        assert!(avatar.ends_with(".jpg"));

        // Second save without a new file carries the URL forward.
        let second = ProfileDraft {
            name: "Ada L.".to_owned(),
            avatar_url: avatar.clone(),
            ..ProfileDraft::default()
        };
        authoring.save_profile(&second, None).await.unwrap();
        let doc = store
            .get_document(&profile_path())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.fields["avatarUrl"].as_str().unwrap(), avatar);
        assert_eq!(doc.fields["name"], serde_json::json!("Ada L."));
    }

    #[tokio::test]
    async fn test_mid_session_sign_out_blocks_next_mutation() {
        let (store, _objects, provider, authoring) =
            authoring_as_admin().await;
        authoring
            .submit_project(&ProjectDraft::default(), None, None)
            .await
            .unwrap();

        provider.sign_out().await.unwrap();
        let result = authoring
            .submit_project(&ProjectDraft::default(), None, None)
            .await;
        assert!(matches!(result, Err(FolioError::Unauthorized)));
        assert_eq!(stored_projects(&store).await.len(), 1);
    }
}
