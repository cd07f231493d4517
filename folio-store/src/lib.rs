pub mod document;
pub mod memory;
pub mod object_storage;
pub mod store;

pub use document::{
    now_millis, profile_path, CollectionQuery, Direction, DocId, DocPath,
    Document, FieldValue, OrderBy, WritePayload,
};
pub use memory::MemoryStore;
pub use object_storage::{
    avatar_image_path, project_image_path, HttpObjectStorage,
    MemoryObjectStorage, ObjectStorage, UploadProgress,
};
pub use store::{DocumentEvent, DocumentStore, QueryEvent, Subscription};

/// Collection holding the singleton profile document.
pub const PROFILE_COLLECTION: &str = "site";
/// Fixed key of the singleton profile document.
pub const PROFILE_DOC: &str = "profile";
/// Collection holding one document per project.
pub const PROJECTS_COLLECTION: &str = "projects";
