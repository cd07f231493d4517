pub mod draft;
pub mod workflow;

pub use draft::{ProfileDraft, ProjectDraft};
pub use workflow::{Authoring, ImageAttachment};
