//! Edit-form drafts and their normalization into write payloads.
//!
//! Drafts hold fields exactly as entered, including free-text numbers
//! and comma-separated tag lists; all defaulting and coercion happens
//! in `normalize`, immediately before the write.

use folio_model::project::{
    current_year, DEFAULT_ROLE, DEFAULT_SORT_ORDER, DEFAULT_TITLE,
};
use folio_model::{join_tokens, split_tokens, Profile, Project};
use folio_store::{FieldValue, WritePayload};
use serde_json::{json, Value};

#[derive(Debug, Clone, Default)]
pub struct ProjectDraft {
    pub title: String,
    pub blurb: String,
    pub description: String,
    /// Kept when no new image is attached to the submit.
    pub image_url: String,
    pub live_url: String,
    pub github_url: String,
    pub tags_csv: String,
    pub stack_csv: String,
    pub role: String,
    /// Free text; anything that does not parse becomes the current year.
    pub year: String,
    /// Free text; anything that does not parse becomes 100.
    pub sort_order: String,
    pub pinned: bool,
}

impl ProjectDraft {
    /// Prefill a draft from an existing record, rendering the tag lists
    /// back into their comma-separated form.
    pub fn from_project(project: &Project) -> Self {
        Self {
            title: project.title.clone(),
            blurb: project.blurb.clone(),
            description: project.description.clone(),
            image_url: project.image_url.clone(),
            live_url: project.live_url.clone(),
            github_url: project.github_url.clone(),
            tags_csv: join_tokens(&project.tags),
            stack_csv: join_tokens(&project.stack),
            role: project.role.clone(),
            year: project.year.to_string(),
            sort_order: project.sort_order.to_string(),
            pinned: project.pinned,
        }
    }

    /// Assemble the write payload. `image_url` is the already-resolved
    /// URL (either freshly uploaded or carried over from the draft).
    /// `updatedAt` is stamped with the server-timestamp sentinel;
    /// `createdAt` is the workflow's business, not the draft's.
    pub(crate) fn normalize(&self, image_url: &str) -> WritePayload {
        let mut payload = WritePayload::new();
        let title = self.title.trim();
        payload.insert(
            "title".to_owned(),
            FieldValue::text(if title.is_empty() {
                DEFAULT_TITLE
            } else {
                title
            }),
        );
        payload.insert(
            "blurb".to_owned(),
            FieldValue::text(self.blurb.trim()),
        );
        payload.insert(
            "description".to_owned(),
            FieldValue::text(self.description.trim()),
        );
        payload.insert(
            "imageUrl".to_owned(),
            FieldValue::text(image_url.trim()),
        );
        payload.insert(
            "liveUrl".to_owned(),
            FieldValue::text(self.live_url.trim()),
        );
        payload.insert(
            "githubUrl".to_owned(),
            FieldValue::text(self.github_url.trim()),
        );
        payload.insert(
            "tags".to_owned(),
            FieldValue::Json(json!(split_tokens(&self.tags_csv))),
        );
        payload.insert(
            "stack".to_owned(),
            FieldValue::Json(json!(split_tokens(&self.stack_csv))),
        );
        let role = self.role.trim();
        payload.insert(
            "role".to_owned(),
            FieldValue::text(if role.is_empty() { DEFAULT_ROLE } else { role }),
        );
        let year: i32 = self
            .year
            .trim()
            .parse()
            .unwrap_or_else(|_| current_year());
        payload.insert("year".to_owned(), FieldValue::Json(json!(year)));
        payload.insert(
            "pinned".to_owned(),
            FieldValue::Json(Value::Bool(self.pinned)),
        );
        let sort_order: i64 = self
            .sort_order
            .trim()
            .parse()
            .unwrap_or(DEFAULT_SORT_ORDER);
        payload.insert(
            "sortOrder".to_owned(),
            FieldValue::Json(json!(sort_order)),
        );
        payload.insert("updatedAt".to_owned(), FieldValue::ServerTimestamp);
        payload
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProfileDraft {
    pub name: String,
    pub role: String,
    pub tagline: String,
    pub bio: String,
    pub email: String,
    pub github_url: String,
    pub linkedin_url: String,
    pub focus_csv: String,
    pub stack_csv: String,
    /// Kept when no new avatar is attached to the save.
    pub avatar_url: String,
}

impl ProfileDraft {
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            name: profile.name.clone(),
            role: profile.role.clone(),
            tagline: profile.tagline.clone(),
            bio: profile.bio.clone(),
            email: profile.email.clone(),
            github_url: profile.github_url.clone(),
            linkedin_url: profile.linkedin_url.clone(),
            focus_csv: join_tokens(&profile.focus),
            stack_csv: join_tokens(&profile.stack),
            avatar_url: profile.avatar_url.clone(),
        }
    }

    pub(crate) fn normalize(&self, avatar_url: &str) -> WritePayload {
        let mut payload = WritePayload::new();
        payload.insert("name".to_owned(), FieldValue::text(self.name.trim()));
        payload.insert("role".to_owned(), FieldValue::text(self.role.trim()));
        payload.insert(
            "tagline".to_owned(),
            FieldValue::text(self.tagline.trim()),
        );
        payload.insert("bio".to_owned(), FieldValue::text(self.bio.trim()));
        payload.insert("email".to_owned(), FieldValue::text(self.email.trim()));
        payload.insert(
            "githubUrl".to_owned(),
            FieldValue::text(self.github_url.trim()),
        );
        payload.insert(
            "linkedinUrl".to_owned(),
            FieldValue::text(self.linkedin_url.trim()),
        );
        payload.insert(
            "focus".to_owned(),
            FieldValue::Json(json!(split_tokens(&self.focus_csv))),
        );
        payload.insert(
            "stack".to_owned(),
            FieldValue::Json(json!(split_tokens(&self.stack_csv))),
        );
        payload.insert(
            "avatarUrl".to_owned(),
            FieldValue::text(avatar_url.trim()),
        );
        payload.insert("updatedAt".to_owned(), FieldValue::ServerTimestamp);
        payload
    }
}
