use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::value::{int_field, list_field, str_field};

/// The singleton owner profile shown on the public page.
///
/// An empty `avatar_url` means the page falls back to its placeholder
/// rendering; everything else is plain display data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub role: String,
    pub tagline: String,
    pub bio: String,
    pub email: String,
    pub github_url: String,
    pub linkedin_url: String,
    pub avatar_url: String,
    pub focus: Vec<String>,
    pub stack: Vec<String>,
    /// Milliseconds since the Unix epoch, assigned by the store. Zero
    /// until the first write lands.
    pub updated_at: i64,
}

impl Profile {
    /// The record shown while the backend has no profile document yet,
    /// so a cold deployment still renders a complete card.
    pub fn fallback() -> Self {
        Self {
            name: String::new(),
            role: "Full-stack Developer".to_owned(),
            tagline: "Clean, fast, and deployed.".to_owned(),
            bio: "I build UI you can feel and APIs you can trust.".to_owned(),
            email: String::new(),
            github_url: String::new(),
            linkedin_url: String::new(),
            avatar_url: String::new(),
            focus: vec![
                "Frontend".to_owned(),
                "APIs".to_owned(),
                "Perf".to_owned(),
            ],
            stack: vec![
                "React".to_owned(),
                "FastAPI".to_owned(),
                "Postgres".to_owned(),
            ],
            updated_at: 0,
        }
    }

    /// Merge a partial remote document over a complete fallback record.
    ///
    /// A field present in the remote document wins even when it is empty;
    /// a field that is absent keeps the fallback value. Total over any
    /// input map.
    pub fn reconcile(fields: &Map<String, Value>, fallback: &Profile) -> Self {
        let text = |key: &str, default: &str| {
            str_field(fields, key).unwrap_or_else(|| default.to_owned())
        };
        Self {
            name: text("name", &fallback.name),
            role: text("role", &fallback.role),
            tagline: text("tagline", &fallback.tagline),
            bio: text("bio", &fallback.bio),
            email: text("email", &fallback.email),
            github_url: text("githubUrl", &fallback.github_url),
            linkedin_url: text("linkedinUrl", &fallback.linkedin_url),
            avatar_url: text("avatarUrl", &fallback.avatar_url),
            focus: list_field(fields, "focus")
                .unwrap_or_else(|| fallback.focus.clone()),
            stack: list_field(fields, "stack")
                .unwrap_or_else(|| fallback.stack.clone()),
            updated_at: int_field(fields, "updatedAt")
                .unwrap_or(fallback.updated_at),
        }
    }
}
