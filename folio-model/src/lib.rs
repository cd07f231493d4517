pub mod profile;
pub mod project;
pub mod ranking;
pub mod tokens;

mod value;

pub use profile::Profile;
pub use project::Project;
pub use ranking::{rank, sort_projects};
pub use tokens::{join_tokens, split_tokens};
