pub mod feed;
pub mod state;

pub use feed::{ProfileFeed, ProjectFeed};
pub use state::SyncState;
