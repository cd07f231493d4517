/// What a display surface knows about remote content.
///
/// `Failed` is deliberately distinct from `Ready` with empty content so
/// the page can render a diagnostic instead of an empty grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState<T> {
    /// No snapshot received yet.
    Loading,
    /// The latest complete snapshot.
    Ready(T),
    /// The subscription reported an error; the message is generic.
    Failed(String),
}

impl<T> SyncState<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, SyncState::Ready(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SyncState::Failed(_))
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            SyncState::Ready(value) => Some(value),
            _ => None,
        }
    }
}
