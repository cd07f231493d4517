//! Total order over the project collection.
//!
//! Pinned records first, then ascending `sort_order`, then the most
//! recently created, with the store id as the last tie-break so the
//! order is deterministic for any two distinct records.

use std::cmp::Ordering;

use crate::project::Project;

pub fn rank(a: &Project, b: &Project) -> Ordering {
    b.pinned
        .cmp(&a.pinned)
        .then_with(|| a.sort_order.cmp(&b.sort_order))
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn sort_projects(projects: &mut [Project]) {
    projects.sort_by(rank);
}
