//! Cascade-delete planning shared by both backends.
//!
//! Walks `Kind::dependents()` breadth-first from the deleted entity and
//! returns every `(kind, id)` that must go with it. Each backend supplies
//! its own child lookup.

use crate::model::entity::{composite_key, Entity};
use crate::model::kind::{Dependent, Kind};
use crate::storage::StoreResult;
use std::collections::{BTreeSet, VecDeque};

/// Returns the deletion set for `root`, root first, each key at most once.
///
/// `children(dependent, parent_id)` must return ids of `dependent.kind`
/// whose `dependent.foreign_key` equals `parent_id`.
pub fn plan_cascade<F>(root: &Entity, mut children: F) -> StoreResult<Vec<(Kind, String)>>
where
    F: FnMut(Dependent, &str) -> StoreResult<Vec<String>>,
{
    let mut seen = BTreeSet::new();
    let mut plan = Vec::new();
    let mut queue = VecDeque::from([(root.kind(), root.id().to_string())]);

    while let Some((kind, id)) = queue.pop_front() {
        if !seen.insert(composite_key(kind, &id)) {
            continue;
        }

        for dependent in kind.dependents() {
            for child_id in children(*dependent, &id)? {
                queue.push_back((dependent.kind, child_id));
            }
        }
        plan.push((kind, id));
    }

    Ok(plan)
}
