//! Set reconciliation
//!
//! Documents, category tags and reminder-letter tags are all saved by
//! comparing what is stored with what the caller wants and writing only the
//! difference.

use std::collections::BTreeSet;

/// Minimal change set turning `existing` into `desired`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDiff<K> {
    /// In `desired` but not stored yet
    pub to_add: Vec<K>,
    /// Stored but no longer wanted
    pub to_remove: Vec<K>,
}

impl<K> SetDiff<K>
where
    K: Ord + Clone,
{
    /// Both outputs are sorted so changes apply in a stable order.
    pub fn between<'a, E, D>(existing: E, desired: D) -> Self
    where
        K: 'a,
        E: IntoIterator<Item = &'a K>,
        D: IntoIterator<Item = &'a K>,
    {
        let existing: BTreeSet<&K> = existing.into_iter().collect();
        let desired: BTreeSet<&K> = desired.into_iter().collect();

        Self {
            to_add: desired.difference(&existing).map(|k| (*k).clone()).collect(),
            to_remove: existing.difference(&desired).map(|k| (*k).clone()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}
