use crate::domain::head::{Head, Revision};
use crate::ports::observer::{HeadObserver, Includes};
use crate::ports::persistence::StoredHead;
use std::collections::{HashMap, HashSet};

/// In-memory view of the heads of one repository, kept current by
/// synchronization runs
#[derive(Debug, Default)]
pub struct HeadProjection {
    /// Heads that met the criteria, with the revision they were seen at
    heads: HashMap<Head, Option<Revision>>,

    /// Heads the next run is limited to
    includes: Includes,

    /// Included heads submitted during the current run
    observed: HashSet<Head>,

    /// Heads pruned since the projection was created
    removed: Vec<Head>,
}

impl HeadProjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore the heads persisted by an earlier run
    pub fn from_stored(stored: Vec<StoredHead>) -> Self {
        let mut projection = Self::new();
        for entry in stored {
            let revision = entry.revision();
            projection.heads.insert(entry.head, revision);
        }
        projection
    }

    /// Limit the next run to the given heads
    pub fn with_includes(mut self, includes: Includes) -> Self {
        self.set_includes(includes);
        self
    }

    pub fn set_includes(&mut self, includes: Includes) {
        self.includes = includes;
        self.observed.clear();
    }

    pub fn contains(&self, head: &Head) -> bool {
        self.heads.contains_key(head)
    }

    pub fn revision(&self, head: &Head) -> Option<&Revision> {
        self.heads.get(head).and_then(Option::as_ref)
    }

    /// Find a known head by name
    pub fn find(&self, name: &str) -> Option<&Head> {
        self.heads.keys().find(|head| head.name() == name)
    }

    /// Present heads ordered by category, then name
    pub fn heads(&self) -> Vec<&Head> {
        let mut heads: Vec<&Head> = self.heads.keys().collect();
        heads.sort_by(|a, b| (a.category(), a.name()).cmp(&(b.category(), b.name())));
        heads
    }

    pub fn removed(&self) -> &[Head] {
        &self.removed
    }

    /// Snapshot for persistence, in the same order as [`Self::heads`]
    pub fn stored(&self) -> Vec<StoredHead> {
        self.heads()
            .into_iter()
            .map(|head| StoredHead {
                head: head.clone(),
                revision: self.revision(head).map(|r| r.marker().to_string()),
            })
            .collect()
    }

    fn is_included(&self, head: &Head) -> bool {
        match &self.includes {
            Includes::All => true,
            Includes::Only(heads) => heads.contains(head),
        }
    }
}

impl HeadObserver for HeadProjection {
    fn includes(&self) -> Includes {
        self.includes.clone()
    }

    fn known_heads(&self) -> Vec<Head> {
        self.heads().into_iter().cloned().collect()
    }

    fn submit(&mut self, head: &Head, revision: &Revision, is_match: bool) -> bool {
        if !self.is_included(head) {
            return true;
        }

        // Re-insert so the key picks up fresh clone information
        self.heads.remove(head);
        if is_match {
            self.heads.insert(head.clone(), Some(revision.clone()));
        }

        match &self.includes {
            Includes::All => true,
            Includes::Only(heads) => {
                self.observed.insert(head.clone());
                heads.iter().any(|wanted| !self.observed.contains(wanted))
            }
        }
    }

    fn removed(&mut self, head: &Head) {
        if self.heads.remove(head).is_some() {
            self.removed.push(head.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::head::CloneInformation;

    fn origin() -> CloneInformation {
        CloneInformation::new("git", "https://scm.example.com/scm/repo/space/demo")
    }

    fn revision(name: &str, marker: &str) -> (Head, Revision) {
        let head = Head::branch(origin(), name);
        let revision = Revision::new(head.clone(), marker);
        (head, revision)
    }

    #[test]
    fn test_submit_tracks_matching_heads() {
        let mut projection = HeadProjection::new();
        let (main, main_rev) = revision("main", "a1");
        let (docs, docs_rev) = revision("docs", "b2");

        assert!(projection.submit(&main, &main_rev, true));
        assert!(projection.submit(&docs, &docs_rev, false));

        assert!(projection.contains(&main));
        assert!(!projection.contains(&docs));
        assert_eq!(projection.revision(&main).map(Revision::marker), Some("a1"));
    }

    #[test]
    fn test_head_that_stops_matching_is_dropped() {
        let mut projection = HeadProjection::new();
        let (main, rev) = revision("main", "a1");
        projection.submit(&main, &rev, true);
        projection.submit(&main, &rev, false);
        assert!(projection.heads().is_empty());
    }

    #[test]
    fn test_single_include_stops_after_it_was_seen() {
        let (main, rev) = revision("main", "a1");
        let (other, other_rev) = revision("other", "c3");
        let mut projection = HeadProjection::new().with_includes(Includes::Only(vec![main.clone()]));

        assert!(projection.submit(&other, &other_rev, true));
        assert!(!projection.contains(&other));
        assert!(!projection.submit(&main, &rev, true));
    }

    #[test]
    fn test_removed_heads_are_recorded() {
        let (main, rev) = revision("main", "a1");
        let mut projection = HeadProjection::new();
        projection.submit(&main, &rev, true);

        HeadObserver::removed(&mut projection, &main);
        HeadObserver::removed(&mut projection, &main);

        assert!(projection.heads().is_empty());
        assert_eq!(projection.removed(), &[main]);
    }

    #[test]
    fn test_stored_round_trip_keeps_revisions() {
        let (main, main_rev) = revision("main", "a1");
        let tag = Head::tag(origin(), "v1");
        let mut projection = HeadProjection::new();
        projection.submit(&main, &main_rev, true);
        projection.submit(&tag, &Revision::new(tag.clone(), "t1"), true);

        let stored = projection.stored();
        assert_eq!(stored[0].head, main);
        assert_eq!(stored[1].revision.as_deref(), Some("t1"));

        let restored = HeadProjection::from_stored(stored);
        assert_eq!(restored.known_heads(), vec![main, tag]);
        assert_eq!(restored.find("v1").map(Head::category), Some(crate::HeadCategory::Tag));
    }
}
