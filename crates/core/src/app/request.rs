use crate::cancel::CancellationToken;
use crate::domain::events::HeadEvent;
use crate::domain::head::{Candidate, Head};
use crate::error::Result;
use crate::ports::observer::{Criteria, HeadObserver};
use crate::ports::remote::{Probe, RemoteError};
use std::collections::HashSet;
use tracing::{debug, info};

/// How a synchronization run retrieves its candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// A single head was looked up; nothing is pruned
    Targeted,
    /// Every enabled category was listed; missing heads are pruned
    Full,
}

/// Outcome of evaluating one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WitnessOutcome {
    Skipped,
    MetCriteria,
    DoesNotMeetCriteria,
}

impl std::fmt::Display for WitnessOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Skipped => "Skipped",
            Self::MetCriteria => "Met criteria",
            Self::DoesNotMeetCriteria => "Does not meet criteria",
        })
    }
}

/// Log entry recorded for every evaluated candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WitnessEntry {
    pub head: String,
    pub outcome: WitnessOutcome,
}

impl std::fmt::Display for WitnessEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "    {}: {}", self.head, self.outcome)
    }
}

/// Summary of a finished synchronization run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub mode: ScanMode,
    pub witness: Vec<WitnessEntry>,
    pub removed: Vec<Head>,
}

impl SyncReport {
    pub fn matched(&self) -> usize {
        self.witness
            .iter()
            .filter(|entry| entry.outcome == WitnessOutcome::MetCriteria)
            .count()
    }
}

struct FullScan {
    known: Vec<Head>,
    present: HashSet<Head>,
}

/// State of one synchronization run.
///
/// Created per `retrieve` call and consumed by [`Self::close`]. A request that
/// is dropped without being closed (an error or cancellation unwound the run)
/// reports no removals.
pub struct SynchronizationRequest<'a> {
    criteria: Option<&'a dyn Criteria>,
    observer: &'a mut dyn HeadObserver,
    event: Option<&'a HeadEvent>,
    cancel: CancellationToken,
    mode: ScanMode,
    full_scan: Option<FullScan>,
    witness: Vec<WitnessEntry>,
    observing: bool,
    closed: bool,
}

impl<'a> SynchronizationRequest<'a> {
    pub fn new(
        criteria: Option<&'a dyn Criteria>,
        observer: &'a mut dyn HeadObserver,
        event: Option<&'a HeadEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            criteria,
            observer,
            event,
            cancel,
            mode: ScanMode::Targeted,
            full_scan: None,
            witness: Vec::new(),
            observing: true,
            closed: false,
        }
    }

    /// The one head to refresh, if the run qualifies for targeted retrieval.
    ///
    /// Removal events always lead to a full scan so that the removed head is
    /// pruned.
    pub fn targeted_head(&self) -> Option<Head> {
        if self.event.is_some_and(HeadEvent::is_removal) {
            debug!("Head event is 'removed', a full scan is required");
            return None;
        }
        let includes = self.observer.includes();
        includes.single().cloned()
    }

    /// Switch to full-scan mode: remember what the observer knew and what the
    /// server now reports, so that the difference is pruned on close.
    pub fn prepare_for_full_scan(&mut self, candidates: &[Candidate]) {
        let known = self.observer.known_heads();
        let present = candidates.iter().map(|c| c.head().clone()).collect();
        debug!(
            "Prepared full scan with {} known heads and {} candidates",
            known.len(),
            candidates.len()
        );
        self.mode = ScanMode::Full;
        self.full_scan = Some(FullScan { known, present });
    }

    /// Evaluate one candidate: probe, test criteria, notify the observer and
    /// record the outcome. Returns `true` once the observer has seen enough.
    ///
    /// Probe failures count as not meeting the criteria unless the server
    /// could not be reached.
    pub fn process<'p, F>(&mut self, candidate: &Candidate, open_probe: F) -> Result<bool>
    where
        F: FnOnce(&Candidate) -> std::result::Result<Box<dyn Probe + 'p>, RemoteError>,
    {
        self.cancel.check()?;

        let head = candidate.head();
        let Some(revision) = candidate.revision() else {
            self.record(head, WitnessOutcome::Skipped);
            return Ok(!self.observing);
        };

        let is_match = match self.criteria {
            None => true,
            Some(criteria) => {
                let verdict = open_probe(candidate).and_then(|probe| criteria.matches(probe.as_ref()));
                match verdict {
                    Ok(is_match) => is_match,
                    Err(err) if err.is_transport() => return Err(err.into()),
                    Err(err) => {
                        debug!("Probe of {} failed, treating as no match: {}", head.name(), err);
                        false
                    }
                }
            }
        };

        self.observing = self.observer.submit(head, revision, is_match);
        self.record(
            head,
            if is_match {
                WitnessOutcome::MetCriteria
            } else {
                WitnessOutcome::DoesNotMeetCriteria
            },
        );
        Ok(!self.observing)
    }

    fn record(&mut self, head: &Head, outcome: WitnessOutcome) {
        info!(head = head.name(), "{}", outcome);
        self.witness.push(WitnessEntry {
            head: head.name().to_string(),
            outcome,
        });
    }

    /// Finish the run; in full-scan mode every known head the server no longer
    /// reports is announced as removed.
    pub fn close(mut self) -> SyncReport {
        let mut removed = Vec::new();
        if let Some(scan) = self.full_scan.take() {
            for head in scan.known {
                if !scan.present.contains(&head) && !removed.contains(&head) {
                    info!(head = head.name(), "Head no longer exists, removing");
                    self.observer.removed(&head);
                    removed.push(head);
                }
            }
        }
        self.closed = true;

        SyncReport {
            mode: self.mode,
            witness: std::mem::take(&mut self.witness),
            removed,
        }
    }
}

impl Drop for SynchronizationRequest<'_> {
    fn drop(&mut self) {
        if !self.closed {
            debug!("Synchronization request released without completing, nothing pruned");
        }
    }
}
