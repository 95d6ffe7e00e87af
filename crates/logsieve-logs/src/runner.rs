use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use logsieve_criteria::{CriteriaController, CriteriaSnapshot};
use logsieve_types::{ArcLogEntry, LogStore};

/// Entries evaluated between cancellation checks
pub const CHUNK_SIZE: usize = 512;

/// Result of one complete filter pass
#[derive(Debug)]
pub struct FilteredSet {
    /// Sequence number of the pass that produced this set
    pub pass: u64,
    /// Criteria revision the pass evaluated
    pub revision: u64,
    /// Entries scanned
    pub scanned: usize,
    pub entries: Vec<ArcLogEntry>,
}

/// Evaluate every retained entry against `snapshot`
///
/// Returns None if `cancel` fires before the pass completes.
pub fn run_pass(
    snapshot: &CriteriaSnapshot,
    store: &dyn LogStore,
    cancel: &CancellationToken,
) -> Option<(usize, Vec<ArcLogEntry>)> {
    let mut passed = Vec::new();
    let mut scanned = 0;
    for entry in store.entries() {
        if scanned % CHUNK_SIZE == 0 && cancel.is_cancelled() {
            return None;
        }
        scanned += 1;
        if snapshot.evaluator.passes(&entry, store) {
            passed.push(entry);
        }
    }
    if cancel.is_cancelled() {
        return None;
    }
    Some((scanned, passed))
}

/// Runs batch filter passes in the background; the latest pass wins
pub struct FilterRunner {
    store: Arc<dyn LogStore>,

    /// Cancellation token for the running pass
    cancel: CancellationToken,

    /// Criteria of the last started pass
    last_snapshot: Option<Arc<CriteriaSnapshot>>,

    next_pass: u64,

    published: Arc<watch::Sender<Option<Arc<FilteredSet>>>>,
}

impl FilterRunner {
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        let (published, _) = watch::channel(None);
        Self {
            store,
            cancel: CancellationToken::new(),
            last_snapshot: None,
            next_pass: 0,
            published: Arc::new(published),
        }
    }

    /// Receive each published result
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<FilteredSet>>> {
        self.published.subscribe()
    }

    /// Most recently published result
    pub fn latest(&self) -> Option<Arc<FilteredSet>> {
        self.published.borrow().clone()
    }

    /// Cancel the running pass, if any, and start one for `snapshot`
    ///
    /// Must be called from within a Tokio runtime.
    pub fn restart(&mut self, snapshot: Arc<CriteriaSnapshot>) {
        self.cancel_running();

        let pass = self.next_pass;
        self.next_pass += 1;
        let revision = snapshot.revision;
        debug!(pass, revision, "starting filter pass");

        let cancel = self.cancel.clone();
        let store = Arc::clone(&self.store);
        let published = Arc::clone(&self.published);
        self.last_snapshot = Some(Arc::clone(&snapshot));

        // Detached; a superseded pass ends at its next cancellation check
        tokio::task::spawn_blocking(move || {
            let Some((scanned, entries)) = run_pass(&snapshot, store.as_ref(), &cancel) else {
                trace!(pass, revision, "filter pass cancelled");
                return;
            };
            let result = Arc::new(FilteredSet {
                pass,
                revision,
                scanned,
                entries,
            });
            let accepted = published.send_if_modified(|current| {
                let is_newer = current.as_ref().is_none_or(|c| c.pass < pass);
                if is_newer && !cancel.is_cancelled() {
                    *current = Some(Arc::clone(&result));
                    true
                } else {
                    false
                }
            });
            if accepted {
                debug!(pass, revision, passed = result.entries.len(), "filter pass published");
            } else {
                trace!(pass, revision, "filter pass superseded");
            }
        });
    }

    /// Re-run the last criteria, e.g. after new entries arrived
    pub fn refresh(&mut self) {
        if let Some(snapshot) = self.last_snapshot.clone() {
            self.restart(snapshot);
        }
    }

    /// Keep results in step with `controller` until `shutdown` fires
    pub async fn follow(&mut self, controller: Arc<CriteriaController>, shutdown: CancellationToken) {
        let mut changes = controller.subscribe();
        let snapshot = controller.snapshot();
        let mut handled = snapshot.filter_revision;
        self.restart(snapshot);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,

                changed = changes.changed() => {
                    if changed.is_err() {
                        // Controller dropped
                        break;
                    }
                    let change = *changes.borrow_and_update();
                    if change.needs_refilter_since(handled) {
                        let snapshot = controller.snapshot();
                        handled = snapshot.filter_revision;
                        self.restart(snapshot);
                    }
                }
            }
        }

        self.stop();
    }

    fn cancel_running(&mut self) {
        self.cancel.cancel();
        // Fresh token for the next pass
        self.cancel = CancellationToken::new();
    }

    /// Stop the running pass
    pub fn stop(&mut self) {
        self.cancel_running();
    }
}

impl Drop for FilterRunner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
