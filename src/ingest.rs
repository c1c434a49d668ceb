//! Capture ingestion: sliding-pair dispatch onto a bounded worker pool.
//!
//! [`CaptureCoordinator::submit`] keeps one pending capture. The first
//! capture only arms it; every later capture is paired with the pending one
//! as `(before, after)`, queued for analysis, and then becomes the new
//! pending capture. Captures `A, B, C` therefore dispatch `(A, B)` and
//! `(B, C)`.
//!
//! ```text
//! submit ──▶ [pending] ──pair──▶ bounded queue ──▶ worker 1..N ──▶ analyze ──▶ Ledger::reconcile
//! ```
//!
//! Submission never waits on analysis. When the queue is full the pair is
//! rejected with [`PantryError::QueueFull`] (the pending slot still moves
//! on to the new capture). Workers run concurrently, so reconciliations may
//! complete out of capture order; the record then reflects whichever
//! finished last, and the overwrite is logged and counted.
//!
//! [`Ingestion::shutdown`] closes the queue, lets the workers finish every
//! pair already queued, and returns an [`IngestReport`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{bail, Result};
use pantry_core::analyzer::{CapturePair, ChangeAnalyzer};
use pantry_core::PantryError;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::IngestConfig;
use crate::ledger::Ledger;

/// A capture pair tagged with its dispatch order.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub seq: u64,
    pub pair: CapturePair,
}

/// What a [`CaptureCoordinator::submit`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submitted {
    /// First capture held; nothing to compare against yet.
    Armed,
    /// A pair was queued for analysis.
    Dispatched { seq: u64 },
}

struct Slots {
    pending_before: Option<Arc<[u8]>>,
    next_seq: u64,
}

/// Accepts captures and turns them into queued [`Dispatch`]es.
pub struct CaptureCoordinator {
    slots: Mutex<Slots>,
    tx: mpsc::Sender<Dispatch>,
}

impl CaptureCoordinator {
    /// Create a coordinator and the receiving end of its dispatch queue.
    pub fn new(queue_capacity: usize) -> (Self, mpsc::Receiver<Dispatch>) {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let coordinator = Self {
            slots: Mutex::new(Slots {
                pending_before: None,
                next_seq: 1,
            }),
            tx,
        };
        (coordinator, rx)
    }

    /// Accept one capture.
    pub fn submit(&self, capture: Vec<u8>) -> Result<Submitted> {
        let capture: Arc<[u8]> = capture.into();
        // Held across the enqueue so queue order matches pairing order.
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);

        let Some(before) = slots.pending_before.replace(capture.clone()) else {
            debug!(bytes = capture.len(), "first capture held");
            return Ok(Submitted::Armed);
        };

        let seq = slots.next_seq;
        slots.next_seq += 1;
        let dispatch = Dispatch {
            seq,
            pair: CapturePair {
                before,
                after: capture,
            },
        };

        match self.tx.try_send(dispatch) {
            Ok(()) => {
                info!(seq, "dispatched capture pair");
                Ok(Submitted::Dispatched { seq })
            }
            Err(TrySendError::Full(_)) => {
                warn!(seq, "ingestion queue full; dropping capture pair");
                Err(PantryError::QueueFull.into())
            }
            Err(TrySendError::Closed(_)) => bail!("ingestion workers have shut down"),
        }
    }
}

/// Outcome counts for the pairs the workers took off the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub reconciled: u64,
    pub failed: u64,
    /// Reconciliations that replaced a snapshot from a later pair.
    pub out_of_order: u64,
}

#[derive(Default)]
struct Counters {
    reconciled: AtomicU64,
    failed: AtomicU64,
    out_of_order: AtomicU64,
}

impl Counters {
    fn report(&self) -> IngestReport {
        IngestReport {
            reconciled: self.reconciled.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            out_of_order: self.out_of_order.load(Ordering::Relaxed),
        }
    }
}

/// Fixed set of workers draining the dispatch queue.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl WorkerPool {
    pub fn spawn(
        rx: mpsc::Receiver<Dispatch>,
        workers: usize,
        analyzer: Arc<dyn ChangeAnalyzer>,
        ledger: Arc<Ledger>,
    ) -> Self {
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let counters = Arc::new(Counters::default());

        let handles = (0..workers.max(1))
            .map(|worker| {
                let rx = rx.clone();
                let analyzer = analyzer.clone();
                let ledger = ledger.clone();
                let counters = counters.clone();
                tokio::spawn(async move {
                    loop {
                        let next = rx.lock().await.recv().await;
                        let Some(dispatch) = next else { break };
                        process(worker, dispatch, &*analyzer, &ledger, &counters).await;
                    }
                    debug!(worker, "ingestion worker stopped");
                })
            })
            .collect();

        Self { handles, counters }
    }

    /// Wait for every worker to finish. Workers stop once all senders
    /// (i.e. the [`CaptureCoordinator`]) are dropped and the queue is empty.
    pub async fn join(self) -> IngestReport {
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "ingestion worker panicked");
            }
        }
        self.counters.report()
    }
}

/// Analyze and reconcile one pair. Failures are logged and stay local to
/// this pair.
async fn process(
    worker: usize,
    dispatch: Dispatch,
    analyzer: &dyn ChangeAnalyzer,
    ledger: &Ledger,
    counters: &Counters,
) {
    let Dispatch { seq, pair } = dispatch;
    debug!(worker, seq, analyzer = analyzer.name(), "analyzing capture pair");

    let judgment = match analyzer.analyze(&pair.before, &pair.after).await {
        Ok(judgment) => judgment,
        Err(e) => {
            error!(worker, seq, error = %e, "analysis failed; pair dropped");
            counters.failed.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    let applied = match ledger.reconcile_dispatch(&judgment, seq).await {
        Ok(applied) => applied,
        Err(e) => {
            error!(worker, seq, error = %e, "reconciliation failed; pair dropped");
            counters.failed.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };
    counters.reconciled.fetch_add(1, Ordering::Relaxed);

    if let Some(newer) = applied.overwrote {
        counters.out_of_order.fetch_add(1, Ordering::Relaxed);
        warn!(
            seq,
            newer,
            "reconciliation finished out of order; it overwrote a newer snapshot"
        );
    }
}

/// Coordinator plus its running worker pool.
pub struct Ingestion {
    pub coordinator: Arc<CaptureCoordinator>,
    pub workers: WorkerPool,
}

impl Ingestion {
    /// Close the queue and wait for the workers to drain it.
    ///
    /// The queue only closes once every clone of
    /// [`coordinator`](Self::coordinator) is gone, so drop the ones handed
    /// out (e.g. the server state) before awaiting this.
    pub async fn shutdown(self) -> IngestReport {
        drop(self.coordinator);
        let report = self.workers.join().await;
        info!(
            reconciled = report.reconciled,
            failed = report.failed,
            out_of_order = report.out_of_order,
            "ingestion stopped"
        );
        report
    }
}

/// Start ingestion with the configured queue capacity and worker count.
pub fn start(
    config: &IngestConfig,
    analyzer: Arc<dyn ChangeAnalyzer>,
    ledger: Arc<Ledger>,
) -> Ingestion {
    let (coordinator, rx) = CaptureCoordinator::new(config.queue_capacity);
    let workers = WorkerPool::spawn(rx, config.workers, analyzer, ledger);
    info!(
        workers = config.workers,
        queue_capacity = config.queue_capacity,
        "ingestion started"
    );
    Ingestion {
        coordinator: Arc::new(coordinator),
        workers,
    }
}
