//! Shell manager: staged builds, history-backed caching, and the state
//! machine governing current vs in-flight vs stale environments.
//!
//! One logical foreground build at a time per manager; at most one
//! background stage upgrade runs alongside it. A superseding request
//! cancels the previous background task cooperatively: the cancel flag
//! is checked before a result is adopted, so an already-running `nix`
//! invocation finishes and still lands in the cache, but never becomes
//! the current environment (last-request-wins).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::errors::{RealizeError, RealizeResult};
use crate::domain::models::config::ManagerSettings;
use crate::domain::models::{BuildArgs, Fingerprint, RealizedEnv};
use crate::domain::ports::{BuildFn, ProfilePersistence, Realizer};
use crate::services::fingerprint::fingerprint;
use crate::services::history::HistoryStore;
use crate::services::planner::{BuildPlan, StagePlanner};

/// Manager configuration, snapshotted at the start of every build so a
/// setter flipped mid-flight cannot change a build's behavior.
#[derive(Debug, Clone)]
pub struct ManagerOptions {
    /// Stages per build request (>= 1).
    pub num_stages: usize,
    /// Whether later stages block the caller.
    pub block_on_rebuild: bool,
    /// History capacity (>= 1).
    pub history: usize,
    /// Budget for a single realization attempt.
    pub realize_timeout: Duration,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            num_stages: 1,
            block_on_rebuild: true,
            history: 10,
            realize_timeout: Duration::from_secs(600),
        }
    }
}

impl From<&ManagerSettings> for ManagerOptions {
    fn from(settings: &ManagerSettings) -> Self {
        Self {
            num_stages: settings.num_stages.max(1),
            block_on_rebuild: settings.block_on_rebuild,
            history: settings.history.max(1),
            ..Self::default()
        }
    }
}

/// State of the manager's build slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// No environment yet.
    Empty,
    /// A stage-`stage` environment is current.
    Ready { stage: usize },
}

/// Snapshot published on every state transition.
#[derive(Debug, Clone)]
pub struct ShellStatus {
    pub state: SlotState,
    /// Id of the most recent build request (supersession ordering).
    pub request: u64,
    /// Bumped on every successful stage adoption.
    pub generation: u64,
    /// Fingerprint of the current environment, if any.
    pub fingerprint: Option<Fingerprint>,
    /// True once no further stage upgrades are expected for `request`.
    pub settled: bool,
}

/// Handle returned by [`ShellManager::build`]. Always backed by a valid
/// environment (at minimum stage 1); the manager may upgrade the
/// current environment transparently after it is returned.
#[derive(Debug, Clone)]
pub struct BuildHandle {
    pub request: u64,
    pub env: Arc<RealizedEnv>,
    pub num_stages: usize,
}

struct SlotInner {
    /// Cancel flag handed to the in-flight background task, if any.
    cancel: Option<Arc<AtomicBool>>,
    /// Handle of the in-flight background task, owned by the manager.
    background: Option<JoinHandle<()>>,
}

/// Orchestrates staged environment builds over a realizer, a bounded
/// history, and optional on-disk persistence.
pub struct ShellManager {
    build_fn: Arc<dyn BuildFn>,
    options: std::sync::Mutex<ManagerOptions>,
    pipeline: Pipeline,
    inner: Mutex<SlotInner>,
    /// Serializes foreground build requests.
    build_gate: Mutex<()>,
}

impl ShellManager {
    pub fn new(
        build_fn: Arc<dyn BuildFn>,
        realizer: Arc<dyn Realizer>,
        options: ManagerOptions,
    ) -> Self {
        let history = HistoryStore::new(options.history);
        let (status_tx, _) = watch::channel(ShellStatus {
            state: SlotState::Empty,
            request: 0,
            generation: 0,
            fingerprint: None,
            settled: true,
        });
        Self {
            build_fn,
            options: std::sync::Mutex::new(options),
            pipeline: Pipeline {
                realizer,
                persistence: None,
                history: Arc::new(Mutex::new(history)),
                current: Arc::new(RwLock::new(None)),
                request_seq: Arc::new(AtomicU64::new(0)),
                generation: Arc::new(AtomicU64::new(0)),
                status_tx,
            },
            inner: Mutex::new(SlotInner {
                cancel: None,
                background: None,
            }),
            build_gate: Mutex::new(()),
        }
    }

    /// Attach a fingerprint-addressed persistence layer (fast
    /// reactivation across processes).
    #[must_use]
    pub fn with_persistence(mut self, store: Arc<dyn ProfilePersistence>) -> Self {
        self.pipeline.persistence = Some(store);
        self
    }

    /// Build (or upgrade to) the environment described by `args`.
    ///
    /// Stage 1 always runs synchronously: there is nothing to serve
    /// until it completes, and its failure propagates and empties the
    /// slot. Later stages follow the `block_on_rebuild` snapshot taken
    /// here; upgrade failures are logged and never regress the current
    /// environment.
    pub async fn build(&self, args: &BuildArgs) -> RealizeResult<BuildHandle> {
        let _gate = self.build_gate.lock().await;
        let options = self.options.lock().expect("options lock").clone();
        let plan = StagePlanner::plan(self.build_fn.as_ref(), options.num_stages, args);
        let num_stages = plan.num_stages();
        let request = self.pipeline.request_seq.fetch_add(1, Ordering::SeqCst) + 1;

        self.supersede_background().await;

        debug!(request, num_stages, "starting build");
        let env = match self.pipeline.resolve_stage(&plan, 1, &options).await {
            Ok(env) => env,
            Err(err) => {
                // Fatal: the previous generation was abandoned when this
                // request arrived, so the slot goes back to Empty.
                self.pipeline.empty_slot(request).await;
                return Err(err);
            }
        };
        self.pipeline
            .adopt(request, Arc::clone(&env), num_stages == 1)
            .await;

        if num_stages > 1 {
            if options.block_on_rebuild {
                self.pipeline
                    .run_upgrades(request, &plan, &options, None)
                    .await;
            } else {
                self.spawn_upgrades(request, plan, options).await;
            }
        }

        Ok(BuildHandle {
            request,
            env,
            num_stages,
        })
    }

    /// The current best available environment, if any.
    pub async fn current(&self) -> Option<Arc<RealizedEnv>> {
        self.pipeline.current.read().await.clone()
    }

    /// Snapshot of the slot's state.
    pub fn status(&self) -> ShellStatus {
        self.pipeline.status_tx.borrow().clone()
    }

    /// Subscribe to state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ShellStatus> {
        self.pipeline.status_tx.subscribe()
    }

    /// Wait until the given request reaches `stage`.
    ///
    /// Resolves with the best environment the request produced if its
    /// pipeline settles earlier (e.g. a background upgrade failed), and
    /// with [`RealizeError::Cancelled`] if a newer request superseded it
    /// before `stage` was reached.
    pub async fn wait_for_stage(
        &self,
        handle: &BuildHandle,
        stage: usize,
    ) -> RealizeResult<Arc<RealizedEnv>> {
        let mut rx = self.pipeline.status_tx.subscribe();
        loop {
            let snapshot = rx.borrow_and_update().clone();
            if snapshot.request > handle.request {
                return Err(RealizeError::Cancelled);
            }
            if snapshot.request == handle.request {
                if let SlotState::Ready { stage: reached } = snapshot.state {
                    if reached >= stage {
                        return Ok(self
                            .current()
                            .await
                            .unwrap_or_else(|| Arc::clone(&handle.env)));
                    }
                }
                if snapshot.settled {
                    return Ok(self
                        .current()
                        .await
                        .unwrap_or_else(|| Arc::clone(&handle.env)));
                }
            }
            if rx.changed().await.is_err() {
                return Err(RealizeError::Cancelled);
            }
        }
    }

    /// Explicitly drop a cached environment known to be bad.
    pub async fn invalidate(&self, fp: &Fingerprint) -> bool {
        self.pipeline.history.lock().await.invalidate(fp)
    }

    /// Flip whether later stages block the caller. Takes effect on the
    /// next build; in-flight builds keep the snapshot they started with.
    pub fn set_block_on_rebuild(&self, block: bool) {
        self.options.lock().expect("options lock").block_on_rebuild = block;
    }

    pub fn block_on_rebuild(&self) -> bool {
        self.options.lock().expect("options lock").block_on_rebuild
    }

    /// True when rebuilding for `args` would change nothing
    /// cache-relevant: the prospective final stage fingerprints
    /// identically to the current environment. Callers can use this to
    /// decide against forcing a synchronous rebuild.
    pub async fn only_metadata_changed(&self, args: &BuildArgs) -> bool {
        let Some(current) = self.current().await else {
            return false;
        };
        let options = self.options.lock().expect("options lock").clone();
        let plan = StagePlanner::plan(self.build_fn.as_ref(), options.num_stages, args);
        fingerprint(plan.final_stage()) == current.fingerprint
    }

    /// Fire off the upgrade task for the non-blocking path. The manager
    /// owns the handle; a superseding request flips the cancel flag
    /// instead of aborting the task.
    async fn spawn_upgrades(&self, request: u64, plan: BuildPlan, options: ManagerOptions) {
        let cancel = Arc::new(AtomicBool::new(false));
        let task_cancel = Arc::clone(&cancel);
        let pipeline = self.pipeline.clone();
        let handle = tokio::spawn(async move {
            pipeline
                .run_upgrades(request, &plan, &options, Some(&task_cancel))
                .await;
        });

        let mut inner = self.inner.lock().await;
        inner.cancel = Some(cancel);
        inner.background = Some(handle);
    }

    /// Cooperatively cancel the previous background task, if any.
    async fn supersede_background(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(flag) = inner.cancel.take() {
            flag.store(true, Ordering::SeqCst);
        }
        // Detach rather than abort: the external realization may run to
        // completion and its result is still worth caching.
        inner.background.take();
    }
}

/// Everything a stage needs to resolve and publish, shared verbatim
/// with the background upgrade task.
#[derive(Clone)]
struct Pipeline {
    realizer: Arc<dyn Realizer>,
    persistence: Option<Arc<dyn ProfilePersistence>>,
    history: Arc<Mutex<HistoryStore>>,
    current: Arc<RwLock<Option<Arc<RealizedEnv>>>>,
    request_seq: Arc<AtomicU64>,
    generation: Arc<AtomicU64>,
    status_tx: watch::Sender<ShellStatus>,
}

impl Pipeline {
    /// Resolve one stage: in-memory history, then persisted profile,
    /// then a fresh realization (cached and persisted on success).
    async fn resolve_stage(
        &self,
        plan: &BuildPlan,
        stage: usize,
        options: &ManagerOptions,
    ) -> RealizeResult<Arc<RealizedEnv>> {
        let spec = plan.stage(stage);
        let fp = fingerprint(spec);

        if fp.is_cacheable() {
            if let Some(env) = self.history.lock().await.get(&fp) {
                debug!(stage, fingerprint = %fp.short(), "stage resolved from history");
                return Ok(at_stage(&env, stage));
            }
            if let Some(store) = &self.persistence {
                if let Some(env) = store.load(&fp).await {
                    info!(stage, fingerprint = %fp.short(), "reactivated persisted environment");
                    let env = Arc::new(env);
                    self.history.lock().await.put(Arc::clone(&env));
                    return Ok(at_stage(&env, stage));
                }
            }
        }

        let realized = self.realizer.realize(spec, options.realize_timeout).await?;
        let env = Arc::new(RealizedEnv {
            fingerprint: fp.clone(),
            stage,
            ..realized
        });
        self.history.lock().await.put(Arc::clone(&env));
        if fp.is_cacheable() {
            if let Some(store) = &self.persistence {
                store.store(&env).await;
            }
        }
        Ok(env)
    }

    /// Upgrade loop for stages 2..=n. `cancel` is present on the
    /// background path only.
    async fn run_upgrades(
        &self,
        request: u64,
        plan: &BuildPlan,
        options: &ManagerOptions,
        cancel: Option<&AtomicBool>,
    ) {
        let num_stages = plan.num_stages();
        for stage in 2..=num_stages {
            if cancel.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
                debug!(request, stage, "upgrade cancelled by newer request");
                return;
            }
            match self.resolve_stage(plan, stage, options).await {
                Ok(env) => {
                    // Check the flag again after the slow call: a result
                    // that raced with supersession stays cached but is
                    // never adopted.
                    if cancel.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
                        debug!(request, stage, "discarding superseded upgrade result");
                        return;
                    }
                    if !self.adopt(request, env, stage == num_stages).await {
                        return;
                    }
                }
                Err(err) => {
                    // Never regress a working environment over an
                    // upgrade failure; the previous stage stays current.
                    warn!(request, stage, error = %err, "stage upgrade failed");
                    self.settle(request);
                    return;
                }
            }
        }
    }

    /// Atomically adopt an environment as current for `request`.
    ///
    /// The request-id check happens while the current-environment write
    /// lock is held, so a stale generation's completion can never
    /// overwrite a newer generation's stage once that stage has been
    /// published.
    async fn adopt(&self, request: u64, env: Arc<RealizedEnv>, settled: bool) -> bool {
        let mut slot = self.current.write().await;
        if self.request_seq.load(Ordering::SeqCst) != request {
            debug!(request, "not adopting result of superseded request");
            return false;
        }
        let fp = env.fingerprint.clone();
        let stage = env.stage;
        *slot = Some(env);
        drop(slot);

        self.history.lock().await.pin(Some(fp.clone()));
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(request, stage, generation, fingerprint = %fp.short(), "environment adopted");
        self.status_tx.send_replace(ShellStatus {
            state: SlotState::Ready { stage },
            request,
            generation,
            fingerprint: Some(fp),
            settled,
        });
        true
    }

    async fn empty_slot(&self, request: u64) {
        *self.current.write().await = None;
        self.history.lock().await.pin(None);
        self.status_tx.send_replace(ShellStatus {
            state: SlotState::Empty,
            request,
            generation: self.generation.load(Ordering::SeqCst),
            fingerprint: None,
            settled: true,
        });
    }

    /// Mark the request's pipeline as finished without a new adoption.
    fn settle(&self, request: u64) {
        let snapshot = self.status_tx.borrow().clone();
        if snapshot.request == request {
            self.status_tx.send_replace(ShellStatus {
                settled: true,
                ..snapshot
            });
        }
    }
}

/// Cache hits may carry the stage index of the plan that originally
/// produced them; re-tag for the current plan.
fn at_stage(env: &Arc<RealizedEnv>, stage: usize) -> Arc<RealizedEnv> {
    if env.stage == stage {
        Arc::clone(env)
    } else {
        Arc::new(RealizedEnv {
            stage,
            ..(**env).clone()
        })
    }
}
