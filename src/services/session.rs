use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::CartStore;
use crate::models::{
    CartError, CartItemCandidate, CartResult, CartView, ServiceListing,
};
use crate::observability::Metrics;
use crate::repositories::{SnapshotKey, SnapshotStore};

tokio::task_local! {
    static ACTIVE_SESSION: Arc<SessionContext>;
}

/// One live session and the cart it owns
#[derive(Debug)]
pub struct SessionContext {
    id: Uuid,
    origin: String,
    started_at: DateTime<Utc>,
    opened: Instant,
    // Milliseconds after `opened` of the last lookup or cart operation
    last_used_ms: AtomicU64,
    cart: Mutex<CartStore>,
}

impl SessionContext {
    fn new(origin: &str, cart: CartStore) -> Self {
        Self {
            id: Uuid::new_v4(),
            origin: origin.to_string(),
            started_at: Utc::now(),
            opened: Instant::now(),
            last_used_ms: AtomicU64::new(0),
            cart: Mutex::new(cart),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Time since the session was last looked up or used
    pub fn idle_for(&self) -> Duration {
        let last_used = Duration::from_millis(self.last_used_ms.load(Ordering::Relaxed));
        self.opened.elapsed().saturating_sub(last_used)
    }

    fn touch(&self) {
        let elapsed = u64::try_from(self.opened.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.last_used_ms.store(elapsed, Ordering::Relaxed);
    }

    /// Run `future` with this session as the active session
    pub async fn scope<F: Future>(self: &Arc<Self>, future: F) -> F::Output {
        ACTIVE_SESSION.scope(Arc::clone(self), future).await
    }

    /// Handle for callers that already own the context
    pub fn handle(self: &Arc<Self>) -> CartHandle {
        CartHandle {
            session: Arc::clone(self),
        }
    }
}

/// Capability to use the cart of the active session.
///
/// Operations on one session are serialized, so each one observes every
/// earlier one. Mutations return the cart as it is right after the change.
#[derive(Debug, Clone)]
pub struct CartHandle {
    session: Arc<SessionContext>,
}

impl CartHandle {
    /// Handle of the session bound to the current task.
    ///
    /// Fails with [`CartError::NoActiveSession`] outside [`SessionContext::scope`].
    pub fn current() -> CartResult<Self> {
        ACTIVE_SESSION
            .try_with(|session| CartHandle {
                session: Arc::clone(session),
            })
            .map_err(|_| CartError::NoActiveSession)
    }

    pub fn session_id(&self) -> Uuid {
        self.session.id
    }

    async fn cart(&self) -> MutexGuard<'_, CartStore> {
        self.session.touch();
        self.session.cart.lock().await
    }

    pub async fn add_item(&self, candidate: CartItemCandidate) -> CartView {
        let mut cart = self.cart().await;
        cart.add_item(candidate);
        cart.view()
    }

    /// Normalize a catalog listing and add it
    pub async fn add_listing(&self, listing: ServiceListing) -> CartResult<CartView> {
        let candidate = CartItemCandidate::try_from(listing)?;
        Ok(self.add_item(candidate).await)
    }

    pub async fn remove_item(&self, index: usize) -> CartView {
        let mut cart = self.cart().await;
        cart.remove_item(index);
        cart.view()
    }

    pub async fn update_quantity(&self, index: usize, quantity: i64) -> CartView {
        let mut cart = self.cart().await;
        cart.update_quantity(index, quantity);
        cart.view()
    }

    pub async fn clear(&self) -> CartView {
        let mut cart = self.cart().await;
        cart.clear();
        cart.view()
    }

    pub async fn view(&self) -> CartView {
        self.cart().await.view()
    }

    pub async fn item_count(&self) -> u64 {
        self.cart().await.item_count()
    }

    pub async fn total_amount(&self) -> Decimal {
        self.cart().await.total_amount()
    }
}

/// Creates, looks up and tears down sessions
pub struct SessionRegistry {
    store: Arc<dyn SnapshotStore>,
    snapshot_name: String,
    default_origin: String,
    sessions: RwLock<HashMap<Uuid, Arc<SessionContext>>>,
    metrics: Option<Arc<Metrics>>,
}

impl SessionRegistry {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        snapshot_name: &str,
        default_origin: &str,
        metrics: Option<Arc<Metrics>>,
    ) -> CartResult<Self> {
        SnapshotKey::new(default_origin, snapshot_name)?;

        Ok(Self {
            store,
            snapshot_name: snapshot_name.to_string(),
            default_origin: default_origin.to_string(),
            sessions: RwLock::new(HashMap::new()),
            metrics,
        })
    }

    /// Start a session on `origin` (or the default origin), restoring its cart
    #[instrument(skip(self))]
    pub async fn start_session(&self, origin: Option<&str>) -> CartResult<Arc<SessionContext>> {
        let origin = origin.unwrap_or(&self.default_origin);
        let key = SnapshotKey::new(origin, &self.snapshot_name)?;

        let cart = CartStore::initialize(Arc::clone(&self.store), key, self.metrics.clone()).await;
        let context = Arc::new(SessionContext::new(origin, cart));

        self.sessions
            .write()
            .await
            .insert(context.id, Arc::clone(&context));

        if let Some(metrics) = &self.metrics {
            metrics.session_started();
        }

        info!(session_id = %context.id, origin = %context.origin, "Session started");
        Ok(context)
    }

    pub async fn session(&self, session_id: Uuid) -> CartResult<Arc<SessionContext>> {
        let context = self
            .sessions
            .read()
            .await
            .get(&session_id)
            .cloned()
            .ok_or(CartError::SessionNotFound { session_id })?;

        context.touch();
        Ok(context)
    }

    /// End a session; returns once its last cart state has been persisted
    #[instrument(skip(self))]
    pub async fn end_session(&self, session_id: Uuid) -> CartResult<()> {
        let context = self
            .sessions
            .write()
            .await
            .remove(&session_id)
            .ok_or(CartError::SessionNotFound { session_id })?;

        self.teardown(&context).await;
        info!(session_id = %session_id, "Session ended");
        Ok(())
    }

    /// End every live session
    pub async fn shutdown(&self) {
        let contexts: Vec<_> = self.sessions.write().await.drain().map(|(_, c)| c).collect();
        if contexts.is_empty() {
            return;
        }

        info!(sessions = contexts.len(), "Ending active sessions");
        for context in contexts {
            self.teardown(&context).await;
        }
    }

    /// End sessions unused for longer than `idle_timeout`, persisting their
    /// carts. Sessions with an operation in flight are left alone.
    pub async fn reap_idle(&self, idle_timeout: Duration) -> usize {
        let expired: Vec<_> = {
            let mut sessions = self.sessions.write().await;
            let ids: Vec<Uuid> = sessions
                .values()
                .filter(|context| {
                    context.idle_for() > idle_timeout && context.cart.try_lock().is_ok()
                })
                .map(|context| context.id)
                .collect();
            ids.iter().filter_map(|id| sessions.remove(id)).collect()
        };

        for context in &expired {
            self.teardown(context).await;
            info!(
                session_id = %context.id,
                idle_ms = context.idle_for().as_millis() as u64,
                "Idle session ended"
            );
        }
        expired.len()
    }

    /// Run [`SessionRegistry::reap_idle`] every `interval` until the registry
    /// is dropped or the task is aborted
    pub fn spawn_reaper(
        self: &Arc<Self>,
        idle_timeout: Duration,
        interval: Duration,
    ) -> JoinHandle<()> {
        let registry = Arc::downgrade(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };

                let ended = registry.reap_idle(idle_timeout).await;
                if ended > 0 {
                    debug!(ended, "Idle sweep finished");
                }
            }
        })
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn teardown(&self, context: &SessionContext) {
        // Waits for any in-flight operation on this session first
        context.cart.lock().await.flush().await;

        if let Some(metrics) = &self.metrics {
            metrics.session_ended();
        }
    }

    pub fn default_origin(&self) -> &str {
        &self.default_origin
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("backend", &self.store.backend())
            .field("snapshot_name", &self.snapshot_name)
            .field("default_origin", &self.default_origin)
            .finish()
    }
}
