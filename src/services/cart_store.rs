use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument, warn};

use crate::models::{Cart, CartAction, CartItemCandidate, CartView, LineItem};
use crate::observability::Metrics;
use crate::repositories::{SnapshotKey, SnapshotStore};

enum WriterCommand {
    Persist(String),
    Flush(oneshot::Sender<()>),
}

/// Background writer that keeps the durable snapshot in step with the cart.
///
/// Snapshots queued while a write is in flight are coalesced: only the most
/// recent one is written.
struct SnapshotWriter {
    sender: mpsc::UnboundedSender<WriterCommand>,
}

impl SnapshotWriter {
    fn spawn(
        store: Arc<dyn SnapshotStore>,
        key: SnapshotKey,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<WriterCommand>();

        tokio::spawn(async move {
            while let Some(command) = receiver.recv().await {
                let mut latest = None;
                let mut waiters = Vec::new();
                absorb(command, &mut latest, &mut waiters);
                while let Ok(next) = receiver.try_recv() {
                    absorb(next, &mut latest, &mut waiters);
                }

                if let Some(payload) = latest {
                    let result = store.save(&key, &payload).await;
                    if let Some(metrics) = &metrics {
                        metrics.record_snapshot_operation("write", result.is_ok());
                    }
                    match result {
                        Ok(()) => debug!(key = %key, "Cart snapshot persisted"),
                        Err(e) => warn!(key = %key, "Failed to persist cart snapshot: {}", e),
                    }
                }

                for waiter in waiters {
                    // The flusher may have given up waiting
                    waiter.send(()).ok();
                }
            }
            debug!(key = %key, "Snapshot writer stopped");
        });

        Self { sender }
    }

    fn persist(&self, payload: String) {
        if self.sender.send(WriterCommand::Persist(payload)).is_err() {
            warn!("Snapshot writer is gone, cart change not persisted");
        }
    }

    async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.sender.send(WriterCommand::Flush(ack)).is_err() {
            return;
        }
        done.await.ok();
    }
}

fn absorb(
    command: WriterCommand,
    latest: &mut Option<String>,
    waiters: &mut Vec<oneshot::Sender<()>>,
) {
    match command {
        WriterCommand::Persist(payload) => *latest = Some(payload),
        WriterCommand::Flush(ack) => waiters.push(ack),
    }
}

/// Owner of one session's cart.
///
/// Every mutation is applied to the in-memory cart first and then handed to
/// the snapshot writer; callers never wait for persistence. The in-memory cart
/// stays authoritative when persistence fails.
pub struct CartStore {
    key: SnapshotKey,
    cart: Cart,
    writer: SnapshotWriter,
    metrics: Option<Arc<Metrics>>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("key", &self.key)
            .field("items", &self.cart.len())
            .finish()
    }
}

impl CartStore {
    /// Load the latest snapshot for `key`, or start empty.
    ///
    /// Missing, unreadable and corrupt snapshots all yield an empty cart.
    #[instrument(skip(store, metrics), fields(key = %key, backend = store.backend()))]
    pub async fn initialize(
        store: Arc<dyn SnapshotStore>,
        key: SnapshotKey,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        let loaded = store.load(&key).await;
        if let Some(metrics) = &metrics {
            metrics.record_snapshot_operation("read", loaded.is_ok());
        }

        let cart = match loaded {
            Ok(Some(payload)) => match Cart::from_snapshot(&payload) {
                Ok(cart) => {
                    info!(items = cart.len(), "Cart restored from snapshot");
                    cart
                }
                Err(e) => {
                    warn!("Discarding corrupt cart snapshot: {}", e);
                    Cart::new()
                }
            },
            Ok(None) => {
                debug!("No cart snapshot found, starting empty");
                Cart::new()
            }
            Err(e) => {
                warn!("Failed to read cart snapshot, starting empty: {}", e);
                Cart::new()
            }
        };

        let writer = SnapshotWriter::spawn(store, key.clone(), metrics.clone());

        Self {
            key,
            cart,
            writer,
            metrics,
        }
    }

    /// Add a service, merging with an existing line of the same service and method
    pub fn add_item(&mut self, candidate: CartItemCandidate) {
        self.dispatch(CartAction::AddItem(candidate));
    }

    /// Remove the line at `index`; out-of-range indices change nothing
    pub fn remove_item(&mut self, index: usize) {
        self.dispatch(CartAction::RemoveItem { index });
    }

    /// Set the quantity of the line at `index`; `quantity <= 0` removes it
    pub fn update_quantity(&mut self, index: usize, quantity: i64) {
        self.dispatch(CartAction::UpdateQuantity { index, quantity });
    }

    pub fn clear(&mut self) {
        self.dispatch(CartAction::Clear);
    }

    pub fn items(&self) -> &[LineItem] {
        self.cart.items()
    }

    pub fn item_count(&self) -> u64 {
        self.cart.item_count()
    }

    pub fn total_amount(&self) -> rust_decimal::Decimal {
        self.cart.total_amount()
    }

    pub fn view(&self) -> CartView {
        CartView::from(&self.cart)
    }

    pub fn key(&self) -> &SnapshotKey {
        &self.key
    }

    /// Wait until every snapshot dispatched so far has been written (or failed)
    pub async fn flush(&self) {
        self.writer.flush().await;
    }

    fn dispatch(&mut self, action: CartAction) {
        let operation = action.name();
        self.cart.apply(action);
        debug!(
            key = %self.key,
            operation,
            items = self.cart.len(),
            "Cart updated"
        );

        if let Some(metrics) = &self.metrics {
            metrics.record_cart_operation(operation);
        }

        match self.cart.to_snapshot() {
            Ok(payload) => self.writer.persist(payload),
            Err(e) => warn!(key = %self.key, "Failed to serialize cart snapshot: {}", e),
        }
    }
}
