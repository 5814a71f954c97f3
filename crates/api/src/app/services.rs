use std::sync::Arc;

use tracing::{info, warn};

use storefront_events::EventBus;
use storefront_infra::cart_store::{CartStore, InMemoryCartStore, PostgresCartStore};
use storefront_infra::catalog_store::{CatalogStore, InMemoryCatalogStore, PostgresCatalogStore};
use storefront_infra::order_ledger::{InMemoryOrderLedger, OrderLedger, PostgresOrderLedger};
use storefront_infra::{
    CartService, CatalogService, CheckoutService, EventPublisher, FulfillmentService, ReviewGate, StoreError, db,
};

/// Everything the handlers need, built once per process.
pub struct AppServices {
    pub catalog: CatalogService,
    pub carts: CartService,
    pub checkout: CheckoutService,
    pub reviews: ReviewGate,
    pub fulfillment: FulfillmentService,
    pub publisher: EventPublisher,
}

impl AppServices {
    pub fn from_stores(
        catalog: Arc<dyn CatalogStore>,
        carts: Arc<dyn CartStore>,
        ledger: Arc<dyn OrderLedger>,
        publisher: EventPublisher,
    ) -> Self {
        Self {
            catalog: CatalogService::new(catalog.clone(), publisher.clone()),
            carts: CartService::new(carts.clone(), catalog.clone()),
            checkout: CheckoutService::new(catalog.clone(), carts, ledger.clone(), publisher.clone()),
            reviews: ReviewGate::new(catalog, ledger.clone(), publisher.clone()),
            fulfillment: FulfillmentService::new(ledger, publisher.clone()),
            publisher,
        }
    }

    pub fn in_memory() -> Self {
        Self::from_stores(
            Arc::new(InMemoryCatalogStore::new()),
            Arc::new(InMemoryCartStore::new()),
            Arc::new(InMemoryOrderLedger::new()),
            EventPublisher::default(),
        )
    }
}

/// Pick the backend: Postgres when a database URL is configured, in-memory otherwise.
pub async fn build_services(database_url: Option<&str>, max_connections: u32) -> Result<AppServices, StoreError> {
    let services = match database_url {
        Some(url) => {
            let pool = db::connect(url, max_connections).await?;
            info!("using postgres stores");
            AppServices::from_stores(
                Arc::new(PostgresCatalogStore::new(pool.clone())),
                Arc::new(PostgresCartStore::new(pool.clone())),
                Arc::new(PostgresOrderLedger::new(pool)),
                EventPublisher::default(),
            )
        }
        None => {
            warn!("DATABASE_URL not set; state is in memory and lost on restart");
            AppServices::in_memory()
        }
    };

    spawn_audit_log(&services.publisher);
    Ok(services)
}

/// Log every published domain event.
///
/// The bus hands out blocking receivers, so the loop lives on the blocking
/// pool and ends when the bus is dropped.
pub fn spawn_audit_log(publisher: &EventPublisher) {
    let sub = publisher.bus().subscribe();

    tokio::task::spawn_blocking(move || {
        while let Ok(message) = sub.recv() {
            info!(
                event_id = %message.event_id(),
                event_type = message.event_type(),
                aggregate_type = message.aggregate_type(),
                aggregate_id = %message.aggregate_id(),
                "domain event"
            );
        }
    });
}
