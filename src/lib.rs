pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

use std::sync::Arc;

use crate::config::Config;
use crate::services::{
    BookingService, InventoryService, PaymentGateway, SchedulerService, VenueCatalog,
    VoucherService,
};
use crate::store::{PgStore, Stores};

// Shared state wiring the engine's services over one set of repositories.
pub struct AppState {
    pub catalog: VenueCatalog,
    pub scheduler: SchedulerService,
    pub inventory: InventoryService,
    pub bookings: BookingService,
    pub vouchers: VoucherService,
    pub config: Config,
}

impl AppState {
    pub fn new(stores: Stores, gateway: Arc<dyn PaymentGateway>, config: Config) -> Arc<Self> {
        let catalog = VenueCatalog::new(stores.venue.clone());
        let scheduler = SchedulerService::new(
            stores.sessions.clone(),
            stores.venue.clone(),
            stores.bookings.clone(),
            config.scheduling.clone(),
        );
        let inventory = InventoryService::new(
            stores.venue.clone(),
            stores.sessions.clone(),
            stores.bookings.clone(),
            config.pricing.clone(),
        );
        let vouchers = VoucherService::new(stores.vouchers.clone(), config.voucher.clone());
        let bookings = BookingService::new(
            stores.bookings,
            stores.sessions,
            stores.venue,
            inventory.clone(),
            vouchers.clone(),
            gateway,
        );

        Arc::new(Self {
            catalog,
            scheduler,
            inventory,
            bookings,
            vouchers,
            config,
        })
    }

    /// Connects to Postgres, runs migrations, and wires the engine on top.
    pub async fn connect(
        gateway: Arc<dyn PaymentGateway>,
        config: Config,
    ) -> Result<Arc<Self>, Box<dyn std::error::Error>> {
        let url = config
            .database
            .url
            .as_deref()
            .ok_or("DATABASE_URL must be set")?;
        let store = Arc::new(PgStore::new(url, config.database.pool_size).await?);
        store.run_migrations().await?;
        Ok(Self::new(Stores::postgres(store), gateway, config))
    }
}
