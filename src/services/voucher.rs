use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::VoucherConfig;
use crate::error::{AppError, AppResult};
use crate::models::Voucher;
use crate::store::VoucherStore;

/// Validates discount codes and owns the capped use counter. The counter only
/// moves through the store's guarded increment, so `uses` can never overshoot
/// `max_uses` no matter how many redemptions race.
#[derive(Clone)]
pub struct VoucherService {
    store: Arc<dyn VoucherStore>,
    config: VoucherConfig,
}

impl VoucherService {
    pub fn new(store: Arc<dyn VoucherStore>, config: VoucherConfig) -> Self {
        VoucherService { store, config }
    }

    pub async fn validate(&self, code: &str) -> AppResult<Voucher> {
        let voucher = self
            .store
            .by_code(code)
            .await?
            .ok_or_else(|| AppError::not_found(format!("voucher {code}")))?;
        if voucher.is_expired_at(Utc::now().naive_utc()) {
            return Err(AppError::conflict("voucher expired"));
        }
        if voucher.remaining_uses() <= 0 {
            return Err(AppError::conflict("voucher exhausted"));
        }
        Ok(voucher)
    }

    /// Consumes one use. A failed conditional increment is a definitive
    /// "exhausted"; only storage errors are retried, and only a bounded
    /// number of times.
    pub async fn redeem(&self, voucher_id: i64) -> AppResult<()> {
        let mut attempt = 0;
        loop {
            match self.store.consume_use(voucher_id).await {
                Ok(true) => {
                    info!(voucher_id, "voucher use consumed");
                    return Ok(());
                }
                Ok(false) => return Err(AppError::conflict("voucher exhausted")),
                Err(AppError::Database(e)) if attempt + 1 < self.config.redeem_retries => {
                    attempt += 1;
                    warn!(voucher_id, attempt, error = %e, "voucher redeem retry");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Returns a use consumed by `redeem` when the booking it was meant for
    /// never committed.
    pub async fn release(&self, voucher_id: i64) -> AppResult<()> {
        self.store.release_use(voucher_id).await?;
        info!(voucher_id, "voucher use released");
        Ok(())
    }
}
