use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A discount code with an expiry and a capped number of uses. `uses` only
/// ever grows through the ledger's guarded increment (rollback aside), so
/// `uses <= max_uses` holds even under concurrent redemptions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voucher {
    pub id: i64,
    pub code: String,
    /// Discount fraction, 0 < discount <= 1.
    pub discount: Decimal,
    pub valid_until: NaiveDateTime,
    pub max_uses: i32,
    pub uses: i32,
}

impl Voucher {
    pub fn remaining_uses(&self) -> i32 {
        self.max_uses - self.uses
    }

    pub fn is_expired_at(&self, now: NaiveDateTime) -> bool {
        now > self.valid_until
    }
}
