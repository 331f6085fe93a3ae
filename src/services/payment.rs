//! Payment gateway adapter. The engine only needs two things from a gateway:
//! open a payment session for a booking's total, and report what became of
//! it. The real HTTP client lives outside this crate; `InProcessGateway` is
//! the stand-in used by tests and local runs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

/// Handle returned by the gateway for one payment attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSession {
    pub id: Uuid,
    pub booking_id: i64,
    pub amount: Decimal,
    pub status: PaymentStatus,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_session(
        &self,
        booking_id: i64,
        amount: Decimal,
    ) -> AppResult<PaymentSession>;

    async fn payment_status(&self, payment_id: Uuid) -> AppResult<PaymentStatus>;
}

/// Gateway stand-in keeping payment sessions in memory. Tests flip a session
/// to paid or failed via `complete` to simulate the asynchronous callback of
/// a real gateway.
#[derive(Default)]
pub struct InProcessGateway {
    sessions: Mutex<HashMap<Uuid, PaymentSession>>,
}

impl InProcessGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(InProcessGateway::default())
    }

    pub async fn complete(&self, payment_id: Uuid, status: PaymentStatus) -> AppResult<()> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&payment_id)
            .ok_or_else(|| AppError::not_found(format!("payment session {payment_id}")))?;
        session.status = status;
        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for InProcessGateway {
    async fn create_payment_session(
        &self,
        booking_id: i64,
        amount: Decimal,
    ) -> AppResult<PaymentSession> {
        let session = PaymentSession {
            id: Uuid::new_v4(),
            booking_id,
            amount,
            status: PaymentStatus::Pending,
        };
        self.sessions
            .lock()
            .await
            .insert(session.id, session.clone());
        Ok(session)
    }

    async fn payment_status(&self, payment_id: Uuid) -> AppResult<PaymentStatus> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(&payment_id)
            .map(|s| s.status)
            .ok_or_else(|| AppError::not_found(format!("payment session {payment_id}")))
    }
}
