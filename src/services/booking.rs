use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::{Booking, BookingStatus, NewBooking, SeatClaim};
use crate::services::inventory::InventoryService;
use crate::services::payment::{PaymentGateway, PaymentSession, PaymentStatus};
use crate::services::voucher::VoucherService;
use crate::store::{BookingStore, SessionStore, VenueStore};

#[derive(Debug, Clone)]
pub struct CreateBookingRequest {
    pub user_id: i64,
    pub session_id: i64,
    pub seat_ids: Vec<i64>,
    pub voucher_code: Option<String>,
}

/// The allocator: turns a seat selection into a priced, seat-committed
/// booking, all or nothing. The availability read here is deliberately
/// allowed to be stale; the booking store re-checks every seat inside the
/// same atomic section as the insert, so two requests racing for a seat end
/// in exactly one success and one conflict.
#[derive(Clone)]
pub struct BookingService {
    bookings: Arc<dyn BookingStore>,
    sessions: Arc<dyn SessionStore>,
    venue: Arc<dyn VenueStore>,
    inventory: InventoryService,
    vouchers: VoucherService,
    gateway: Arc<dyn PaymentGateway>,
}

impl BookingService {
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        sessions: Arc<dyn SessionStore>,
        venue: Arc<dyn VenueStore>,
        inventory: InventoryService,
        vouchers: VoucherService,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        BookingService {
            bookings,
            sessions,
            venue,
            inventory,
            vouchers,
            gateway,
        }
    }

    pub async fn create_booking(&self, req: CreateBookingRequest) -> AppResult<Booking> {
        if req.user_id <= 0 {
            return Err(AppError::validation("user_id must be > 0"));
        }
        let session = self
            .sessions
            .get(req.session_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("session {}", req.session_id)))?;

        if req.seat_ids.is_empty() {
            return Err(AppError::validation("seat list must not be empty"));
        }
        let unique: HashSet<i64> = req.seat_ids.iter().copied().collect();
        if unique.len() != req.seat_ids.len() {
            return Err(AppError::validation("duplicate seat ids in request"));
        }

        let mut claims = Vec::with_capacity(req.seat_ids.len());
        let mut subtotal = Decimal::ZERO;
        for seat_id in &req.seat_ids {
            let seat = self
                .venue
                .seat(*seat_id)
                .await?
                .ok_or_else(|| AppError::validation(format!("seat {seat_id} does not exist")))?;
            if seat.room_id != session.room_id {
                return Err(AppError::validation(format!(
                    "seat {seat_id} does not belong to the session's room"
                )));
            }
            let price = self.inventory.price_for(&session, &seat);
            subtotal += price;
            claims.push(SeatClaim {
                seat_id: seat.id,
                price,
            });
        }

        // Fail fast on an obviously taken seat before touching the voucher
        // counter. This read may be stale; the store re-checks.
        let claimed = self.bookings.claimed_seat_ids(req.session_id).await?;
        if req.seat_ids.iter().any(|id| claimed.contains(id)) {
            return Err(AppError::conflict("seat no longer available"));
        }

        let mut redeemed = None;
        let total = match &req.voucher_code {
            Some(code) => {
                let voucher = self.vouchers.validate(code).await?;
                self.vouchers.redeem(voucher.id).await?;
                let total = self
                    .inventory
                    .round_money(subtotal * (Decimal::ONE - voucher.discount));
                redeemed = Some(voucher.id);
                total
            }
            None => self.inventory.round_money(subtotal),
        };

        let result = self
            .bookings
            .create_with_seats(
                NewBooking {
                    user_id: req.user_id,
                    session_id: req.session_id,
                    total_amount: total,
                },
                claims,
            )
            .await;

        match result {
            Ok(booking) => {
                info!(
                    booking_id = booking.id,
                    session_id = booking.session_id,
                    seats = req.seat_ids.len(),
                    total = %booking.total_amount,
                    "booking created"
                );
                Ok(booking)
            }
            Err(e) => {
                // The claim never committed, so the redeemed use goes back.
                if let Some(voucher_id) = redeemed {
                    if let Err(release_err) = self.vouchers.release(voucher_id).await {
                        warn!(voucher_id, error = %release_err, "voucher rollback failed");
                    }
                }
                Err(e)
            }
        }
    }

    /// Administrative status transition. The engine never self-confirms;
    /// confirmation and cancellation arrive from the payment collaborator or
    /// an operator.
    pub async fn update_booking_status(
        &self,
        booking_id: i64,
        new_status: BookingStatus,
    ) -> AppResult<Booking> {
        let booking = self
            .bookings
            .get(booking_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("booking {booking_id}")))?;
        if !booking.status.can_transition_to(new_status) {
            return Err(AppError::validation(format!(
                "illegal status transition: {} -> {}",
                booking.status.as_str(),
                new_status.as_str()
            )));
        }
        let updated = self.bookings.set_status(booking_id, new_status).await?;
        info!(
            booking_id,
            status = new_status.as_str(),
            "booking status updated"
        );
        Ok(updated)
    }

    /// Opens a payment session at the gateway for an unconfirmed booking.
    pub async fn initiate_payment(&self, booking_id: i64) -> AppResult<PaymentSession> {
        let booking = self
            .bookings
            .get(booking_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("booking {booking_id}")))?;
        if booking.status != BookingStatus::Unconfirmed {
            return Err(AppError::conflict("booking is not awaiting payment"));
        }
        self.gateway
            .create_payment_session(booking.id, booking.total_amount)
            .await
    }

    /// Applies the gateway's verdict: paid confirms, failed cancels (which
    /// releases the seats). A still-pending payment changes nothing.
    pub async fn apply_payment_result(
        &self,
        booking_id: i64,
        status: PaymentStatus,
    ) -> AppResult<Booking> {
        match status {
            PaymentStatus::Paid => {
                self.update_booking_status(booking_id, BookingStatus::Confirmed)
                    .await
            }
            PaymentStatus::Failed => {
                self.update_booking_status(booking_id, BookingStatus::Cancelled)
                    .await
            }
            PaymentStatus::Pending => Err(AppError::validation("payment is still pending")),
        }
    }
}
