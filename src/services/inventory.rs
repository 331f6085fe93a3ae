use std::sync::Arc;

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::warn;

use crate::config::PricingConfig;
use crate::error::{AppError, AppResult};
use crate::models::{Seat, Session};
use crate::store::{BookingStore, SessionStore, VenueStore};

/// Seat availability and pricing for a session. Availability reads are
/// snapshots; the booking allocator re-validates inside the claim's atomic
/// section, so these results may be invalidated by a concurrent write.
#[derive(Clone)]
pub struct InventoryService {
    venue: Arc<dyn VenueStore>,
    sessions: Arc<dyn SessionStore>,
    bookings: Arc<dyn BookingStore>,
    pricing: PricingConfig,
}

impl InventoryService {
    pub fn new(
        venue: Arc<dyn VenueStore>,
        sessions: Arc<dyn SessionStore>,
        bookings: Arc<dyn BookingStore>,
        pricing: PricingConfig,
    ) -> Self {
        InventoryService {
            venue,
            sessions,
            bookings,
            pricing,
        }
    }

    /// Seats of the session's room not held by any non-cancelled booking.
    /// An empty result is a legitimate outcome (sold out), distinct from a
    /// missing session.
    pub async fn available_seats(&self, session_id: i64) -> AppResult<Vec<Seat>> {
        let session = self
            .sessions
            .get(session_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("session {session_id}")))?;

        let seats = self.venue.seats_in_room(session.room_id).await?;
        if seats.is_empty() {
            // Data issue in the venue catalog; surfaced as plain emptiness.
            warn!(
                room_id = session.room_id,
                session_id, "room has zero seats configured"
            );
            return Ok(Vec::new());
        }

        let claimed = self.bookings.claimed_seat_ids(session_id).await?;
        Ok(seats
            .into_iter()
            .filter(|s| !claimed.contains(&s.id))
            .collect())
    }

    /// Price of one seat for one session: base price times the seat-type
    /// multiplier, rounded half-up to the currency's minor unit.
    pub async fn seat_price(&self, seat_id: i64, session_id: i64) -> AppResult<Decimal> {
        let session = self
            .sessions
            .get(session_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("session {session_id}")))?;
        let seat = self
            .venue
            .seat(seat_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("seat {seat_id}")))?;
        if seat.room_id != session.room_id {
            return Err(AppError::not_found(format!(
                "seat {seat_id} in session {session_id}"
            )));
        }
        Ok(self.price_for(&session, &seat))
    }

    pub(crate) fn price_for(&self, session: &Session, seat: &Seat) -> Decimal {
        self.round_money(session.base_price * seat.seat_type.multiplier())
    }

    pub(crate) fn round_money(&self, amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(
            self.pricing.currency_scale,
            RoundingStrategy::MidpointAwayFromZero,
        )
    }
}
