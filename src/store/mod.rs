//! Repository traits, one per aggregate, injected into the services.
//!
//! The three critical sections of the engine live behind these traits:
//! session insert/update re-check the no-overlap invariant atomically,
//! `create_with_seats` is an all-or-nothing seat claim, and `consume_use`
//! is a guarded counter increment. Services perform their own friendly
//! pre-checks, but only the store-level re-check is authoritative.

pub mod memory;
pub mod postgres;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::AppResult;
use crate::models::{
    Booking, BookingSeat, BookingStatus, NewBooking, NewSession, Room, Seat, SeatClaim, Session,
    Voucher,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Read access to rooms and seats. Venue data is mutated rarely and outside
/// the engine's hot paths, so no write operations are exposed here.
#[async_trait]
pub trait VenueStore: Send + Sync {
    async fn room(&self, room_id: i64) -> AppResult<Option<Room>>;
    async fn seat(&self, seat_id: i64) -> AppResult<Option<Seat>>;
    async fn seats_in_room(&self, room_id: i64) -> AppResult<Vec<Seat>>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, id: i64) -> AppResult<Option<Session>>;
    /// Sessions of a room whose interval touches the given calendar date.
    async fn in_room_on(&self, room_id: i64, date: NaiveDate) -> AppResult<Vec<Session>>;
    /// Inserts after an atomic overlap re-check against the room's other
    /// sessions. Conflict if the interval overlaps any of them.
    async fn insert(&self, session: NewSession) -> AppResult<Session>;
    /// Same re-check as `insert`, excluding the session being updated.
    async fn update(&self, session: Session) -> AppResult<Session>;
    async fn delete(&self, id: i64) -> AppResult<Session>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn get(&self, id: i64) -> AppResult<Option<Booking>>;
    async fn seats_of(&self, booking_id: i64) -> AppResult<Vec<BookingSeat>>;
    /// Seat ids held by non-cancelled bookings of the session.
    async fn claimed_seat_ids(&self, session_id: i64) -> AppResult<HashSet<i64>>;
    async fn has_active_for_session(&self, session_id: i64) -> AppResult<bool>;
    /// All-or-nothing claim: every seat is re-checked against active claims
    /// inside the same atomic section as the insert. Conflict if any seat is
    /// already taken; nothing partial is left behind.
    async fn create_with_seats(
        &self,
        booking: NewBooking,
        seats: Vec<SeatClaim>,
    ) -> AppResult<Booking>;
    /// Persists a status change. Cancelling deactivates the booking's seat
    /// claims for availability purposes while retaining the rows for audit.
    async fn set_status(&self, id: i64, status: BookingStatus) -> AppResult<Booking>;
}

#[async_trait]
pub trait VoucherStore: Send + Sync {
    async fn by_code(&self, code: &str) -> AppResult<Option<Voucher>>;
    async fn get(&self, id: i64) -> AppResult<Option<Voucher>>;
    /// Guarded increment of the use counter: succeeds only while
    /// `uses < max_uses`. Returns false when the cap is reached.
    async fn consume_use(&self, id: i64) -> AppResult<bool>;
    /// Rollback of `consume_use` when the booking it paid for never commits.
    async fn release_use(&self, id: i64) -> AppResult<()>;
}

/// Bundle of the four repositories, the unit the engine is wired from.
#[derive(Clone)]
pub struct Stores {
    pub venue: Arc<dyn VenueStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub bookings: Arc<dyn BookingStore>,
    pub vouchers: Arc<dyn VoucherStore>,
}

impl Stores {
    /// All four repositories backed by one in-memory store.
    pub fn in_memory(store: Arc<MemoryStore>) -> Self {
        Stores {
            venue: store.clone(),
            sessions: store.clone(),
            bookings: store.clone(),
            vouchers: store,
        }
    }

    /// All four repositories backed by one Postgres pool.
    pub fn postgres(store: Arc<PgStore>) -> Self {
        Stores {
            venue: store.clone(),
            sessions: store.clone(),
            bookings: store.clone(),
            vouchers: store,
        }
    }
}
