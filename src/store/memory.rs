//! In-memory store: the reference implementation of the repository traits.
//!
//! Each aggregate sits behind one `tokio::sync::Mutex`, so a check-then-write
//! critical section is a single lock hold. This is what every unit and
//! property test runs against.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, RwLock};

use crate::error::{AppError, AppResult};
use crate::models::{
    Booking, BookingSeat, BookingStatus, NewBooking, NewSession, Room, Seat, SeatClaim, SeatType,
    Session, Voucher,
};
use crate::store::{BookingStore, SessionStore, VenueStore, VoucherStore};

#[derive(Default)]
struct VenueTable {
    rooms: HashMap<i64, Room>,
    seats: HashMap<i64, Seat>,
    next_room_id: i64,
    next_seat_id: i64,
}

#[derive(Default)]
struct SessionTable {
    rows: HashMap<i64, Session>,
    next_id: i64,
}

#[derive(Default)]
struct BookingTable {
    bookings: HashMap<i64, Booking>,
    seats: Vec<BookingSeat>,
    next_id: i64,
}

#[derive(Default)]
struct VoucherTable {
    rows: HashMap<i64, Voucher>,
    next_id: i64,
}

pub struct MemoryStore {
    venue: RwLock<VenueTable>,
    sessions: Mutex<SessionTable>,
    bookings: Mutex<BookingTable>,
    vouchers: Mutex<VoucherTable>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(MemoryStore {
            venue: RwLock::new(VenueTable::default()),
            sessions: Mutex::new(SessionTable::default()),
            bookings: Mutex::new(BookingTable::default()),
            vouchers: Mutex::new(VoucherTable::default()),
        })
    }

    /* ---------- seeding (venue data is mutated outside the hot paths) ---------- */

    pub async fn add_room(&self, name: &str) -> Room {
        let mut venue = self.venue.write().await;
        venue.next_room_id += 1;
        let room = Room {
            id: venue.next_room_id,
            name: name.to_string(),
        };
        venue.rooms.insert(room.id, room.clone());
        room
    }

    pub async fn add_seat(&self, room_id: i64, label: &str, seat_type: SeatType) -> Seat {
        let mut venue = self.venue.write().await;
        venue.next_seat_id += 1;
        let seat = Seat {
            id: venue.next_seat_id,
            room_id,
            label: label.to_string(),
            seat_type,
        };
        venue.seats.insert(seat.id, seat.clone());
        seat
    }

    pub async fn add_voucher(
        &self,
        code: &str,
        discount: Decimal,
        valid_until: NaiveDateTime,
        max_uses: i32,
        uses: i32,
    ) -> Voucher {
        let mut table = self.vouchers.lock().await;
        table.next_id += 1;
        let voucher = Voucher {
            id: table.next_id,
            code: code.to_string(),
            discount,
            valid_until,
            max_uses,
            uses,
        };
        table.rows.insert(voucher.id, voucher.clone());
        voucher
    }
}

#[async_trait]
impl VenueStore for MemoryStore {
    async fn room(&self, room_id: i64) -> AppResult<Option<Room>> {
        Ok(self.venue.read().await.rooms.get(&room_id).cloned())
    }

    async fn seat(&self, seat_id: i64) -> AppResult<Option<Seat>> {
        Ok(self.venue.read().await.seats.get(&seat_id).cloned())
    }

    async fn seats_in_room(&self, room_id: i64) -> AppResult<Vec<Seat>> {
        let venue = self.venue.read().await;
        let mut seats: Vec<Seat> = venue
            .seats
            .values()
            .filter(|s| s.room_id == room_id)
            .cloned()
            .collect();
        seats.sort_by_key(|s| s.id);
        Ok(seats)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, id: i64) -> AppResult<Option<Session>> {
        Ok(self.sessions.lock().await.rows.get(&id).cloned())
    }

    async fn in_room_on(&self, room_id: i64, date: NaiveDate) -> AppResult<Vec<Session>> {
        let day_start = date.and_hms_opt(0, 0, 0).expect("midnight is always valid");
        let day_end = day_start + chrono::Duration::days(1);
        let table = self.sessions.lock().await;
        let mut rows: Vec<Session> = table
            .rows
            .values()
            .filter(|s| s.room_id == room_id && s.overlaps(day_start, day_end))
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.starts_at);
        Ok(rows)
    }

    async fn insert(&self, session: NewSession) -> AppResult<Session> {
        let mut table = self.sessions.lock().await;
        // Overlap re-check and insert under one lock hold.
        let clash = table.rows.values().any(|s| {
            s.room_id == session.room_id && s.overlaps(session.starts_at, session.ends_at)
        });
        if clash {
            return Err(AppError::conflict("schedule conflict"));
        }
        table.next_id += 1;
        let row = Session {
            id: table.next_id,
            room_id: session.room_id,
            movie_id: session.movie_id,
            creator_id: session.creator_id,
            starts_at: session.starts_at,
            ends_at: session.ends_at,
            base_price: session.base_price,
        };
        table.rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update(&self, session: Session) -> AppResult<Session> {
        let mut table = self.sessions.lock().await;
        if !table.rows.contains_key(&session.id) {
            return Err(AppError::not_found(format!("session {}", session.id)));
        }
        let clash = table.rows.values().any(|s| {
            s.id != session.id
                && s.room_id == session.room_id
                && s.overlaps(session.starts_at, session.ends_at)
        });
        if clash {
            return Err(AppError::conflict("schedule conflict"));
        }
        table.rows.insert(session.id, session.clone());
        Ok(session)
    }

    async fn delete(&self, id: i64) -> AppResult<Session> {
        self.sessions
            .lock()
            .await
            .rows
            .remove(&id)
            .ok_or_else(|| AppError::not_found(format!("session {id}")))
    }
}

impl BookingTable {
    fn claimed_for(&self, session_id: i64) -> HashSet<i64> {
        self.seats
            .iter()
            .filter(|bs| {
                self.bookings
                    .get(&bs.booking_id)
                    .map(|b| b.session_id == session_id && b.status != BookingStatus::Cancelled)
                    .unwrap_or(false)
            })
            .map(|bs| bs.seat_id)
            .collect()
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn get(&self, id: i64) -> AppResult<Option<Booking>> {
        Ok(self.bookings.lock().await.bookings.get(&id).cloned())
    }

    async fn seats_of(&self, booking_id: i64) -> AppResult<Vec<BookingSeat>> {
        let table = self.bookings.lock().await;
        Ok(table
            .seats
            .iter()
            .filter(|bs| bs.booking_id == booking_id)
            .cloned()
            .collect())
    }

    async fn claimed_seat_ids(&self, session_id: i64) -> AppResult<HashSet<i64>> {
        Ok(self.bookings.lock().await.claimed_for(session_id))
    }

    async fn has_active_for_session(&self, session_id: i64) -> AppResult<bool> {
        let table = self.bookings.lock().await;
        Ok(table
            .bookings
            .values()
            .any(|b| b.session_id == session_id && b.status != BookingStatus::Cancelled))
    }

    async fn create_with_seats(
        &self,
        booking: NewBooking,
        seats: Vec<SeatClaim>,
    ) -> AppResult<Booking> {
        let mut table = self.bookings.lock().await;
        // The authoritative claim check, inside the same lock hold as the
        // insert. A stale availability read upstream cannot slip through here.
        let claimed = table.claimed_for(booking.session_id);
        if seats.iter().any(|c| claimed.contains(&c.seat_id)) {
            return Err(AppError::conflict("seat no longer available"));
        }
        table.next_id += 1;
        let now = Utc::now().naive_utc();
        let row = Booking {
            id: table.next_id,
            user_id: booking.user_id,
            session_id: booking.session_id,
            status: BookingStatus::Unconfirmed,
            total_amount: booking.total_amount,
            created_at: now,
            updated_at: now,
        };
        table.bookings.insert(row.id, row.clone());
        for claim in seats {
            table.seats.push(BookingSeat {
                booking_id: row.id,
                seat_id: claim.seat_id,
                price: claim.price,
            });
        }
        Ok(row)
    }

    async fn set_status(&self, id: i64, status: BookingStatus) -> AppResult<Booking> {
        let mut table = self.bookings.lock().await;
        let booking = table
            .bookings
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("booking {id}")))?;
        booking.status = status;
        booking.updated_at = Utc::now().naive_utc();
        Ok(booking.clone())
    }
}

#[async_trait]
impl VoucherStore for MemoryStore {
    async fn by_code(&self, code: &str) -> AppResult<Option<Voucher>> {
        let table = self.vouchers.lock().await;
        Ok(table.rows.values().find(|v| v.code == code).cloned())
    }

    async fn get(&self, id: i64) -> AppResult<Option<Voucher>> {
        Ok(self.vouchers.lock().await.rows.get(&id).cloned())
    }

    async fn consume_use(&self, id: i64) -> AppResult<bool> {
        let mut table = self.vouchers.lock().await;
        let voucher = table
            .rows
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("voucher {id}")))?;
        if voucher.uses >= voucher.max_uses {
            return Ok(false);
        }
        voucher.uses += 1;
        Ok(true)
    }

    async fn release_use(&self, id: i64) -> AppResult<()> {
        let mut table = self.vouchers.lock().await;
        let voucher = table
            .rows
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("voucher {id}")))?;
        if voucher.uses > 0 {
            voucher.uses -= 1;
        }
        Ok(())
    }
}
