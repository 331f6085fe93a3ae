//! Postgres store. The two storage-level constraints from the migrations do
//! the heavy lifting: `sessions_no_overlap` (gist exclusion over the room id
//! and the half-open time range) and `booking_seats_one_active_claim`
//! (partial unique index over active claims). Violations are mapped to
//! `AppError::Conflict` here.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::{
    Booking, BookingSeat, BookingStatus, NewBooking, NewSession, Room, Seat, SeatClaim, Session,
    Voucher,
};
use crate::store::{BookingStore, SessionStore, VenueStore, VoucherStore};

#[derive(Clone)]
pub struct PgStore {
    pub pool: PgPool,
}

impl PgStore {
    pub async fn new(database_url: &str, pool_size: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        Ok(PgStore { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("./src/migrations").run(&self.pool).await?;
        info!("Migrations completed");
        Ok(())
    }
}

fn is_constraint_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db) => db.constraint() == Some(constraint),
        _ => false,
    }
}

fn session_from_row(row: &sqlx::postgres::PgRow) -> Session {
    Session {
        id: row.get("id"),
        room_id: row.get("room_id"),
        movie_id: row.get("movie_id"),
        creator_id: row.get("creator_id"),
        starts_at: row.get("starts_at"),
        ends_at: row.get("ends_at"),
        base_price: row.get("base_price"),
    }
}

fn booking_from_row(row: &sqlx::postgres::PgRow) -> AppResult<Booking> {
    let status: String = row.get("status");
    Ok(Booking {
        id: row.get("id"),
        user_id: row.get("user_id"),
        session_id: row.get("session_id"),
        status: status.parse()?,
        total_amount: row.get("total_amount"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn voucher_from_row(row: &sqlx::postgres::PgRow) -> Voucher {
    Voucher {
        id: row.get("id"),
        code: row.get("code"),
        discount: row.get("discount"),
        valid_until: row.get("valid_until"),
        max_uses: row.get("max_uses"),
        uses: row.get("uses"),
    }
}

#[async_trait]
impl VenueStore for PgStore {
    async fn room(&self, room_id: i64) -> AppResult<Option<Room>> {
        let row = sqlx::query_as::<_, (i64, String)>("SELECT id, name FROM rooms WHERE id = $1")
            .bind(room_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(id, name)| Room { id, name }))
    }

    async fn seat(&self, seat_id: i64) -> AppResult<Option<Seat>> {
        let row = sqlx::query_as::<_, (i64, i64, String, String)>(
            "SELECT id, room_id, label, seat_type FROM seats WHERE id = $1",
        )
        .bind(seat_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|(id, room_id, label, seat_type)| {
            Ok(Seat {
                id,
                room_id,
                label,
                seat_type: seat_type.parse()?,
            })
        })
        .transpose()
    }

    async fn seats_in_room(&self, room_id: i64) -> AppResult<Vec<Seat>> {
        let rows = sqlx::query_as::<_, (i64, i64, String, String)>(
            "SELECT id, room_id, label, seat_type FROM seats WHERE room_id = $1 ORDER BY id",
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|(id, room_id, label, seat_type)| {
                Ok(Seat {
                    id,
                    room_id,
                    label,
                    seat_type: seat_type.parse()?,
                })
            })
            .collect()
    }
}

const SESSION_COLUMNS: &str = "id, room_id, movie_id, creator_id, starts_at, ends_at, base_price";

#[async_trait]
impl SessionStore for PgStore {
    async fn get(&self, id: i64) -> AppResult<Option<Session>> {
        let row = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(session_from_row))
    }

    async fn in_room_on(&self, room_id: i64, date: NaiveDate) -> AppResult<Vec<Session>> {
        let day_start = date.and_hms_opt(0, 0, 0).expect("midnight is always valid");
        let day_end = day_start + chrono::Duration::days(1);
        let rows = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions
             WHERE room_id = $1 AND starts_at < $3 AND ends_at > $2
             ORDER BY starts_at"
        ))
        .bind(room_id)
        .bind(day_start)
        .bind(day_end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(session_from_row).collect())
    }

    async fn insert(&self, session: NewSession) -> AppResult<Session> {
        let res = sqlx::query(&format!(
            "INSERT INTO sessions (room_id, movie_id, creator_id, starts_at, ends_at, base_price)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(session.room_id)
        .bind(session.movie_id)
        .bind(session.creator_id)
        .bind(session.starts_at)
        .bind(session.ends_at)
        .bind(session.base_price)
        .fetch_one(&self.pool)
        .await;

        match res {
            Ok(row) => Ok(session_from_row(&row)),
            Err(e) if is_constraint_violation(&e, "sessions_no_overlap") => {
                Err(AppError::conflict("schedule conflict"))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, session: Session) -> AppResult<Session> {
        let res = sqlx::query(&format!(
            "UPDATE sessions
             SET room_id = $2, movie_id = $3, creator_id = $4,
                 starts_at = $5, ends_at = $6, base_price = $7
             WHERE id = $1
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(session.id)
        .bind(session.room_id)
        .bind(session.movie_id)
        .bind(session.creator_id)
        .bind(session.starts_at)
        .bind(session.ends_at)
        .bind(session.base_price)
        .fetch_optional(&self.pool)
        .await;

        match res {
            Ok(Some(row)) => Ok(session_from_row(&row)),
            Ok(None) => Err(AppError::not_found(format!("session {}", session.id))),
            Err(e) if is_constraint_violation(&e, "sessions_no_overlap") => {
                Err(AppError::conflict("schedule conflict"))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, id: i64) -> AppResult<Session> {
        let row = sqlx::query(&format!(
            "DELETE FROM sessions WHERE id = $1 RETURNING {SESSION_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref()
            .map(session_from_row)
            .ok_or_else(|| AppError::not_found(format!("session {id}")))
    }
}

const BOOKING_COLUMNS: &str = "id, user_id, session_id, status, total_amount, created_at, updated_at";

#[async_trait]
impl BookingStore for PgStore {
    async fn get(&self, id: i64) -> AppResult<Option<Booking>> {
        let row = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(booking_from_row).transpose()
    }

    async fn seats_of(&self, booking_id: i64) -> AppResult<Vec<BookingSeat>> {
        let rows = sqlx::query_as::<_, (i64, i64, Decimal)>(
            "SELECT booking_id, seat_id, price FROM booking_seats WHERE booking_id = $1 ORDER BY seat_id",
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(booking_id, seat_id, price)| BookingSeat {
                booking_id,
                seat_id,
                price,
            })
            .collect())
    }

    async fn claimed_seat_ids(&self, session_id: i64) -> AppResult<HashSet<i64>> {
        let rows = sqlx::query_scalar::<_, i64>(
            "SELECT seat_id FROM booking_seats WHERE session_id = $1 AND active",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    async fn has_active_for_session(&self, session_id: i64) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM bookings WHERE session_id = $1 AND status <> 'cancelled')",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn create_with_seats(
        &self,
        booking: NewBooking,
        seats: Vec<SeatClaim>,
    ) -> AppResult<Booking> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "INSERT INTO bookings (user_id, session_id, status, total_amount)
             VALUES ($1, $2, 'unconfirmed', $3)
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(booking.user_id)
        .bind(booking.session_id)
        .bind(booking.total_amount)
        .fetch_one(&mut *tx)
        .await?;
        let created = booking_from_row(&row)?;

        // All seat rows go in together; the partial unique index rejects any
        // seat already held by an active booking of this session, which rolls
        // back the whole allocation.
        for claim in seats {
            let res = sqlx::query(
                "INSERT INTO booking_seats (booking_id, session_id, seat_id, price)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(created.id)
            .bind(booking.session_id)
            .bind(claim.seat_id)
            .bind(claim.price)
            .execute(&mut *tx)
            .await;

            if let Err(e) = res {
                tx.rollback().await.ok();
                if is_constraint_violation(&e, "booking_seats_one_active_claim") {
                    return Err(AppError::conflict("seat no longer available"));
                }
                return Err(e.into());
            }
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn set_status(&self, id: i64, status: BookingStatus) -> AppResult<Booking> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "UPDATE bookings SET status = $2, updated_at = now()
             WHERE id = $1
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&mut *tx)
        .await?;
        let updated = row
            .as_ref()
            .map(booking_from_row)
            .transpose()?
            .ok_or_else(|| AppError::not_found(format!("booking {id}")))?;

        if status == BookingStatus::Cancelled {
            // Seats become claimable again; rows are kept for audit.
            sqlx::query("UPDATE booking_seats SET active = FALSE WHERE booking_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(updated)
    }
}

const VOUCHER_COLUMNS: &str = "id, code, discount, valid_until, max_uses, uses";

#[async_trait]
impl VoucherStore for PgStore {
    async fn by_code(&self, code: &str) -> AppResult<Option<Voucher>> {
        let row = sqlx::query(&format!(
            "SELECT {VOUCHER_COLUMNS} FROM vouchers WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(voucher_from_row))
    }

    async fn get(&self, id: i64) -> AppResult<Option<Voucher>> {
        let row = sqlx::query(&format!(
            "SELECT {VOUCHER_COLUMNS} FROM vouchers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(voucher_from_row))
    }

    async fn consume_use(&self, id: i64) -> AppResult<bool> {
        // Conditional increment: two redemptions racing for the last use
        // cannot both match the `uses < max_uses` predicate.
        let affected =
            sqlx::query("UPDATE vouchers SET uses = uses + 1 WHERE id = $1 AND uses < max_uses")
                .bind(id)
                .execute(&self.pool)
                .await?
                .rows_affected();
        if affected > 0 {
            return Ok(true);
        }
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM vouchers WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        if exists {
            Ok(false)
        } else {
            Err(AppError::not_found(format!("voucher {id}")))
        }
    }

    async fn release_use(&self, id: i64) -> AppResult<()> {
        sqlx::query("UPDATE vouchers SET uses = uses - 1 WHERE id = $1 AND uses > 0")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
