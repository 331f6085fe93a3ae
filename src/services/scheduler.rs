use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::config::SchedulingConfig;
use crate::error::{AppError, AppResult};
use crate::models::{NewSession, Session};
use crate::store::{BookingStore, SessionStore, VenueStore};

#[derive(Debug, Clone)]
pub struct CreateSessionRequest {
    pub room_id: i64,
    pub movie_id: i64,
    pub creator_id: i64,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    pub base_price: Decimal,
}

#[derive(Debug, Clone)]
pub struct UpdateSessionRequest {
    pub room_id: i64,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    pub base_price: Decimal,
}

/// Owns session time ranges. Input validation happens here; the overlap
/// invariant itself is enforced atomically inside the session store, so a
/// race between two creations in the same room cannot corrupt the schedule.
#[derive(Clone)]
pub struct SchedulerService {
    sessions: Arc<dyn SessionStore>,
    venue: Arc<dyn VenueStore>,
    bookings: Arc<dyn BookingStore>,
    config: SchedulingConfig,
}

impl SchedulerService {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        venue: Arc<dyn VenueStore>,
        bookings: Arc<dyn BookingStore>,
        config: SchedulingConfig,
    ) -> Self {
        SchedulerService {
            sessions,
            venue,
            bookings,
            config,
        }
    }

    async fn validate_interval(
        &self,
        room_id: i64,
        starts_at: NaiveDateTime,
        ends_at: NaiveDateTime,
        base_price: Decimal,
    ) -> AppResult<()> {
        if starts_at >= ends_at {
            return Err(AppError::validation("session start must precede its end"));
        }
        if base_price < Decimal::ZERO {
            return Err(AppError::validation("base price must not be negative"));
        }
        if self.venue.room(room_id).await?.is_none() {
            return Err(AppError::validation(format!("room {room_id} does not exist")));
        }
        Ok(())
    }

    pub async fn create_session(&self, req: CreateSessionRequest) -> AppResult<Session> {
        // Movie and creator live in out-of-process catalogs; their ids are
        // only sanity-checked here.
        if req.movie_id <= 0 {
            return Err(AppError::validation("movie_id must be > 0"));
        }
        if req.creator_id <= 0 {
            return Err(AppError::validation("creator_id must be > 0"));
        }
        self.validate_interval(req.room_id, req.starts_at, req.ends_at, req.base_price)
            .await?;

        let session = self
            .sessions
            .insert(NewSession {
                room_id: req.room_id,
                movie_id: req.movie_id,
                creator_id: req.creator_id,
                starts_at: req.starts_at,
                ends_at: req.ends_at,
                base_price: req.base_price,
            })
            .await?;
        info!(
            session_id = session.id,
            room_id = session.room_id,
            "session scheduled"
        );
        Ok(session)
    }

    pub async fn update_session(&self, id: i64, req: UpdateSessionRequest) -> AppResult<Session> {
        let existing = self
            .sessions
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("session {id}")))?;
        self.validate_interval(req.room_id, req.starts_at, req.ends_at, req.base_price)
            .await?;

        // Moving a session invalidates what ticket holders bought; forbidden
        // once any non-cancelled booking exists. Price changes stay allowed.
        let moved = existing.room_id != req.room_id
            || existing.starts_at != req.starts_at
            || existing.ends_at != req.ends_at;
        if moved && self.bookings.has_active_for_session(id).await? {
            return Err(AppError::conflict("session has active bookings"));
        }

        self.sessions
            .update(Session {
                id,
                room_id: req.room_id,
                movie_id: existing.movie_id,
                creator_id: existing.creator_id,
                starts_at: req.starts_at,
                ends_at: req.ends_at,
                base_price: req.base_price,
            })
            .await
    }

    pub async fn delete_session(&self, id: i64) -> AppResult<Session> {
        if self.sessions.get(id).await?.is_none() {
            return Err(AppError::not_found(format!("session {id}")));
        }
        if self.bookings.has_active_for_session(id).await? {
            return Err(AppError::conflict("session has active bookings"));
        }
        let deleted = self.sessions.delete(id).await?;
        info!(session_id = id, "session deleted");
        Ok(deleted)
    }

    /// Start times at which a screening of `runtime_minutes` could be
    /// scheduled in the room on the given date without conflicting. Computed
    /// fresh on every call; the schedule may change between calls.
    pub async fn available_times(
        &self,
        room_id: i64,
        date: NaiveDate,
        runtime_minutes: i64,
    ) -> AppResult<Vec<NaiveDateTime>> {
        if runtime_minutes <= 0 {
            return Err(AppError::validation("runtime must be positive"));
        }
        // Bounded before Duration construction; chrono panics on overflow.
        if runtime_minutes > 24 * 60 {
            return Err(AppError::validation("runtime must fit within a single day"));
        }
        if self.venue.room(room_id).await?.is_none() {
            return Err(AppError::validation(format!("room {room_id} does not exist")));
        }

        let open = date.and_time(
            NaiveTime::from_hms_opt(self.config.open_hour, 0, 0)
                .expect("configured open hour out of range"),
        );
        let close = date.and_time(
            NaiveTime::from_hms_opt(self.config.close_hour, 0, 0)
                .expect("configured close hour out of range"),
        );
        let runtime = Duration::minutes(runtime_minutes);
        let step = Duration::minutes(self.config.slot_granularity_minutes as i64);

        // Busy intervals clipped to the operating window, already sorted and
        // pairwise disjoint per the scheduling invariant.
        let busy: Vec<(NaiveDateTime, NaiveDateTime)> = self
            .sessions
            .in_room_on(room_id, date)
            .await?
            .into_iter()
            .filter(|s| s.overlaps(open, close))
            .map(|s| (s.starts_at.max(open), s.ends_at.min(close)))
            .collect();

        let mut slots = Vec::new();
        let mut cursor = open;
        for (busy_start, busy_end) in busy.iter().copied().chain([(close, close)]) {
            let mut start = cursor;
            while start + runtime <= busy_start {
                slots.push(start);
                start += step;
            }
            cursor = cursor.max(busy_end);
        }

        debug!(
            room_id,
            %date,
            runtime_minutes,
            slot_count = slots.len(),
            "computed available start times"
        );
        if slots.is_empty() {
            return Err(AppError::not_found("no available time slots"));
        }
        Ok(slots)
    }
}
