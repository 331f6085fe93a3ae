use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A scheduled screening: one movie, one room, one time interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub room_id: i64,
    pub movie_id: i64,
    pub creator_id: i64,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    pub base_price: Decimal,
}

impl Session {
    /// Half-open interval overlap test: touching endpoints do not overlap.
    pub fn overlaps(&self, starts_at: NaiveDateTime, ends_at: NaiveDateTime) -> bool {
        starts_at < self.ends_at && self.starts_at < ends_at
    }
}

/// Session payload before the store has assigned an id.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub room_id: i64,
    pub movie_id: i64,
    pub creator_id: i64,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    pub base_price: Decimal,
}
