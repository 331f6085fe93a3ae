use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::{Room, Seat};
use crate::store::VenueStore;

/// Lookup surface over rooms and seats. Venue data changes rarely and only
/// outside this engine, so the catalog is read-only.
#[derive(Clone)]
pub struct VenueCatalog {
    store: Arc<dyn VenueStore>,
}

impl VenueCatalog {
    pub fn new(store: Arc<dyn VenueStore>) -> Self {
        VenueCatalog { store }
    }

    pub async fn room(&self, room_id: i64) -> AppResult<Room> {
        self.store
            .room(room_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("room {room_id}")))
    }

    pub async fn seat(&self, seat_id: i64) -> AppResult<Seat> {
        self.store
            .seat(seat_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("seat {seat_id}")))
    }

    pub async fn seats_in_room(&self, room_id: i64) -> AppResult<Vec<Seat>> {
        if self.store.room(room_id).await?.is_none() {
            return Err(AppError::not_found(format!("room {room_id}")));
        }
        self.store.seats_in_room(room_id).await
    }
}
