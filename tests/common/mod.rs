#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use cinema_system::config::Config;
use cinema_system::models::{Seat, SeatType, Session};
use cinema_system::services::{CreateSessionRequest, InProcessGateway};
use cinema_system::store::{MemoryStore, Stores};
use cinema_system::AppState;

pub struct TestApp {
    pub state: Arc<AppState>,
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<InProcessGateway>,
}

pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
}

pub fn at(hour: u32, minute: u32) -> NaiveDateTime {
    day().and_hms_opt(hour, minute, 0).unwrap()
}

fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                std::env::var("RUST_LOG").unwrap_or_else(|_| "cinema_system=info".to_string()),
            )
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub async fn app() -> TestApp {
    init_tracing();
    let store = MemoryStore::new();
    let gateway = InProcessGateway::new();
    let state = AppState::new(
        Stores::in_memory(store.clone()),
        gateway.clone(),
        Config::default(),
    );
    TestApp {
        state,
        store,
        gateway,
    }
}

/// App with one room, `seat_count` standard seats, and a session 10:00-12:00
/// at base price 10.00.
pub async fn app_with_session(seat_count: usize) -> (TestApp, Session, Vec<Seat>) {
    let app = app().await;
    let room = app.store.add_room("Sala 1").await;
    let mut seats = Vec::with_capacity(seat_count);
    for i in 0..seat_count {
        seats.push(
            app.store
                .add_seat(room.id, &format!("A{}", i + 1), SeatType::Standard)
                .await,
        );
    }
    let session = app
        .state
        .scheduler
        .create_session(CreateSessionRequest {
            room_id: room.id,
            movie_id: 1,
            creator_id: 1,
            starts_at: at(10, 0),
            ends_at: at(12, 0),
            base_price: Decimal::new(1000, 2),
        })
        .await
        .unwrap();
    (app, session, seats)
}
