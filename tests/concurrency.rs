//! Races against the three critical sections: seat claims, voucher
//! redemptions at the cap, and session creation in one room.

mod common;

use std::collections::HashSet;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use tokio::task::JoinSet;

use cinema_system::error::AppError;
use cinema_system::models::BookingStatus;
use cinema_system::services::{CreateBookingRequest, CreateSessionRequest};
use cinema_system::store::{BookingStore, VoucherStore};

use common::{app, app_with_session, at};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_claims_for_one_seat_produce_one_winner() {
    let (app, session, seats) = app_with_session(1).await;
    let seat_id = seats[0].id;

    let mut tasks = JoinSet::new();
    for user in 1..=8i64 {
        let bookings = app.state.bookings.clone();
        let session_id = session.id;
        tasks.spawn(async move {
            bookings
                .create_booking(CreateBookingRequest {
                    user_id: user,
                    session_id,
                    seat_ids: vec![seat_id],
                    voucher_code: None,
                })
                .await
        });
    }

    let mut won = 0;
    let mut conflicts = 0;
    while let Some(res) = tasks.join_next().await {
        match res.unwrap() {
            Ok(booking) => {
                won += 1;
                assert_eq!(booking.status, BookingStatus::Unconfirmed);
            }
            Err(AppError::Conflict(_)) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(won, 1);
    assert_eq!(conflicts, 7);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_seat_sets_never_double_claim() {
    let (app, session, seats) = app_with_session(3).await;
    let (a1, a2, a3) = (seats[0].id, seats[1].id, seats[2].id);

    // Both requests want A2; all-or-nothing means the loser gets no seat at
    // all, not a partial set.
    let mut tasks = JoinSet::new();
    for (user, wanted) in [(1i64, vec![a1, a2]), (2, vec![a2, a3])] {
        let bookings = app.state.bookings.clone();
        let session_id = session.id;
        tasks.spawn(async move {
            (
                wanted.clone(),
                bookings
                    .create_booking(CreateBookingRequest {
                        user_id: user,
                        session_id,
                        seat_ids: wanted,
                        voucher_code: None,
                    })
                    .await,
            )
        });
    }

    let mut winner_seats = Vec::new();
    let mut losses = 0;
    while let Some(res) = tasks.join_next().await {
        let (wanted, outcome) = res.unwrap();
        match outcome {
            Ok(_) => winner_seats.extend(wanted),
            Err(AppError::Conflict(_)) => losses += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(losses, 1);

    let claimed = BookingStore::claimed_seat_ids(app.store.as_ref(), session.id)
        .await
        .unwrap();
    assert_eq!(claimed, winner_seats.iter().copied().collect::<HashSet<_>>());
    assert!(claimed.len() <= seats.len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn last_voucher_use_goes_to_exactly_one_booking() {
    let (app, session, seats) = app_with_session(10).await;
    let future = Utc::now().naive_utc() + Duration::days(7);
    let voucher = app
        .store
        .add_voucher("LAST1", Decimal::new(2, 1), future, 3, 2)
        .await;

    // Ten bookings for ten different seats all racing for the one remaining
    // use; seat availability is never the bottleneck here.
    let mut tasks = JoinSet::new();
    for (user, seat) in seats.iter().enumerate() {
        let bookings = app.state.bookings.clone();
        let session_id = session.id;
        let seat_id = seat.id;
        tasks.spawn(async move {
            bookings
                .create_booking(CreateBookingRequest {
                    user_id: user as i64 + 1,
                    session_id,
                    seat_ids: vec![seat_id],
                    voucher_code: Some("LAST1".to_string()),
                })
                .await
        });
    }

    let mut succeeded = 0;
    while let Some(res) = tasks.join_next().await {
        match res.unwrap() {
            Ok(booking) => {
                succeeded += 1;
                // 10.00 * 0.8
                assert_eq!(booking.total_amount, Decimal::new(800, 2));
            }
            Err(AppError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(succeeded, 1);

    let stored = VoucherStore::get(app.store.as_ref(), voucher.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.uses, stored.max_uses);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_session_creations_in_one_room_admit_one() {
    let app = app().await;
    let room = app.store.add_room("Sala 1").await;

    let mut tasks = JoinSet::new();
    for creator in 1..=10i64 {
        let scheduler = app.state.scheduler.clone();
        let room_id = room.id;
        tasks.spawn(async move {
            scheduler
                .create_session(CreateSessionRequest {
                    room_id,
                    movie_id: 1,
                    creator_id: creator,
                    starts_at: at(18, 0),
                    ends_at: at(20, 0),
                    base_price: Decimal::new(1200, 2),
                })
                .await
        });
    }

    let mut created = 0;
    while let Some(res) = tasks.join_next().await {
        match res.unwrap() {
            Ok(_) => created += 1,
            Err(AppError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(created, 1);
}
