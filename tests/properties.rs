//! Property tests over the scheduling engine: the no-overlap invariant and
//! the soundness/completeness of the free-slot computation. All generated
//! intervals sit on the 15-minute grid inside the 10:00-23:00 window.

mod common;

use chrono::{Duration, NaiveDateTime};
use proptest::prelude::*;
use rust_decimal::Decimal;

use cinema_system::error::AppError;
use cinema_system::services::CreateSessionRequest;

use common::at;

fn overlaps(a: (NaiveDateTime, NaiveDateTime), b: (NaiveDateTime, NaiveDateTime)) -> bool {
    a.0 < b.1 && b.0 < a.1
}

fn grid(slot: u32) -> NaiveDateTime {
    at(10, 0) + Duration::minutes(slot as i64 * 15)
}

/// Creates sessions for the generated intervals, returning the accepted ones.
/// Panics if an accepted session overlaps a previous one or a rejected one
/// did not actually conflict.
async fn feed_schedule(
    app: &common::TestApp,
    room_id: i64,
    intervals: &[(u32, u32)],
) -> Vec<(NaiveDateTime, NaiveDateTime)> {
    let mut accepted: Vec<(NaiveDateTime, NaiveDateTime)> = Vec::new();
    for &(slot, len_slots) in intervals {
        let start = grid(slot);
        let end = (start + Duration::minutes(len_slots as i64 * 15)).min(at(23, 0));
        if start >= end {
            continue;
        }
        let res = app
            .state
            .scheduler
            .create_session(CreateSessionRequest {
                room_id,
                movie_id: 1,
                creator_id: 1,
                starts_at: start,
                ends_at: end,
                base_price: Decimal::new(1000, 2),
            })
            .await;
        match res {
            Ok(_) => {
                assert!(
                    !accepted.iter().any(|&a| overlaps(a, (start, end))),
                    "accepted session {start}..{end} overlaps an earlier one"
                );
                accepted.push((start, end));
            }
            Err(AppError::Conflict(_)) => {
                assert!(
                    accepted.iter().any(|&a| overlaps(a, (start, end))),
                    "rejected session {start}..{end} conflicts with nothing"
                );
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    accepted
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn accepted_sessions_never_overlap(
        intervals in prop::collection::vec((0u32..52, 1u32..16), 1..12),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let app = common::app().await;
            let room = app.store.add_room("Sala P").await;
            feed_schedule(&app, room.id, &intervals).await;
        });
    }

    #[test]
    fn available_times_match_a_brute_force_scan(
        intervals in prop::collection::vec((0u32..52, 1u32..16), 0..8),
        runtime_slots in 1u32..12,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let app = common::app().await;
            let room = app.store.add_room("Sala P").await;
            let busy = feed_schedule(&app, room.id, &intervals).await;

            let runtime = Duration::minutes(runtime_slots as i64 * 15);
            let mut expected = Vec::new();
            let mut t = at(10, 0);
            while t + runtime <= at(23, 0) {
                if !busy.iter().any(|&b| overlaps(b, (t, t + runtime))) {
                    expected.push(t);
                }
                t += Duration::minutes(15);
            }

            let res = app
                .state
                .scheduler
                .available_times(room.id, common::day(), runtime_slots as i64 * 15)
                .await;
            match res {
                Ok(slots) => assert_eq!(slots, expected),
                Err(AppError::NotFound(_)) => assert!(expected.is_empty()),
                Err(other) => panic!("unexpected error: {other}"),
            }
        });
    }

    #[test]
    fn every_returned_slot_actually_schedules(
        intervals in prop::collection::vec((0u32..52, 1u32..16), 0..6),
        runtime_slots in 1u32..12,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let app = common::app().await;
            let room = app.store.add_room("Sala P").await;
            feed_schedule(&app, room.id, &intervals).await;

            let runtime_minutes = runtime_slots as i64 * 15;
            let slots = match app
                .state
                .scheduler
                .available_times(room.id, common::day(), runtime_minutes)
                .await
            {
                Ok(slots) => slots,
                Err(AppError::NotFound(_)) => return,
                Err(other) => panic!("unexpected error: {other}"),
            };

            // Scheduling at a proposed slot must never conflict.
            for &slot in slots.iter().take(3) {
                let session = app
                    .state
                    .scheduler
                    .create_session(CreateSessionRequest {
                        room_id: room.id,
                        movie_id: 1,
                        creator_id: 1,
                        starts_at: slot,
                        ends_at: slot + Duration::minutes(runtime_minutes),
                        base_price: Decimal::new(1000, 2),
                    })
                    .await
                    .expect("proposed slot must be schedulable");
                app.state.scheduler.delete_session(session.id).await.unwrap();
            }
        });
    }
}
