use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Booking lifecycle. `Confirmed` and `Cancelled` are terminal; the engine
/// itself never self-confirms — the transition is driven by the payment
/// collaborator or an administrative action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Unconfirmed,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::Cancelled)
    }

    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Unconfirmed, BookingStatus::Confirmed)
                | (BookingStatus::Unconfirmed, BookingStatus::Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Unconfirmed => "unconfirmed",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unconfirmed" => Ok(BookingStatus::Unconfirmed),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(AppError::validation(format!("unknown booking status: {other}"))),
        }
    }
}

/// A user's claim on a set of seats for one session. `total_amount` is
/// derived from the seat prices and voucher discount, never edited on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub user_id: i64,
    pub session_id: i64,
    pub status: BookingStatus,
    pub total_amount: Decimal,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Join fact: which seat, at what price, belongs to which booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingSeat {
    pub booking_id: i64,
    pub seat_id: i64,
    pub price: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub user_id: i64,
    pub session_id: i64,
    pub total_amount: Decimal,
}

/// One seat of a pending allocation, priced for its session.
#[derive(Debug, Clone)]
pub struct SeatClaim {
    pub seat_id: i64,
    pub price: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unconfirmed_transitions_are_legal() {
        use BookingStatus::*;
        assert!(Unconfirmed.can_transition_to(Confirmed));
        assert!(Unconfirmed.can_transition_to(Cancelled));
        assert!(!Confirmed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Confirmed));
        assert!(!Unconfirmed.can_transition_to(Unconfirmed));
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&BookingStatus::Unconfirmed).unwrap(),
            "\"unconfirmed\""
        );
        let parsed: BookingStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(parsed, BookingStatus::Cancelled);
        assert_eq!("confirmed".parse::<BookingStatus>().unwrap(), BookingStatus::Confirmed);
    }
}
