use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    pub name: String,
}

/// Seat category. The price multiplier table is static venue-catalog data,
/// not per-seat configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatType {
    Standard,
    Vip,
    Reduced,
}

impl SeatType {
    /// Multiplier applied to the session base price.
    pub fn multiplier(self) -> Decimal {
        match self {
            SeatType::Standard => Decimal::new(100, 2), // 1.00
            SeatType::Vip => Decimal::new(130, 2),      // 1.30
            SeatType::Reduced => Decimal::new(70, 2),   // 0.70
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SeatType::Standard => "standard",
            SeatType::Vip => "vip",
            SeatType::Reduced => "reduced",
        }
    }
}

impl std::str::FromStr for SeatType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(SeatType::Standard),
            "vip" => Ok(SeatType::Vip),
            "reduced" => Ok(SeatType::Reduced),
            other => Err(AppError::validation(format!("unknown seat type: {other}"))),
        }
    }
}

/// A physical seat. Belongs to exactly one room for its lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seat {
    pub id: i64,
    pub room_id: i64,
    pub label: String,
    pub seat_type: SeatType,
}
