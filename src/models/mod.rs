pub mod booking;
pub mod room;
pub mod session;
pub mod voucher;

pub use booking::{Booking, BookingSeat, BookingStatus, NewBooking, SeatClaim};
pub use room::{Room, Seat, SeatType};
pub use session::{NewSession, Session};
pub use voucher::Voucher;
