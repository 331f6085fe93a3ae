pub mod booking;
pub mod catalog;
pub mod inventory;
pub mod payment;
pub mod scheduler;
pub mod voucher;

pub use booking::{BookingService, CreateBookingRequest};
pub use catalog::VenueCatalog;
pub use inventory::InventoryService;
pub use payment::{InProcessGateway, PaymentGateway, PaymentSession, PaymentStatus};
pub use scheduler::{CreateSessionRequest, SchedulerService, UpdateSessionRequest};
pub use voucher::VoucherService;
