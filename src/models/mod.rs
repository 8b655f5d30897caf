pub mod booking;
pub mod event;
pub mod offer;
pub mod payment;
pub mod refund;
pub mod seat;
pub mod support;
pub mod ticket;
pub mod user;

pub use booking::{Booking, BookingSeat, BookingStatus};
pub use event::{Event, EventStatus, EventWithInventory};
pub use offer::{Offer, OfferType};
pub use payment::{Payment, PaymentStatus};
pub use refund::{Refund, RefundStatus};
pub use seat::Seat;
pub use support::{SupportStatus, SupportTicket};
pub use ticket::{Ticket, TicketStatus};
pub use user::{PasswordResetToken, User, UserRole};
