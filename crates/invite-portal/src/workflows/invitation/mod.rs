//! Issued invitation codes and their expiry countdown.

pub mod countdown;
pub mod result;

pub use countdown::{format_remaining, CountdownHandle, ExpiryTracker};
pub use result::InvitationResult;
