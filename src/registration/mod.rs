pub mod clock;
pub mod ledger;

pub use clock::{Clock, SystemClock};
pub use ledger::{RegistrationLedger, RegistrationRow, RegistrationState, REGISTRATION_HEADER};
