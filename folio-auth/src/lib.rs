pub mod gate;
pub mod identity;

pub use gate::{admin_email_from_env, is_authorized_writer, AccessGate, ADMIN_EMAIL_ENV};
pub use identity::{Identity, IdentityEvent, IdentityProvider, MemoryIdentityProvider};
