use std::sync::Arc;

use crate::identity::IdentityProvider;

/// Environment variable naming the single authorized writer.
pub const ADMIN_EMAIL_ENV: &str = "FOLIO_ADMIN_EMAIL";

/// Read the configured admin email; blank or unset means unconfigured.
pub fn admin_email_from_env() -> Option<String> {
    match std::env::var(ADMIN_EMAIL_ENV) {
        Ok(value) if !value.trim().is_empty() => {
            Some(value.trim().to_owned())
        }
        _ => None,
    }
}

/// "Signed in" is not "permitted to write": only the configured admin
/// identity is. Absent identity or absent configuration both deny.
pub fn is_authorized_writer(
    identity: Option<&str>,
    admin: Option<&str>,
) -> bool {
    match (identity, admin) {
        (Some(identity), Some(admin)) => {
            let identity = identity.trim();
            let admin = admin.trim();
            !identity.is_empty()
                && !admin.is_empty()
                && identity.eq_ignore_ascii_case(admin)
        }
        _ => false,
    }
}

/// Authorization gate over a live identity provider.
///
/// `allows` re-derives the answer from the provider on every call, so a
/// mid-session sign-out (or account switch) takes effect immediately at
/// the next mutation attempt.
pub struct AccessGate<P> {
    provider: Arc<P>,
    admin_email: Option<String>,
}

impl<P: IdentityProvider> AccessGate<P> {
    pub fn new(provider: Arc<P>, admin_email: Option<String>) -> Self {
        Self {
            provider,
            admin_email,
        }
    }

    pub fn from_env(provider: Arc<P>) -> Self {
        Self::new(provider, admin_email_from_env())
    }

    pub fn allows(&self) -> bool {
        let identity = self.provider.current_identity();
        is_authorized_writer(
            identity.as_ref().map(|i| i.email.as_str()),
            self.admin_email.as_deref(),
        )
    }
}
