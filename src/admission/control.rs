//! Admission decision for new connections
//!
//! Stateless: given a candidate remote address, consult the injected
//! allow-list provider. An empty list means open mode. Any lookup failure
//! denies the connection (fail-closed).

use std::sync::Arc;

use super::provider::AllowlistProvider;

/// Decides whether a candidate remote address may connect
pub struct AdmissionControl {
    provider: Arc<dyn AllowlistProvider>,
}

impl AdmissionControl {
    pub fn new(provider: Arc<dyn AllowlistProvider>) -> Self {
        Self { provider }
    }

    /// Whether the address is admitted
    ///
    /// Open mode when the configured list is empty; otherwise the address
    /// must be present and active. Rejected sockets must be closed by the
    /// caller before any registry interaction.
    pub async fn is_admitted(&self, ip_address: &str) -> bool {
        let allowed = match self.provider.allowed_addresses().await {
            Ok(addresses) => addresses,
            Err(e) => {
                tracing::error!(ip = %ip_address, error = %e, "Allowlist lookup failed, denying");
                return false;
            }
        };

        if allowed.is_empty() {
            return true;
        }

        if allowed.contains(ip_address) {
            return true;
        }

        match self.provider.is_allowed(ip_address).await {
            Ok(allowed) => allowed,
            Err(e) => {
                tracing::error!(ip = %ip_address, error = %e, "Allowlist lookup failed, denying");
                false
            }
        }
    }

    /// Record a successful connection for last-access bookkeeping
    pub async fn mark_seen(&self, ip_address: &str) {
        self.provider.mark_seen(ip_address).await;
    }
}
