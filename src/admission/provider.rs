//! Allow-list provider contract and the in-memory store
//!
//! The gateway only consumes point lookups; where the entries live (memory,
//! database) is the embedder's concern. `MemoryAllowlist` is the bundled
//! provider used by deployments that push their list in at startup.

use std::collections::{HashMap, HashSet};
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;

/// One admitted address with its bookkeeping fields
#[derive(Debug, Clone)]
pub struct AdmissionEntry {
    /// Device IP address
    pub ip_address: String,
    /// Whether the entry currently admits connections
    pub active: bool,
    /// Free-form operator note
    pub description: Option<String>,
    /// When the entry was created
    pub created_at: SystemTime,
    /// Last time the address connected
    pub last_access_at: SystemTime,
}

impl std::fmt::Display for AdmissionEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "AdmissionEntry{{ip='{}', active={}, description={:?}}}",
            self.ip_address, self.active, self.description
        )
    }
}

/// Supplies the set of admitted addresses
///
/// Lookup failures must surface as `Err` so admission control can fail
/// closed; a provider must never admit by default on error.
#[async_trait]
pub trait AllowlistProvider: Send + Sync {
    /// Whether the address is currently admitted
    async fn is_allowed(&self, ip_address: &str) -> Result<bool>;

    /// Snapshot of all admitted addresses
    async fn allowed_addresses(&self) -> Result<HashSet<String>>;

    /// Record that the address connected (last-access bookkeeping)
    async fn mark_seen(&self, ip_address: &str);
}

/// In-memory allow-list store
pub struct MemoryAllowlist {
    entries: RwLock<HashMap<String, AdmissionEntry>>,
}

impl MemoryAllowlist {
    /// Create an empty allow-list (open mode: everything is admitted)
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Create a list from plain addresses
    pub async fn with_addresses<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list = Self::new();
        for address in addresses {
            list.add(address, None).await;
        }
        list
    }

    /// Add or replace an entry
    pub async fn add(&self, ip_address: impl Into<String>, description: Option<String>) {
        let ip_address = ip_address.into();
        let now = SystemTime::now();
        let entry = AdmissionEntry {
            ip_address: ip_address.clone(),
            active: true,
            description: description.clone(),
            created_at: now,
            last_access_at: now,
        };

        self.entries.write().await.insert(ip_address.clone(), entry);
        tracing::info!(ip = %ip_address, description = ?description, "IP added to whitelist");
    }

    /// Remove an entry; no-op if absent
    pub async fn remove(&self, ip_address: &str) {
        if self.entries.write().await.remove(ip_address).is_some() {
            tracing::info!(ip = %ip_address, "IP removed from whitelist");
        } else {
            tracing::warn!(ip = %ip_address, "Attempted to remove non-existent IP");
        }
    }

    /// Enable or disable an entry without removing it
    pub async fn set_active(&self, ip_address: &str, active: bool) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(ip_address) {
            entry.active = active;
            tracing::info!(ip = %ip_address, active = active, "IP entry state changed");
        } else {
            tracing::warn!(ip = %ip_address, "Attempted to modify non-existent IP");
        }
    }

    /// Look up a single entry
    pub async fn find(&self, ip_address: &str) -> Option<AdmissionEntry> {
        self.entries.read().await.get(ip_address).cloned()
    }

    /// Snapshot of every entry
    pub async fn entries(&self) -> Vec<AdmissionEntry> {
        self.entries.read().await.values().cloned().collect()
    }

    /// Number of entries (active or not)
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for MemoryAllowlist {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AllowlistProvider for MemoryAllowlist {
    async fn is_allowed(&self, ip_address: &str) -> Result<bool> {
        let entries = self.entries.read().await;
        Ok(entries.get(ip_address).map(|e| e.active).unwrap_or(false))
    }

    async fn allowed_addresses(&self) -> Result<HashSet<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .values()
            .filter(|e| e.active)
            .map(|e| e.ip_address.clone())
            .collect())
    }

    async fn mark_seen(&self, ip_address: &str) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(ip_address) {
            entry.last_access_at = SystemTime::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_and_lookup() {
        let list = MemoryAllowlist::new();
        list.add("10.1.1.20", Some("Test Client".into())).await;

        assert!(list.is_allowed("10.1.1.20").await.unwrap());
        assert!(!list.is_allowed("10.1.1.99").await.unwrap());
    }

    #[tokio::test]
    async fn test_inactive_entry_is_not_allowed() {
        let list = MemoryAllowlist::new();
        list.add("10.1.1.20", None).await;
        list.set_active("10.1.1.20", false).await;

        assert!(!list.is_allowed("10.1.1.20").await.unwrap());
        assert!(!list.allowed_addresses().await.unwrap().contains("10.1.1.20"));
    }

    #[tokio::test]
    async fn test_mark_seen_updates_last_access() {
        let list = MemoryAllowlist::new();
        list.add("10.1.1.20", None).await;

        let before = list.find("10.1.1.20").await.unwrap().last_access_at;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        list.mark_seen("10.1.1.20").await;
        let after = list.find("10.1.1.20").await.unwrap().last_access_at;

        assert!(after > before);
    }

    #[tokio::test]
    async fn test_with_addresses() {
        let list = MemoryAllowlist::with_addresses(["127.0.0.1", "10.1.1.20"]).await;
        assert_eq!(list.len().await, 2);
        assert!(list.is_allowed("127.0.0.1").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove() {
        let list = MemoryAllowlist::new();
        list.add("10.1.1.20", None).await;
        list.remove("10.1.1.20").await;

        assert!(list.is_empty().await);
        assert!(!list.is_allowed("10.1.1.20").await.unwrap());
    }
}
