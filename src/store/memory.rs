//! # In-memory provider
//!
//! Process-local storage with the same semantics as the filesystem
//! provider, minus durability. Backs the crate's tests and local
//! experimentation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use chrono::Utc;

use crate::gnap::provider::{
    GrantStore, KeyNotFound, KeyRegistry, Metadata, Provider, Result, TokenStore, UnknownKey,
};
use crate::gnap::state::{Grant, GrantStatus};
use crate::gnap::types::{AccessTokenRequest, Config, GrantRequest, RsKeyRecord, TokenRecord};
use crate::jose::PublicKeyJwk;

/// An in-memory provider.
#[derive(Clone, Debug, Default)]
pub struct MemoryProvider {
    config: Config,
    grants: Arc<Mutex<HashMap<String, Grant>>>,
    tokens: Arc<Mutex<HashMap<String, TokenRecord>>>,
    keys: Arc<Mutex<HashMap<String, HashMap<String, RsKeyRecord>>>>,
}

impl MemoryProvider {
    /// Create an empty provider with the given configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config, ..Self::default() }
    }
}

impl Provider for MemoryProvider {}

impl Metadata for MemoryProvider {
    async fn config(&self) -> Result<Config> {
        Ok(self.config.clone())
    }
}

impl GrantStore for MemoryProvider {
    async fn create(&self, request: GrantRequest) -> Result<Grant> {
        let grant = Grant::new(request, self.config.grant_ttl_seconds);
        self.grants.lock().expect("should lock").insert(grant.id.clone(), grant.clone());
        Ok(grant)
    }

    async fn get(&self, grant_id: &str) -> Result<Option<Grant>> {
        let mut grants = self.grants.lock().expect("should lock");

        let Some(grant) = grants.get_mut(grant_id) else {
            return Ok(None);
        };
        grant.expire_if_due();
        Ok(Some(grant.clone()))
    }

    async fn find_pending_by_user_code(&self, code: &str) -> Result<Option<Grant>> {
        if code.is_empty() {
            return Ok(None);
        }

        let grants = self.grants.lock().expect("should lock");
        Ok(grants
            .values()
            .find(|g| {
                g.status == GrantStatus::Pending
                    && !g.is_expired()
                    && g.user_code.as_deref() == Some(code)
            })
            .cloned())
    }

    async fn mark_code_verified(&self, grant_id: &str) -> Result<()> {
        let mut grants = self.grants.lock().expect("should lock");

        let grant = grants.get_mut(grant_id).ok_or_else(|| anyhow!("grant not found"))?;
        grant.mark_code_verified()
    }

    async fn approve(
        &self, grant_id: &str, approved: Vec<AccessTokenRequest>, subject: Option<String>,
    ) -> Result<Grant> {
        let mut grants = self.grants.lock().expect("should lock");

        let grant = grants.get_mut(grant_id).ok_or_else(|| anyhow!("grant not found"))?;
        if grant.expire_if_due() {
            return Err(anyhow!("grant expired"));
        }
        grant.approve(approved, subject)?;
        Ok(grant.clone())
    }

    async fn deny(&self, grant_id: &str) -> Result<Grant> {
        let mut grants = self.grants.lock().expect("should lock");

        let grant = grants.get_mut(grant_id).ok_or_else(|| anyhow!("grant not found"))?;
        if grant.expire_if_due() {
            return Err(anyhow!("grant expired"));
        }
        grant.deny()?;
        Ok(grant.clone())
    }

    async fn record_poll(&self, grant_id: &str) -> Result<()> {
        let mut grants = self.grants.lock().expect("should lock");

        let grant = grants.get_mut(grant_id).ok_or_else(|| anyhow!("grant not found"))?;
        grant.last_polled_at = Some(Utc::now());
        Ok(())
    }

    async fn consume_continuation(&self, grant_id: &str) -> Result<()> {
        let mut grants = self.grants.lock().expect("should lock");

        let grant = grants.get_mut(grant_id).ok_or_else(|| anyhow!("grant not found"))?;
        grant.continuation_token = String::new();
        grant.updated_at = Utc::now();
        Ok(())
    }
}

impl TokenStore for MemoryProvider {
    async fn put(&self, record: TokenRecord) -> Result<()> {
        self.tokens.lock().expect("should lock").insert(record.hash_b64.clone(), record);
        Ok(())
    }

    async fn get_by_hash(&self, hash_b64: &str) -> Result<Option<TokenRecord>> {
        Ok(self.tokens.lock().expect("should lock").get(hash_b64).cloned())
    }

    async fn revoke(&self, hash_b64: &str) -> Result<()> {
        if let Some(record) = self.tokens.lock().expect("should lock").get_mut(hash_b64) {
            record.revoked = true;
        }
        Ok(())
    }

    async fn cleanup_expired(&self, now: i64) -> Result<usize> {
        let mut tokens = self.tokens.lock().expect("should lock");
        let before = tokens.len();
        tokens.retain(|_, r| !(r.exp > 0 && r.exp <= now));
        Ok(before - tokens.len())
    }
}

impl KeyRegistry for MemoryProvider {
    async fn upsert(
        &self, tenant: &str, pub_jwk: PublicKeyJwk, kid: Option<String>, alg: Option<String>,
        display_rs: Option<String>, accept_tofu: bool,
    ) -> Result<RsKeyRecord> {
        let thumb = pub_jwk.thumbprint()?;

        let mut keys = self.keys.lock().expect("should lock");
        let tenant_keys = keys.entry(tenant.to_string()).or_default();

        let record = if let Some(existing) = tenant_keys.get(&thumb) {
            let mut updated = existing.clone();
            updated.kid = kid;
            updated.alg = alg;
            updated.display_rs = display_rs;
            updated.pub_jwk = pub_jwk;
            updated.active = true;
            updated
        } else {
            if !accept_tofu {
                return Err(anyhow::Error::new(UnknownKey));
            }
            RsKeyRecord {
                tenant: tenant.to_string(),
                thumb256: thumb.clone(),
                kid,
                alg,
                pub_jwk,
                active: true,
                created_at: Utc::now(),
                rotated_at: None,
                display_rs,
            }
        };

        tenant_keys.insert(thumb, record.clone());
        Ok(record)
    }

    async fn get(&self, tenant: &str, thumb256: &str) -> Result<Option<RsKeyRecord>> {
        Ok(self
            .keys
            .lock()
            .expect("should lock")
            .get(tenant)
            .and_then(|keys| keys.get(thumb256))
            .cloned())
    }

    async fn list(&self, tenant: &str) -> Result<Vec<RsKeyRecord>> {
        Ok(self
            .keys
            .lock()
            .expect("should lock")
            .get(tenant)
            .map(|keys| keys.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn deactivate(&self, tenant: &str, thumb256: &str) -> Result<()> {
        let mut keys = self.keys.lock().expect("should lock");

        let record = keys
            .get_mut(tenant)
            .and_then(|keys| keys.get_mut(thumb256))
            .ok_or_else(|| anyhow::Error::new(KeyNotFound))?;

        record.active = false;
        record.rotated_at = Some(Utc::now());
        Ok(())
    }

    async fn lookup_by_kid(&self, kid: &str) -> Result<RsKeyRecord> {
        let keys = self.keys.lock().expect("should lock");

        for tenant_keys in keys.values() {
            for record in tenant_keys.values() {
                if record.active && record.kid.as_deref() == Some(kid) {
                    return Ok(record.clone());
                }
            }
        }
        Err(anyhow::Error::new(KeyNotFound))
    }

    async fn lookup_by_tenant_kid(&self, tenant: &str, kid: &str) -> Result<RsKeyRecord> {
        let keys = self.keys.lock().expect("should lock");

        let tenant_keys = keys.get(tenant).ok_or_else(|| anyhow::Error::new(KeyNotFound))?;
        tenant_keys
            .values()
            .find(|r| r.active && r.kid.as_deref() == Some(kid))
            .cloned()
            .ok_or_else(|| anyhow::Error::new(KeyNotFound))
    }

    async fn find_by_thumbprint(&self, thumb256: &str) -> Result<Option<RsKeyRecord>> {
        let keys = self.keys.lock().expect("should lock");

        for tenant_keys in keys.values() {
            if let Some(record) = tenant_keys.get(thumb256) {
                return Ok(Some(record.clone()));
            }
        }
        Ok(None)
    }
}
