//! # Filesystem provider
//!
//! Durable storage rooted at a data directory:
//!
//! ```text
//! <root>/grants/<uuid>.json                one per grant, 0600
//! <root>/tokens/<hash-b64>.json            one per live token, 0600
//! <root>/rs_keys/<tenant>/<thumb-b64>.json one per RS key, 0644
//! ```
//!
//! Writes go to `<file>.json.tmp`, are fsynced, then renamed into place:
//! after a crash mid-write the committed record is either the previous
//! version or absent, never partial. A canceled operation behaves the same
//! way. A process-local reader-writer lock per store coordinates in-process
//! writers; cross-process safety relies on the filesystem's atomic rename.
//!
//! Token records and key records are cached in memory and reloaded on
//! startup; the files remain the source of truth. Grants are always read
//! from disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use chrono::Utc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::gnap::provider::{
    GrantStore, KeyNotFound, KeyRegistry, Metadata, Provider, Result, TokenStore, UnknownKey,
};
use crate::gnap::state::Grant;
use crate::gnap::types::{AccessTokenRequest, Config, GrantRequest, RsKeyRecord, TokenRecord};
use crate::jose::PublicKeyJwk;

/// The filesystem-backed provider: grant store, token store, key registry,
/// and configuration in one.
#[derive(Clone, Debug)]
pub struct FsProvider {
    config: Config,
    grants: FsGrantStore,
    tokens: FsTokenStore,
    keys: FsKeyRegistry,
}

impl FsProvider {
    /// Open (creating if necessary) the data directory tree under `root`
    /// and load the token and key caches.
    ///
    /// # Errors
    ///
    /// Will return an error if the directories cannot be created or
    /// existing records cannot be read.
    pub async fn new(root: impl AsRef<Path>, config: Config) -> Result<Self> {
        let root = root.as_ref();

        Ok(Self {
            grants: FsGrantStore::new(root, config.grant_ttl_seconds).await?,
            tokens: FsTokenStore::new(root).await?,
            keys: FsKeyRegistry::new(root).await?,
            config,
        })
    }
}

impl Provider for FsProvider {}

impl Metadata for FsProvider {
    async fn config(&self) -> Result<Config> {
        Ok(self.config.clone())
    }
}

impl GrantStore for FsProvider {
    async fn create(&self, request: GrantRequest) -> Result<Grant> {
        self.grants.create(request).await
    }

    async fn get(&self, grant_id: &str) -> Result<Option<Grant>> {
        self.grants.get(grant_id).await
    }

    async fn find_pending_by_user_code(&self, code: &str) -> Result<Option<Grant>> {
        self.grants.find_pending_by_user_code(code).await
    }

    async fn mark_code_verified(&self, grant_id: &str) -> Result<()> {
        self.grants.mark_code_verified(grant_id).await
    }

    async fn approve(
        &self, grant_id: &str, approved: Vec<AccessTokenRequest>, subject: Option<String>,
    ) -> Result<Grant> {
        self.grants.approve(grant_id, approved, subject).await
    }

    async fn deny(&self, grant_id: &str) -> Result<Grant> {
        self.grants.deny(grant_id).await
    }

    async fn record_poll(&self, grant_id: &str) -> Result<()> {
        self.grants.record_poll(grant_id).await
    }

    async fn consume_continuation(&self, grant_id: &str) -> Result<()> {
        self.grants.consume_continuation(grant_id).await
    }
}

impl TokenStore for FsProvider {
    async fn put(&self, record: TokenRecord) -> Result<()> {
        self.tokens.put(record).await
    }

    async fn get_by_hash(&self, hash_b64: &str) -> Result<Option<TokenRecord>> {
        self.tokens.get_by_hash(hash_b64).await
    }

    async fn revoke(&self, hash_b64: &str) -> Result<()> {
        self.tokens.revoke(hash_b64).await
    }

    async fn cleanup_expired(&self, now: i64) -> Result<usize> {
        self.tokens.cleanup_expired(now).await
    }
}

impl KeyRegistry for FsProvider {
    async fn upsert(
        &self, tenant: &str, pub_jwk: PublicKeyJwk, kid: Option<String>, alg: Option<String>,
        display_rs: Option<String>, accept_tofu: bool,
    ) -> Result<RsKeyRecord> {
        self.keys.upsert(tenant, pub_jwk, kid, alg, display_rs, accept_tofu).await
    }

    async fn get(&self, tenant: &str, thumb256: &str) -> Result<Option<RsKeyRecord>> {
        self.keys.get(tenant, thumb256).await
    }

    async fn list(&self, tenant: &str) -> Result<Vec<RsKeyRecord>> {
        self.keys.list(tenant).await
    }

    async fn deactivate(&self, tenant: &str, thumb256: &str) -> Result<()> {
        self.keys.deactivate(tenant, thumb256).await
    }

    async fn lookup_by_kid(&self, kid: &str) -> Result<RsKeyRecord> {
        self.keys.lookup_by_kid(kid).await
    }

    async fn lookup_by_tenant_kid(&self, tenant: &str, kid: &str) -> Result<RsKeyRecord> {
        self.keys.lookup_by_tenant_kid(tenant, kid).await
    }

    async fn find_by_thumbprint(&self, thumb256: &str) -> Result<Option<RsKeyRecord>> {
        self.keys.find_by_thumbprint(thumb256).await
    }
}

// ---------- grants ----------

#[derive(Clone, Debug)]
struct FsGrantStore {
    dir: PathBuf,
    grant_ttl_seconds: i64,
    lock: Arc<RwLock<()>>,
}

impl FsGrantStore {
    async fn new(root: &Path, grant_ttl_seconds: i64) -> Result<Self> {
        let dir = root.join("grants");
        create_private_dir(&dir).await?;

        Ok(Self { dir, grant_ttl_seconds, lock: Arc::new(RwLock::new(())) })
    }

    fn path(&self, grant_id: &str) -> Result<PathBuf> {
        if !is_safe_file_stem(grant_id) {
            return Err(anyhow!("invalid grant id"));
        }
        Ok(self.dir.join(format!("{grant_id}.json")))
    }

    async fn read(&self, grant_id: &str) -> Result<Option<Grant>> {
        let path = self.path(grant_id)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, grant: &Grant) -> Result<()> {
        let path = self.path(&grant.id)?;
        write_atomic(&path, &serde_json::to_vec_pretty(grant)?, 0o600).await
    }

    async fn create(&self, request: GrantRequest) -> Result<Grant> {
        let grant = Grant::new(request, self.grant_ttl_seconds);

        let _guard = self.lock.write().await;
        self.write(&grant).await?;
        Ok(grant)
    }

    // Expire-on-read: the only read that writes.
    async fn get(&self, grant_id: &str) -> Result<Option<Grant>> {
        let _guard = self.lock.write().await;

        let Some(mut grant) = self.read(grant_id).await? else {
            return Ok(None);
        };
        if grant.expire_if_due() {
            self.write(&grant).await?;
        }
        Ok(Some(grant))
    }

    async fn find_pending_by_user_code(&self, code: &str) -> Result<Option<Grant>> {
        if code.is_empty() {
            return Ok(None);
        }

        let _guard = self.lock.read().await;

        // Linear scan is fine for the expected population.
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.path().extension().is_none_or(|ext| ext.to_str() != Some("json")) {
                continue;
            }
            let Ok(bytes) = fs::read(entry.path()).await else {
                continue;
            };
            let Ok(grant) = serde_json::from_slice::<Grant>(&bytes) else {
                continue;
            };
            if grant.status != crate::gnap::state::GrantStatus::Pending || grant.is_expired() {
                continue;
            }
            if grant.user_code.as_deref() == Some(code) {
                return Ok(Some(grant));
            }
        }
        Ok(None)
    }

    async fn mark_code_verified(&self, grant_id: &str) -> Result<()> {
        let _guard = self.lock.write().await;

        let mut grant =
            self.read(grant_id).await?.ok_or_else(|| anyhow!("grant not found"))?;
        grant.mark_code_verified()?;
        self.write(&grant).await
    }

    async fn approve(
        &self, grant_id: &str, approved: Vec<AccessTokenRequest>, subject: Option<String>,
    ) -> Result<Grant> {
        let _guard = self.lock.write().await;

        let mut grant =
            self.read(grant_id).await?.ok_or_else(|| anyhow!("grant not found"))?;
        if grant.expire_if_due() {
            self.write(&grant).await?;
            return Err(anyhow!("grant expired"));
        }
        grant.approve(approved, subject)?;
        self.write(&grant).await?;
        Ok(grant)
    }

    async fn deny(&self, grant_id: &str) -> Result<Grant> {
        let _guard = self.lock.write().await;

        let mut grant =
            self.read(grant_id).await?.ok_or_else(|| anyhow!("grant not found"))?;
        if grant.expire_if_due() {
            self.write(&grant).await?;
            return Err(anyhow!("grant expired"));
        }
        grant.deny()?;
        self.write(&grant).await?;
        Ok(grant)
    }

    async fn record_poll(&self, grant_id: &str) -> Result<()> {
        let _guard = self.lock.write().await;

        let mut grant =
            self.read(grant_id).await?.ok_or_else(|| anyhow!("grant not found"))?;
        grant.last_polled_at = Some(Utc::now());
        self.write(&grant).await
    }

    async fn consume_continuation(&self, grant_id: &str) -> Result<()> {
        let _guard = self.lock.write().await;

        let mut grant =
            self.read(grant_id).await?.ok_or_else(|| anyhow!("grant not found"))?;
        grant.continuation_token = String::new();
        grant.updated_at = Utc::now();
        self.write(&grant).await
    }
}

// ---------- tokens ----------

#[derive(Clone, Debug)]
struct FsTokenStore {
    dir: PathBuf,
    cache: Arc<RwLock<HashMap<String, TokenRecord>>>,
}

impl FsTokenStore {
    async fn new(root: &Path) -> Result<Self> {
        let dir = root.join("tokens");
        create_private_dir(&dir).await?;

        let store = Self { dir, cache: Arc::new(RwLock::new(HashMap::new())) };
        store.load_from_disk().await?;
        Ok(store)
    }

    fn path(&self, hash_b64: &str) -> Result<PathBuf> {
        if !is_safe_file_stem(hash_b64) {
            return Err(anyhow!("invalid token hash"));
        }
        Ok(self.dir.join(format!("{hash_b64}.json")))
    }

    async fn load_from_disk(&self) -> Result<()> {
        let mut cache = self.cache.write().await;

        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext.to_str() != Some("json")) {
                continue;
            }
            let Ok(bytes) = fs::read(&path).await else {
                continue;
            };
            let Ok(record) = serde_json::from_slice::<TokenRecord>(&bytes) else {
                continue;
            };
            cache.insert(record.hash_b64.clone(), record);
        }
        Ok(())
    }

    async fn put(&self, record: TokenRecord) -> Result<()> {
        let path = self.path(&record.hash_b64)?;

        let mut cache = self.cache.write().await;
        write_atomic(&path, &serde_json::to_vec_pretty(&record)?, 0o600).await?;
        cache.insert(record.hash_b64.clone(), record);
        Ok(())
    }

    async fn get_by_hash(&self, hash_b64: &str) -> Result<Option<TokenRecord>> {
        if let Some(record) = self.cache.read().await.get(hash_b64) {
            return Ok(Some(record.clone()));
        }

        let path = self.path(hash_b64)?;
        let record = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<TokenRecord>(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        self.cache.write().await.insert(hash_b64.to_string(), record.clone());
        Ok(Some(record))
    }

    async fn revoke(&self, hash_b64: &str) -> Result<()> {
        let Some(mut record) = self.get_by_hash(hash_b64).await? else {
            return Ok(());
        };
        record.revoked = true;
        self.put(record).await
    }

    async fn cleanup_expired(&self, now: i64) -> Result<usize> {
        let mut cache = self.cache.write().await;

        let expired: Vec<String> = cache
            .iter()
            .filter(|(_, r)| r.exp > 0 && r.exp <= now)
            .map(|(hash, _)| hash.clone())
            .collect();

        for hash in &expired {
            if let Ok(path) = self.path(hash) {
                let _ = fs::remove_file(path).await;
            }
            cache.remove(hash);
        }
        Ok(expired.len())
    }
}

// ---------- RS keys ----------

#[derive(Clone, Debug)]
struct FsKeyRegistry {
    dir: PathBuf,
    cache: Arc<RwLock<HashMap<String, HashMap<String, RsKeyRecord>>>>,
}

impl FsKeyRegistry {
    async fn new(root: &Path) -> Result<Self> {
        let dir = root.join("rs_keys");
        fs::create_dir_all(&dir).await?;

        let registry = Self { dir, cache: Arc::new(RwLock::new(HashMap::new())) };
        registry.load_from_disk().await?;
        Ok(registry)
    }

    fn path(&self, tenant: &str, thumb256: &str) -> Result<PathBuf> {
        if !is_safe_file_stem(tenant) || !is_safe_file_stem(thumb256) {
            return Err(anyhow!("invalid tenant or thumbprint"));
        }
        Ok(self.dir.join(tenant).join(format!("{thumb256}.json")))
    }

    async fn load_from_disk(&self) -> Result<()> {
        let mut cache = self.cache.write().await;

        let mut tenants = fs::read_dir(&self.dir).await?;
        while let Some(tenant_entry) = tenants.next_entry().await? {
            if !tenant_entry.file_type().await?.is_dir() {
                continue;
            }
            let tenant = tenant_entry.file_name().to_string_lossy().to_string();

            let mut files = fs::read_dir(tenant_entry.path()).await?;
            while let Some(file) = files.next_entry().await? {
                let path = file.path();
                if path.extension().is_none_or(|ext| ext.to_str() != Some("json")) {
                    continue;
                }
                let Ok(bytes) = fs::read(&path).await else {
                    continue;
                };
                let Ok(record) = serde_json::from_slice::<RsKeyRecord>(&bytes) else {
                    continue;
                };
                cache
                    .entry(tenant.clone())
                    .or_default()
                    .insert(record.thumb256.clone(), record);
            }
        }
        Ok(())
    }

    async fn save(&self, record: &RsKeyRecord) -> Result<()> {
        let path = self.path(&record.tenant, &record.thumb256)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        // public material only
        write_atomic(&path, &serde_json::to_vec_pretty(record)?, 0o644).await
    }

    async fn upsert(
        &self, tenant: &str, pub_jwk: PublicKeyJwk, kid: Option<String>, alg: Option<String>,
        display_rs: Option<String>, accept_tofu: bool,
    ) -> Result<RsKeyRecord> {
        let thumb = pub_jwk.thumbprint()?;

        let mut cache = self.cache.write().await;

        let record = if let Some(existing) =
            cache.get(tenant).and_then(|keys| keys.get(&thumb))
        {
            // known key: update metadata, re-activate, keep created_at
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

        self.save(&record).await?;
        cache.entry(tenant.to_string()).or_default().insert(thumb, record.clone());
        Ok(record)
    }

    async fn get(&self, tenant: &str, thumb256: &str) -> Result<Option<RsKeyRecord>> {
        Ok(self.cache.read().await.get(tenant).and_then(|keys| keys.get(thumb256)).cloned())
    }

    async fn list(&self, tenant: &str) -> Result<Vec<RsKeyRecord>> {
        Ok(self
            .cache
            .read()
            .await
            .get(tenant)
            .map(|keys| keys.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn deactivate(&self, tenant: &str, thumb256: &str) -> Result<()> {
        let mut cache = self.cache.write().await;

        let record = cache
            .get_mut(tenant)
            .and_then(|keys| keys.get_mut(thumb256))
            .ok_or_else(|| anyhow::Error::new(KeyNotFound))?;

        record.active = false;
        record.rotated_at = Some(Utc::now());
        let record = record.clone();
        self.save(&record).await
    }

    async fn lookup_by_kid(&self, kid: &str) -> Result<RsKeyRecord> {
        let cache = self.cache.read().await;

        for keys in cache.values() {
            for record in keys.values() {
                if record.active && record.kid.as_deref() == Some(kid) {
                    return Ok(record.clone());
                }
            }
        }
        Err(anyhow::Error::new(KeyNotFound))
    }

    async fn lookup_by_tenant_kid(&self, tenant: &str, kid: &str) -> Result<RsKeyRecord> {
        let cache = self.cache.read().await;

        let keys = cache.get(tenant).ok_or_else(|| anyhow::Error::new(KeyNotFound))?;
        keys.values()
            .find(|r| r.active && r.kid.as_deref() == Some(kid))
            .cloned()
            .ok_or_else(|| anyhow::Error::new(KeyNotFound))
    }

    async fn find_by_thumbprint(&self, thumb256: &str) -> Result<Option<RsKeyRecord>> {
        let cache = self.cache.read().await;

        for keys in cache.values() {
            if let Some(record) = keys.get(thumb256) {
                return Ok(Some(record.clone()));
            }
        }
        Ok(None)
    }
}

// ---------- helpers ----------

// Record identifiers become file names; reject anything that could
// escape the store directory.
fn is_safe_file_stem(s: &str) -> bool {
    !s.is_empty()
        && s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
        && !s.contains("..")
}

// Write-temp-then-rename with fsync: readers never observe a partial file.
async fn write_atomic(path: &Path, bytes: &[u8], mode: u32) -> Result<()> {
    let tmp = path.with_extension("json.tmp");

    let mut file =
        fs::OpenOptions::new().create(true).truncate(true).write(true).open(&tmp).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);

    set_mode(&tmp, mode).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

async fn create_private_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).await?;
    set_mode(dir, 0o700).await?;
    Ok(())
}

#[cfg(unix)]
async fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await
}

#[cfg(not(unix))]
async fn set_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}
