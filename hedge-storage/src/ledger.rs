use anyhow::{anyhow, Context, Result};
use hedge_types::{Address, ConversionEvent, ProtectionRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Older events are folded into the record's baseline beyond this.
pub const MAX_EVENTS_PER_USER: usize = 50;

const SNAPSHOT_FILE: &str = "ledger.bin";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct LedgerState {
    pub records: BTreeMap<Address, ProtectionRecord>,
    pub events: BTreeMap<Address, Vec<ConversionEvent>>,
}

/// In-process copy of the hedge contract's persistent storage.
pub struct Ledger {
    state: RwLock<LedgerState>,
    snapshot_path: Option<PathBuf>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl Ledger {
    pub fn in_memory() -> Self {
        Self {
            state: RwLock::new(LedgerState::default()),
            snapshot_path: None,
        }
    }

    /// Open the ledger backed by `<dir>/ledger.bin`, loading it if present.
    pub fn open(dir: &str) -> Result<Self> {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create data dir {}", dir))?;
        let path = Path::new(dir).join(SNAPSHOT_FILE);

        let state = if path.exists() {
            let bytes = fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
            bincode::deserialize(&bytes).map_err(|e| anyhow!("Deserialization error: {}", e))?
        } else {
            LedgerState::default()
        };

        Ok(Self {
            state: RwLock::new(state),
            snapshot_path: Some(path),
        })
    }

    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let encoded = {
            let guard = self.state.read().map_err(|_| anyhow!("ledger lock poisoned"))?;
            bincode::serialize(&*guard).map_err(|e| anyhow!("Serialization error: {}", e))?
        };
        let tmp = path.with_extension("bin.tmp");
        fs::write(&tmp, encoded).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    /// Replace the user's record wholesale. History is kept.
    pub fn put_record(&self, record: ProtectionRecord) -> Result<()> {
        let mut guard = self.state.write().map_err(|_| anyhow!("ledger lock poisoned"))?;
        guard.records.insert(record.user.clone(), record);
        Ok(())
    }

    pub fn record(&self, user: &Address) -> Result<Option<ProtectionRecord>> {
        let guard = self.state.read().map_err(|_| anyhow!("ledger lock poisoned"))?;
        Ok(guard.records.get(user).cloned())
    }

    pub fn user_exists(&self, user: &Address) -> Result<bool> {
        let guard = self.state.read().map_err(|_| anyhow!("ledger lock poisoned"))?;
        Ok(guard.records.contains_key(user))
    }

    pub fn users(&self) -> Result<Vec<Address>> {
        let guard = self.state.read().map_err(|_| anyhow!("ledger lock poisoned"))?;
        Ok(guard.records.keys().cloned().collect())
    }

    pub fn events(&self, user: &Address) -> Result<Vec<ConversionEvent>> {
        let guard = self.state.read().map_err(|_| anyhow!("ledger lock poisoned"))?;
        Ok(guard.events.get(user).cloned().unwrap_or_default())
    }

    /// Append `event` and stamp the record's last conversion time in one
    /// write. Events past the cap are dropped oldest-first; their USD and
    /// their count are carried in the record's baseline. Nothing is written
    /// if the baseline would overflow.
    pub fn record_conversion(
        &self,
        user: &Address,
        event: ConversionEvent,
        timestamp: u64,
    ) -> Result<ProtectionRecord> {
        let mut guard = self.state.write().map_err(|_| anyhow!("ledger lock poisoned"))?;
        let state = &mut *guard;

        let record = state
            .records
            .get_mut(user)
            .ok_or_else(|| anyhow!("no record for {}", user))?;

        let history = state.events.entry(user.clone()).or_default();
        let overflow = (history.len() + 1).saturating_sub(MAX_EVENTS_PER_USER).min(history.len());
        let mut baseline = record.baseline_protected;
        for evicted in &history[..overflow] {
            baseline = baseline
                .checked_add(evicted.usd_amount)
                .ok_or_else(|| anyhow!("protected total for {} out of range", user))?;
        }

        history.drain(..overflow);
        history.push(event);
        record.baseline_protected = baseline;
        record.baseline_conversions = record
            .baseline_conversions
            .saturating_add(u32::try_from(overflow).unwrap_or(u32::MAX));
        record.last_conversion = Some(timestamp);
        Ok(record.clone())
    }

    pub fn remove_user(&self, user: &Address) -> Result<()> {
        let mut guard = self.state.write().map_err(|_| anyhow!("ledger lock poisoned"))?;
        guard.records.remove(user);
        guard.events.remove(user);
        Ok(())
    }

    pub fn snapshot(&self) -> Result<LedgerState> {
        let guard = self.state.read().map_err(|_| anyhow!("ledger lock poisoned"))?;
        Ok(guard.clone())
    }
}
