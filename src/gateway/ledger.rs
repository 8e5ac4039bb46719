use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::types::UsageRecord;
use crate::utils::GatewayError;

/// Account balances owned by the identity collaborator.
///
/// The gateway only reads a balance and asks for a delta to be applied.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CreditLedger: Send + Sync {
    async fn balance(&self, user_id: &str) -> Result<i64, GatewayError>;

    /// Apply `delta` (negative to charge) and return the new balance
    async fn apply_delta(&self, user_id: &str, delta: i64) -> Result<i64, GatewayError>;
}

/// Append-only destination for usage records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsageSink: Send + Sync {
    async fn record(&self, record: UsageRecord) -> Result<(), GatewayError>;
}

/// Process-local ledger; users start with a fixed grant
#[derive(Debug)]
pub struct InMemoryLedger {
    starting_credits: i64,
    balances: Mutex<HashMap<String, i64>>,
}

impl InMemoryLedger {
    pub fn new(starting_credits: i64) -> Self {
        Self {
            starting_credits,
            balances: Mutex::new(HashMap::new()),
        }
    }

    /// Force a balance, e.g. when seeding from an external account store
    pub fn set_balance(&self, user_id: &str, balance: i64) {
        self.balances.lock().insert(user_id.to_string(), balance);
    }
}

#[async_trait]
impl CreditLedger for InMemoryLedger {
    async fn balance(&self, user_id: &str) -> Result<i64, GatewayError> {
        Ok(self
            .balances
            .lock()
            .get(user_id)
            .copied()
            .unwrap_or(self.starting_credits))
    }

    async fn apply_delta(&self, user_id: &str, delta: i64) -> Result<i64, GatewayError> {
        let mut balances = self.balances.lock();
        let balance = balances
            .entry(user_id.to_string())
            .or_insert(self.starting_credits);
        *balance += delta;
        Ok(*balance)
    }
}

/// Keeps records in memory; handy for tests and the CLI
#[derive(Debug, Default)]
pub struct InMemoryUsageLog {
    records: Mutex<Vec<UsageRecord>>,
}

impl InMemoryUsageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<UsageRecord> {
        self.records.lock().clone()
    }
}

#[async_trait]
impl UsageSink for InMemoryUsageLog {
    async fn record(&self, record: UsageRecord) -> Result<(), GatewayError> {
        self.records.lock().push(record);
        Ok(())
    }
}

/// Appends one JSON object per line
#[derive(Debug)]
pub struct JsonlUsageLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlUsageLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl UsageSink for JsonlUsageLog {
    async fn record(&self, record: UsageRecord) -> Result<(), GatewayError> {
        let mut line = serde_json::to_string(&record)
            .map_err(|e| GatewayError::Ledger(format!("failed to encode usage record: {}", e)))?;
        line.push('\n');

        let _guard = self.write_lock.lock();
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| GatewayError::Ledger(format!("{}: {}", parent.display(), e)))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| GatewayError::Ledger(format!("{}: {}", self.path.display(), e)))?;
        file.write_all(line.as_bytes())
            .map_err(|e| GatewayError::Ledger(format!("{}: {}", self.path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderKind;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn record(user: &str, credits: u64) -> UsageRecord {
        UsageRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.to_string(),
            agent: Some("code".to_string()),
            prompt_tokens_estimate: 12,
            response_tokens_estimate: 40,
            credits_charged: credits,
            provider_used: ProviderKind::OpenAi,
            model: "gpt-4o-mini".to_string(),
            fallback_used: false,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_in_memory_ledger_seeds_and_applies() {
        let ledger = InMemoryLedger::new(100);
        assert_eq!(ledger.balance("ada").await.unwrap(), 100);
        assert_eq!(ledger.apply_delta("ada", -3).await.unwrap(), 97);
        assert_eq!(ledger.balance("ada").await.unwrap(), 97);
        assert_eq!(ledger.balance("bob").await.unwrap(), 100);

        ledger.set_balance("bob", 2);
        assert_eq!(ledger.balance("bob").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_jsonl_log_appends_lines() {
        let dir = TempDir::new().unwrap();
        let log = JsonlUsageLog::new(dir.path().join("usage").join("usage.jsonl"));

        log.record(record("ada", 1)).await.unwrap();
        log.record(record("bob", 0)).await.unwrap();

        let text = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<UsageRecord> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].user_id, "ada");
        assert_eq!(lines[1].credits_charged, 0);
    }

    #[tokio::test]
    async fn test_in_memory_usage_log() {
        let log = InMemoryUsageLog::new();
        log.record(record("ada", 2)).await.unwrap();
        assert_eq!(log.records().len(), 1);
    }
}
