//! Storage seam used by the advice controller

use crate::db::Database;
use crate::error::Result;
use crate::models::{AdviceCacheEntry, FinancialProfile, Transaction};
use crate::period::PeriodKey;

/// Persistence operations the advisor needs
///
/// `Database` is the production implementation; tests wrap it to inject
/// failures.
pub trait AdvisorStore: Send + Sync {
    /// Ledger entries for a user in one period
    fn query_transactions(&self, user_id: &str, period: PeriodKey) -> Result<Vec<Transaction>>;

    fn get_cache_entry(&self, user_id: &str) -> Result<Option<AdviceCacheEntry>>;

    /// Write advice, snapshot, hash and timestamp together
    fn upsert_cache_entry(&self, entry: &AdviceCacheEntry) -> Result<()>;

    fn upsert_profile(&self, profile: &FinancialProfile) -> Result<()>;

    fn get_profile(&self, user_id: &str, period: PeriodKey) -> Result<Option<FinancialProfile>>;

    fn latest_profile(&self, user_id: &str) -> Result<Option<FinancialProfile>>;
}

impl AdvisorStore for Database {
    fn query_transactions(&self, user_id: &str, period: PeriodKey) -> Result<Vec<Transaction>> {
        self.transactions_for_period(user_id, period)
    }

    fn get_cache_entry(&self, user_id: &str) -> Result<Option<AdviceCacheEntry>> {
        Database::get_cache_entry(self, user_id)
    }

    fn upsert_cache_entry(&self, entry: &AdviceCacheEntry) -> Result<()> {
        Database::upsert_cache_entry(self, entry)
    }

    fn upsert_profile(&self, profile: &FinancialProfile) -> Result<()> {
        Database::upsert_profile(self, profile)
    }

    fn get_profile(&self, user_id: &str, period: PeriodKey) -> Result<Option<FinancialProfile>> {
        Database::get_profile(self, user_id, period)
    }

    fn latest_profile(&self, user_id: &str) -> Result<Option<FinancialProfile>> {
        Database::latest_profile(self, user_id)
    }
}
