//! UPI receiving-account selection
//!
//! Payers are shown a receiving account chosen from the active set. Accounts
//! at or over their daily collection cap are hidden; the primary account is
//! offered first. The running counter is maintained by the approval workflow
//! via [`UpiAccountService::record_collection`].

use std::sync::Arc;

use serde_json::json;

use medialog_shared::{collections, EntityStore, Filter, UpiAccount};

use crate::error::{decode, BillingError, BillingResult};

/// Filter and order accounts for presentation to payers.
///
/// Pure: capped accounts are dropped, the remainder keeps its original
/// (stable) order except that the primary account moves to the front. If the
/// flagged primary was filtered out the original order stands, so the
/// selection is always deterministic. At most one returned account carries
/// the primary flag even if the input violates that invariant.
pub fn presentable(accounts: Vec<UpiAccount>) -> Vec<UpiAccount> {
    let mut open: Vec<UpiAccount> = accounts
        .into_iter()
        .filter(UpiAccount::is_under_limit)
        .collect();

    let mut seen_primary = false;
    for account in &mut open {
        if account.is_primary {
            if seen_primary {
                account.is_primary = false;
            }
            seen_primary = true;
        }
    }

    // Stable sort: primary first, everything else in original order.
    open.sort_by_key(|a| !a.is_primary);
    open
}

#[derive(Clone)]
pub struct UpiAccountService {
    store: Arc<dyn EntityStore>,
}

impl UpiAccountService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    async fn active_accounts(&self) -> BillingResult<Vec<UpiAccount>> {
        let records = self
            .store
            .filter(collections::UPI_ACCOUNTS, &Filter::new().eq("is_active", true))
            .await?;
        records
            .into_iter()
            .map(|r| decode(collections::UPI_ACCOUNTS, r))
            .collect()
    }

    async fn all_accounts(&self) -> BillingResult<Vec<UpiAccount>> {
        let records = self
            .store
            .filter(collections::UPI_ACCOUNTS, &Filter::new())
            .await?;
        records
            .into_iter()
            .map(|r| decode(collections::UPI_ACCOUNTS, r))
            .collect()
    }

    /// Every account, active or not (admin view).
    pub async fn list(&self) -> BillingResult<Vec<UpiAccount>> {
        self.all_accounts().await
    }

    /// Accounts a payer may be shown right now.
    pub async fn select_presentable(&self) -> BillingResult<Vec<UpiAccount>> {
        Ok(presentable(self.active_accounts().await?))
    }

    /// Make `account_id` the primary account.
    ///
    /// The store has no multi-record transactions, so the other flags are
    /// cleared before the target is set; a reader in between sees no primary
    /// rather than two.
    pub async fn set_primary(&self, account_id: &str) -> BillingResult<UpiAccount> {
        let accounts = self.active_accounts().await?;
        if !accounts.iter().any(|a| a.id == account_id) {
            return Err(BillingError::NotFound(format!("upi account {account_id}")));
        }

        for account in accounts.iter().filter(|a| a.is_primary && a.id != account_id) {
            self.store
                .update(
                    collections::UPI_ACCOUNTS,
                    &account.id,
                    json!({"is_primary": false}),
                )
                .await?;
        }

        let updated = self
            .store
            .update(
                collections::UPI_ACCOUNTS,
                account_id,
                json!({"is_primary": true}),
            )
            .await?;

        tracing::info!(account_id = %account_id, "Primary UPI account changed");
        decode(collections::UPI_ACCOUNTS, updated)
    }

    /// Add an approved amount to the account's running daily total.
    pub async fn record_collection(&self, account_id: &str, amount: i64) -> BillingResult<()> {
        if amount <= 0 {
            return Err(BillingError::Validation(format!(
                "collection amount must be positive, got {amount}"
            )));
        }
        let record = self
            .store
            .get(collections::UPI_ACCOUNTS, account_id)
            .await?
            .ok_or_else(|| BillingError::NotFound(format!("upi account {account_id}")))?;
        let account: UpiAccount = decode(collections::UPI_ACCOUNTS, record)?;

        let collected = account.collected_amount + amount;
        self.store
            .update(
                collections::UPI_ACCOUNTS,
                account_id,
                json!({"collected_amount": collected}),
            )
            .await?;

        tracing::info!(
            account_id = %account_id,
            amount = amount,
            collected_amount = collected,
            "Recorded collection against UPI account"
        );
        Ok(())
    }

    /// Zero every account's running total (daily reset). Returns the number
    /// of accounts touched.
    pub async fn reset_collections(&self) -> BillingResult<usize> {
        let accounts = self.all_accounts().await?;
        let mut touched = 0;
        for account in &accounts {
            if account.collected_amount != 0 {
                self.store
                    .update(
                        collections::UPI_ACCOUNTS,
                        &account.id,
                        json!({"collected_amount": 0}),
                    )
                    .await?;
                touched += 1;
            }
        }
        tracing::info!(accounts_reset = touched, "Daily UPI collection counters reset");
        Ok(touched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: &str, primary: bool, limit: Option<i64>, collected: i64) -> UpiAccount {
        UpiAccount {
            id: id.into(),
            upi_id: format!("{id}@okaxis"),
            display_name: id.into(),
            is_primary: primary,
            is_active: true,
            daily_limit: limit,
            collected_amount: collected,
        }
    }

    #[test]
    fn capped_accounts_are_never_presented() {
        let picked = presentable(vec![
            account("a", false, Some(1_000), 1_000),
            account("b", false, Some(1_000), 999),
            account("c", false, None, 5_000_000),
        ]);
        let ids: Vec<&str> = picked.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn primary_is_offered_first() {
        let picked = presentable(vec![
            account("a", false, None, 0),
            account("b", true, None, 0),
            account("c", false, None, 0),
        ]);
        let ids: Vec<&str> = picked.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn filtered_primary_leaves_stable_original_order() {
        let picked = presentable(vec![
            account("a", false, None, 0),
            account("b", true, Some(500), 500),
            account("c", false, None, 0),
        ]);
        let ids: Vec<&str> = picked.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert!(picked.iter().all(|a| !a.is_primary));
    }

    #[test]
    fn at_most_one_primary_in_results() {
        // Corrupt input with two primaries must not leak the violation.
        let picked = presentable(vec![
            account("a", true, None, 0),
            account("b", true, None, 0),
        ]);
        assert_eq!(picked.iter().filter(|a| a.is_primary).count(), 1);
        assert_eq!(picked[0].id, "a");
    }
}
