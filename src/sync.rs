use chrono::NaiveDate;
use rusqlite::Connection;

use crate::bank::{BankFetch, FetchError};
use crate::categorize::{categorize_in_batches, Fallback};
use crate::claude::CategorizeBatch;
use crate::config::Config;
use crate::error::Result;
use crate::gaps;
use crate::models::RawAccount;
use crate::resolver;
use crate::retry::Clock;
use crate::store::{self, Scope};

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Ignore stored date ranges and re-fetch the whole window.
    pub full: bool,
    /// Explicit window start; otherwise the window begins at earliest-known
    /// data (or the configured default for empty accounts).
    pub from_date: Option<NaiveDate>,
    pub batch_size: usize,
    /// Null out existing categories per account before categorizing.
    pub recategorize: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AccountSummary {
    pub display_name: String,
    pub fetched: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub overridden: usize,
    pub categorized: usize,
    pub fallback: usize,
    pub abandoned: usize,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub accounts: Vec<AccountSummary>,
    pub valid_tokens: usize,
    pub invalid_tokens: Vec<String>,
}

fn redact(token: &str) -> String {
    let prefix: String = token.chars().take(12).collect();
    format!("{prefix}...")
}

/// Drives the per-account sync pipeline: resolve identity, compute gaps,
/// fetch, persist, apply overrides, categorize. Accounts run strictly in
/// sequence and one account's failure never stops the others.
pub struct Syncer<'a> {
    conn: &'a Connection,
    bank: &'a dyn BankFetch,
    categorizer: &'a dyn CategorizeBatch,
    clock: &'a dyn Clock,
    config: &'a Config,
}

impl<'a> Syncer<'a> {
    pub fn new(
        conn: &'a Connection,
        bank: &'a dyn BankFetch,
        categorizer: &'a dyn CategorizeBatch,
        clock: &'a dyn Clock,
        config: &'a Config,
    ) -> Self {
        Self { conn, bank, categorizer, clock, config }
    }

    /// Sync every account reachable from the configured tokens up to and
    /// including `yesterday`; the current day may still be incomplete.
    pub fn sync(&self, opts: &SyncOptions, yesterday: NaiveDate) -> Result<SyncReport> {
        let mut report = SyncReport::default();

        for token in &self.config.access_tokens {
            match self.bank.fetch_accounts(token) {
                Ok(accounts) => {
                    report.valid_tokens += 1;
                    for raw in &accounts {
                        report.accounts.push(self.sync_account(token, raw, opts, yesterday));
                    }
                }
                Err(FetchError::Auth(msg)) => {
                    log::warn!("skipping invalid/expired token {}: {msg}", redact(token));
                    report.invalid_tokens.push(redact(token));
                }
                Err(err) => {
                    log::error!("account listing failed for token {}: {err}", redact(token));
                    report.invalid_tokens.push(redact(token));
                }
            }
        }

        Ok(report)
    }

    fn sync_account(
        &self,
        token: &str,
        raw: &RawAccount,
        opts: &SyncOptions,
        yesterday: NaiveDate,
    ) -> AccountSummary {
        let mut summary = AccountSummary {
            display_name: raw.name.clone(),
            ..AccountSummary::default()
        };
        if let Err(err) = self.run_account(token, raw, opts, yesterday, &mut summary) {
            log::error!("sync failed for account '{}': {err}", raw.name);
            summary.error = Some(err.to_string());
        }
        summary
    }

    fn run_account(
        &self,
        token: &str,
        raw: &RawAccount,
        opts: &SyncOptions,
        yesterday: NaiveDate,
        summary: &mut AccountSummary,
    ) -> Result<()> {
        let account_id = resolver::resolve_account(self.conn, raw)?;

        let stored = store::get_date_range(self.conn, account_id)?;
        let ranges = gaps::ranges_to_fetch(
            opts.from_date,
            self.config.default_start_date,
            stored,
            yesterday,
            opts.full,
        )?;

        for range in &ranges {
            log::info!(
                "fetching '{}' from {} to {}",
                raw.name,
                range.start,
                range.end
            );
            let fetched = self.bank.fetch_transactions(token, &raw.id, range.start)?;
            for txn in fetched.iter().filter(|t| range.contains(t.date)) {
                summary.fetched += 1;
                if store::save_transaction(self.conn, txn, account_id)? {
                    summary.inserted += 1;
                } else {
                    summary.duplicates += 1;
                }
            }
        }

        if opts.recategorize {
            let cleared = store::clear_categories(self.conn, Scope::Account(account_id))?;
            log::info!("cleared {cleared} categorizations on '{}'", raw.name);
        }

        // Manual overrides win over the AI pass and remove their
        // transactions from the batcher's input.
        let valid_names = self.config.valid_category_names();
        let mut remaining = Vec::new();
        for view in store::get_uncategorized(self.conn, Scope::Account(account_id))? {
            match self.config.manual_overrides.get(&view.id) {
                Some(category) if valid_names.contains(category.as_str()) => {
                    store::apply_category(self.conn, &view.id, category, 1.0)?;
                    summary.overridden += 1;
                }
                Some(category) => {
                    log::warn!("invalid override category '{category}' for {}", view.id);
                    remaining.push(view);
                }
                None => remaining.push(view),
            }
        }

        let fallback = Fallback {
            category: self.config.fallback_category.clone(),
            confidence: self.config.fallback_confidence,
        };
        let outcome = categorize_in_batches(
            self.categorizer,
            self.clock,
            &remaining,
            opts.batch_size,
            &fallback,
        );
        for assignment in &outcome.assignments {
            store::apply_category(
                self.conn,
                &assignment.transaction_id,
                &assignment.category,
                assignment.confidence,
            )?;
        }
        summary.categorized = outcome.categorized;
        summary.fallback = outcome.fallback;
        summary.abandoned = outcome.abandoned;

        Ok(())
    }
}
