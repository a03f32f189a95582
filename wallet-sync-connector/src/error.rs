use thiserror::Error;

/// Run-level failures of a synchronization round.
///
/// Failures of individual balance lookups, blocks, receipts or chunks never
/// surface here; they are logged and counted in the round's report.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("No tracked addresses: configure `addresses` or expose accounts on the node")]
    NoTrackedAddresses,

    #[error("None of the {0} tracked addresses could be snapshotted")]
    NoAccountsResolved(usize),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to resolve tracked addresses: {0:#}")]
    Accounts(#[source] anyhow::Error),

    #[error("Failed to determine the block range: {0:#}")]
    BlockRange(#[source] anyhow::Error),

    #[error("All {0} block fetches failed")]
    ScanFailed(usize),

    #[error("Ledger submission failed: {0:#}")]
    Ledger(#[source] anyhow::Error),
}

impl SyncError {
    /// Configuration failures end the whole run; anything else only ends the round.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::NoTrackedAddresses
                | SyncError::NoAccountsResolved(_)
                | SyncError::InvalidConfig(_)
        )
    }
}
