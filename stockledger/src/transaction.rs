use stockledger_types::TransactionContext;
use tracing::warn;

use crate::errors::LedgerError;

/// Commit `tx` when `outcome` succeeded, then roll back unconditionally.
///
/// The trailing rollback is a no-op after a successful commit and discards
/// everything otherwise. A failing rollback is logged and never masks the
/// outcome.
pub(crate) async fn finish<Tx, T>(
    mut tx: Tx,
    outcome: Result<T, LedgerError>,
    operation: &'static str,
) -> Result<T, LedgerError>
where
    Tx: TransactionContext,
{
    let result = match outcome {
        Ok(value) => tx.commit().await.map(|()| value).map_err(LedgerError::from),
        Err(error) => Err(error),
    };

    if let Err(error) = tx.rollback().await {
        warn!(
            operation,
            error = %error,
            "[transaction.finish] trailing rollback failed"
        );
    }

    result
}
