use adflow_storage::StorageError;
use thiserror::Error;

pub type BillingResult<T> = Result<T, BillingError>;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("malformed invoice number: {0}")]
    MalformedNumber(String),

    #[error("nothing to invoice: {0}")]
    NothingToInvoice(String),
}
