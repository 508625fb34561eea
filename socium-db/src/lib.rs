pub mod client;
pub mod gateway;
pub mod memory;
mod record;

use socium_common::model::{ModelValidationError, account::EmailAddress};
use thiserror::Error;

pub use client::DbClient;
pub use gateway::{AccountFilter, Gateway, Window};
pub use memory::MemoryStore;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("Running the migrations failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("An account with email {0} already exists")]
    EmailTaken(EmailAddress),
    #[error("The store refused to write record {0}")]
    WriteRefused(u64),
}
