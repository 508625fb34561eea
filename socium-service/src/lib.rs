//! Business logic of socium, written against the storage [`Gateway`].

pub mod directory;
pub mod error;
pub mod feed;
mod hydrate;
pub mod identity;
pub mod outbox;
pub mod relationship;
pub mod reporting;
pub mod token;

use outbox::Outbox;
use socium_common::{
    model::{Id, SociumSnowflakeGenerator},
    snowflake::WorkerId,
};
use socium_db::Gateway;
use std::sync::{Arc, Mutex, PoisonError};
use token::TokenKeys;

pub use error::{ErrorKind, Result, ServiceError};

#[derive(Debug)]
pub struct Service<G> {
    gateway: G,
    ids: Mutex<SociumSnowflakeGenerator>,
    tokens: Arc<TokenKeys>,
    outbox: Outbox,
    public_url: String,
}

impl<G: Gateway> Service<G> {
    /// `public_url` is the externally reachable base used in mailed links.
    #[must_use]
    pub fn new(
        gateway: G,
        worker_id: WorkerId,
        tokens: Arc<TokenKeys>,
        outbox: Outbox,
        public_url: impl Into<String>,
    ) -> Self {
        let public_url: String = public_url.into();

        Self {
            gateway,
            ids: Mutex::new(SociumSnowflakeGenerator::new(worker_id)),
            tokens,
            outbox,
            public_url: public_url.trim_end_matches('/').to_owned(),
        }
    }

    #[must_use]
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    #[must_use]
    pub fn tokens(&self) -> &Arc<TokenKeys> {
        &self.tokens
    }

    fn next_id<Marker>(&self) -> Result<Id<Marker>> {
        let snowflake = self
            .ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate()?;
        Ok(Id::new(snowflake))
    }
}
