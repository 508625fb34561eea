//! Time-ordered 64 bit identifiers.
//!
//! Bit layout, most significant first: 42 bits of milliseconds since the
//! epoch, 10 bits of worker id, 12 bits of per-millisecond increment.
//! Sorting snowflakes numerically sorts them by allocation time.

use derive_where::derive_where;
use std::{
    fmt::{Display, Formatter},
    marker::PhantomData,
    num::ParseIntError,
    str::FromStr,
};
use thiserror::Error;
use time::{Duration, UtcDateTime};

pub const TIMESTAMP_OFFSET: u32 = 22;
pub const TIMESTAMP_LENGTH: u32 = 42;

pub const WORKER_ID_OFFSET: u32 = 12;
pub const WORKER_ID_LENGTH: u32 = 10;

pub const INCREMENT_LENGTH: u32 = 12;

const fn mask(length: u32) -> u64 {
    (1 << length) - 1
}

pub trait Epoch {
    const EPOCH_TIME: UtcDateTime;
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum SnowflakeTimestampError {
    #[error("Specified time was before the snowflake epoch.")]
    TimeBeforeEpoch,
    #[error("Resulting timestamp uses too many bits.")]
    TimestampTooLarge,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Worker id {0} does not fit into the worker id bits")]
pub struct WorkerIdOutOfRangeError(u16);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct WorkerId(u16);

impl WorkerId {
    #[must_use]
    pub fn new(id: u16) -> Option<Self> {
        (u64::from(id) <= mask(WORKER_ID_LENGTH)).then_some(Self(id))
    }

    #[must_use]
    pub fn get(self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for WorkerId {
    type Error = WorkerIdOutOfRangeError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(WorkerIdOutOfRangeError(value))
    }
}

#[derive_where(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct Snowflake<SnowflakeEpoch>(u64, PhantomData<SnowflakeEpoch>);

impl<SnowflakeEpoch> Snowflake<SnowflakeEpoch> {
    #[must_use]
    pub fn new(inner: u64) -> Self {
        Self(inner, PhantomData)
    }

    pub fn from_parts(
        time: UtcDateTime,
        worker_id: WorkerId,
        increment: u16,
    ) -> Result<Self, SnowflakeTimestampError>
    where
        SnowflakeEpoch: Epoch,
    {
        let millis = millis_since_epoch::<SnowflakeEpoch>(time)?;

        Ok(Self::from_raw_parts(millis, worker_id, increment))
    }

    fn from_raw_parts(millis: u64, worker_id: WorkerId, increment: u16) -> Self {
        let snowflake = (millis << TIMESTAMP_OFFSET)
            | (u64::from(worker_id.get()) << WORKER_ID_OFFSET)
            | (u64::from(increment) & mask(INCREMENT_LENGTH));

        Self::new(snowflake)
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn timestamp_millis(self) -> u64 {
        self.0 >> TIMESTAMP_OFFSET
    }

    #[must_use]
    pub fn worker_id(self) -> WorkerId {
        #[allow(clippy::cast_possible_truncation)]
        let worker_id = ((self.0 >> WORKER_ID_OFFSET) & mask(WORKER_ID_LENGTH)) as u16;
        WorkerId(worker_id)
    }

    #[must_use]
    pub fn increment(self) -> u16 {
        #[allow(clippy::cast_possible_truncation)]
        let increment = (self.0 & mask(INCREMENT_LENGTH)) as u16;
        increment
    }

    #[must_use]
    pub fn created_at(self) -> UtcDateTime
    where
        SnowflakeEpoch: Epoch,
    {
        SnowflakeEpoch::EPOCH_TIME + Duration::milliseconds(self.timestamp_millis().cast_signed())
    }
}

fn millis_since_epoch<SnowflakeEpoch: Epoch>(
    time: UtcDateTime,
) -> Result<u64, SnowflakeTimestampError> {
    let millis = (time - SnowflakeEpoch::EPOCH_TIME).whole_milliseconds();
    if millis < 0 {
        return Err(SnowflakeTimestampError::TimeBeforeEpoch);
    }

    let millis = u64::try_from(millis).map_err(|_| SnowflakeTimestampError::TimestampTooLarge)?;
    if millis > mask(TIMESTAMP_LENGTH) {
        return Err(SnowflakeTimestampError::TimestampTooLarge);
    }

    Ok(millis)
}

impl<SnowflakeEpoch> Display for Snowflake<SnowflakeEpoch> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<SnowflakeEpoch> FromStr for Snowflake<SnowflakeEpoch> {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u64::from_str(s).map(Self::new)
    }
}

impl<SnowflakeEpoch> From<u64> for Snowflake<SnowflakeEpoch> {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl<SnowflakeEpoch> From<Snowflake<SnowflakeEpoch>> for u64 {
    fn from(value: Snowflake<SnowflakeEpoch>) -> Self {
        value.get()
    }
}

/// Hands out strictly increasing snowflakes for one worker.
///
/// When more than 4096 ids are requested within one millisecond the
/// generator borrows the following millisecond instead of wrapping around.
#[derive_where(Clone, Debug)]
pub struct SnowflakeGenerator<SnowflakeEpoch> {
    worker_id: WorkerId,
    last_millis: u64,
    next_increment: u64,
    phantom_data: PhantomData<SnowflakeEpoch>,
}

impl<SnowflakeEpoch> SnowflakeGenerator<SnowflakeEpoch> {
    #[must_use]
    pub fn new(worker_id: WorkerId) -> Self {
        Self {
            worker_id,
            last_millis: 0,
            next_increment: 0,
            phantom_data: PhantomData,
        }
    }

    #[must_use]
    pub fn worker_id(&self) -> WorkerId {
        self.worker_id
    }

    pub fn generate_at(
        &mut self,
        time: UtcDateTime,
    ) -> Result<Snowflake<SnowflakeEpoch>, SnowflakeTimestampError>
    where
        SnowflakeEpoch: Epoch,
    {
        let millis = millis_since_epoch::<SnowflakeEpoch>(time)?;

        if millis > self.last_millis {
            self.last_millis = millis;
            self.next_increment = 0;
        } else if self.next_increment > mask(INCREMENT_LENGTH) {
            self.last_millis += 1;
            self.next_increment = 0;
        }

        if self.last_millis > mask(TIMESTAMP_LENGTH) {
            return Err(SnowflakeTimestampError::TimestampTooLarge);
        }

        #[allow(clippy::cast_possible_truncation)]
        let increment = self.next_increment as u16;
        self.next_increment += 1;

        Ok(Snowflake::from_raw_parts(
            self.last_millis,
            self.worker_id,
            increment,
        ))
    }

    pub fn generate(&mut self) -> Result<Snowflake<SnowflakeEpoch>, SnowflakeTimestampError>
    where
        SnowflakeEpoch: Epoch,
    {
        self.generate_at(UtcDateTime::now())
    }
}
