pub mod account;
pub mod auth;
pub mod comment;
pub mod contact;
pub mod dashboard;
pub mod page;
pub mod post;

use crate::{
    geo::InvalidCoordinatesError,
    model::account::{InvalidEmailError, InvalidRoleError},
    snowflake::{Epoch, Snowflake, SnowflakeGenerator},
};
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, Unexpected, Visitor},
};
use std::{
    fmt::{Display, Formatter},
    marker::PhantomData,
    num::ParseIntError,
    str::FromStr,
};
use thiserror::Error;
use time::{UtcDateTime, macros::utc_datetime};

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    Email(#[from] InvalidEmailError),
    #[error(transparent)]
    Role(#[from] InvalidRoleError),
    #[error(transparent)]
    Coordinates(#[from] InvalidCoordinatesError),
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct SociumEpoch;
impl Epoch for SociumEpoch {
    const EPOCH_TIME: UtcDateTime = utc_datetime!(2021-01-01 00:00);
}

pub type SociumSnowflake = Snowflake<SociumEpoch>;
pub type SociumSnowflakeGenerator = SnowflakeGenerator<SociumEpoch>;

/// Opaque record id, typed by the kind of record it points at.
///
/// Serialized as a decimal string so that clients without 64 bit integers
/// can pass it around unchanged.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct Id<Marker>(SociumSnowflake, PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(snowflake: SociumSnowflake) -> Self {
        Self(snowflake, PhantomData)
    }

    #[must_use]
    pub fn snowflake(self) -> SociumSnowflake {
        self.0
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> FromStr for Id<Marker> {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SociumSnowflake::from_str(s).map(Self::new)
    }
}

impl<Marker> From<SociumSnowflake> for Id<Marker> {
    fn from(value: SociumSnowflake) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<Id<Marker>> for SociumSnowflake {
    fn from(value: Id<Marker>) -> Self {
        value.0
    }
}

impl<Marker> From<u64> for Id<Marker> {
    fn from(value: u64) -> Self {
        Id::new(SociumSnowflake::new(value))
    }
}

impl<Marker> From<Id<Marker>> for u64 {
    fn from(value: Id<Marker>) -> Self {
        value.snowflake().get()
    }
}

impl<Marker> Serialize for Id<Marker> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&self.0)
    }
}

struct IdVisitor<Marker>(PhantomData<Marker>);

impl<Marker> Visitor<'_> for IdVisitor<Marker> {
    type Value = Id<Marker>;

    fn expecting(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("a record id")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
        Ok(Id::from(value))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        value
            .parse()
            .map_err(|_| E::invalid_value(Unexpected::Str(value), &self))
    }
}

impl<'de, Marker> Deserialize<'de> for Id<Marker> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(IdVisitor(PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{Id, account::AccountMarker};

    #[test]
    fn id_serializes_as_string() {
        let id = Id::<AccountMarker>::from(3_416_751_341_570_822_244);

        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"3416751341570822244\"");

        assert_eq!(serde_json::from_str::<Id<AccountMarker>>(&json).unwrap(), id);
        assert_eq!(
            serde_json::from_str::<Id<AccountMarker>>("3416751341570822244").unwrap(),
            id
        );
        assert!(serde_json::from_str::<Id<AccountMarker>>("\"abc\"").is_err());
    }
}
