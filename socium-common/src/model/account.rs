use crate::{
    geo::Coordinates,
    model::{
        Id,
        auth::{HashedPassword, Password},
    },
};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};
use thiserror::Error;
use time::OffsetDateTime;

pub const EMAIL_MAX_LEN: usize = 254;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct AccountMarker;

#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Unknown role: {0}")]
pub struct InvalidRoleError(String);

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = InvalidRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(InvalidRoleError(other.to_owned())),
        }
    }
}

/// A registered person.
///
/// `friend_ids` is kept symmetric by the relationship engine: whenever `b`
/// is in `a.friend_ids`, `a` is in `b.friend_ids`.
#[derive(Clone, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Id<AccountMarker>,
    pub name: String,
    pub surname: String,
    pub email: EmailAddress,
    #[serde(skip)]
    pub password_hash: HashedPassword,
    #[serde(rename = "userType")]
    pub role: Role,
    pub is_activated: bool,
    pub description: String,
    pub profile_image: String,
    pub location: Option<Coordinates>,
    pub friend_request_ids: Vec<Id<AccountMarker>>,
    pub friend_ids: Vec<Id<AccountMarker>>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Account {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Clone, PartialEq, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccount {
    pub name: String,
    pub surname: String,
    pub email: EmailAddress,
    pub password: Password,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
pub struct Credentials {
    pub email: EmailAddress,
    pub password: Password,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateProfile {
    pub description: String,
    pub profile_image: String,
}

/// A syntactically plausible, lower-cased email address.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The email address is invalid: {0}")]
pub struct InvalidEmailError(String);

impl EmailAddress {
    pub fn new(address: &str) -> Result<Self, InvalidEmailError> {
        let address = address.trim();

        let well_formed = address.len() <= EMAIL_MAX_LEN
            && !address.chars().any(char::is_whitespace)
            && address
                .split_once('@')
                .is_some_and(|(local, domain)| {
                    !local.is_empty() && !domain.is_empty() && !domain.contains('@')
                });

        if well_formed {
            Ok(EmailAddress(address.to_lowercase()))
        } else {
            Err(InvalidEmailError(address.to_owned()))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl Display for EmailAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EmailAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        EmailAddress::new(&inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"EmailAddress"))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::account::{EmailAddress, Role};

    #[test]
    fn email_validation() {
        assert_eq!(
            EmailAddress::new("  Jane.Doe@Example.com ").unwrap().get(),
            "jane.doe@example.com"
        );

        for invalid in ["", "no-at-sign", "@example.com", "jane@", "a@b@c", "ja ne@x.io"] {
            assert!(EmailAddress::new(invalid).is_err(), "{invalid}");
        }

        let too_long = format!("{}@example.com", "a".repeat(250));
        assert!(EmailAddress::new(&too_long).is_err());
    }

    #[test]
    fn role_round_trip() {
        for role in [Role::User, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert!("root".parse::<Role>().is_err());
    }
}
