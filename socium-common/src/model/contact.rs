use crate::model::{Id, account::EmailAddress};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct ContactMarker;

/// A message left through the public contact form.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct ContactMessage {
    pub id: Id<ContactMarker>,
    pub name: String,
    pub surname: String,
    pub email: EmailAddress,
    pub message: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct CreateContact {
    pub name: String,
    pub surname: String,
    pub email: EmailAddress,
    pub message: String,
}
