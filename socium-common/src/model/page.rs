use crate::model::account::Account;
use serde::{Deserialize, Serialize};

/// Zero based page selection. A `size` of 0 means "everything".
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Deserialize)]
#[serde(default)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    #[must_use]
    pub fn new(page: u32, size: u32) -> Self {
        Self { page, size }
    }

    #[must_use]
    pub fn skip(self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }

    #[must_use]
    pub fn limit(self) -> Option<u64> {
        (self.size != 0).then_some(u64::from(self.size))
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub number: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl Page {
    #[must_use]
    pub fn new(request: PageRequest, total_elements: u64) -> Self {
        let total_pages = match request.size {
            0 => u64::from(total_elements > 0),
            size => total_elements.div_ceil(u64::from(size)),
        };

        Self {
            number: request.page,
            size: request.size,
            total_elements,
            total_pages,
        }
    }
}

#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct AccountPage {
    pub accounts: Vec<Account>,
    pub page: Page,
}
