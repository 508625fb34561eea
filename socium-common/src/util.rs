use thiserror::Error;
use time::{Duration, OffsetDateTime};

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Default, Hash)]
pub struct PositiveDuration(Duration);

impl PositiveDuration {
    #[must_use]
    pub fn new(duration: Duration) -> Option<Self> {
        duration.is_positive().then_some(Self(duration))
    }

    #[must_use]
    pub fn from_hours(hours: u32) -> Option<Self> {
        Self::new(Duration::hours(i64::from(hours)))
    }

    #[must_use]
    pub fn get(self) -> Duration {
        self.0
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The duration is not positive: {0}")]
pub struct NonPositiveDurationError(Duration);

impl TryFrom<Duration> for PositiveDuration {
    type Error = NonPositiveDurationError;

    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(NonPositiveDurationError(value))
    }
}

/// Current UTC time truncated to whole seconds.
#[must_use]
pub fn timestamp_now() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now - Duration::nanoseconds(i64::from(now.nanosecond()))
}

/// Removes the first occurrence of `element`, keeping the order of the rest.
///
/// Returns whether anything was removed.
pub fn remove_element<T: PartialEq>(list: &mut Vec<T>, element: &T) -> bool {
    match list.iter().position(|item| item == element) {
        Some(index) => {
            list.remove(index);
            true
        }
        None => false,
    }
}

/// Appends `element` unless it is already present.
///
/// Returns whether the list changed.
pub fn push_unique<T: PartialEq>(list: &mut Vec<T>, element: T) -> bool {
    if list.contains(&element) {
        false
    } else {
        list.push(element);
        true
    }
}

/// Removes `element` if present, appends it otherwise.
///
/// Returns whether the element is now a member.
pub fn toggle_membership<T: PartialEq>(list: &mut Vec<T>, element: T) -> bool {
    if remove_element(list, &element) {
        false
    } else {
        list.push(element);
        true
    }
}
