//! [`Contract`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{property, user};
#[cfg(doc)]
use crate::domain::{Property, User};

/// Rental [`Contract`] binding a tenant [`User`] to a [`Property`].
#[derive(Clone, Debug)]
pub struct Contract {
    /// ID of this [`Contract`].
    pub id: Id,

    /// ID of the tenant [`User`] renting the [`Property`].
    pub tenant_id: user::Id,

    /// ID of the rented [`Property`].
    pub property_id: property::Id,

    /// ID of the admin [`User`] who created this [`Contract`].
    pub admin_id: user::Id,

    /// [`DateTime`] when the rental period starts.
    pub starts_at: StartDateTime,

    /// [`DateTime`] when the rental period ends.
    ///
    /// Always strictly after [`Contract::starts_at`].
    pub ends_at: EndDateTime,

    /// [`Status`] of this [`Contract`].
    pub status: Status,

    /// [`DateTime`] when this [`Contract`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Contract`] was activated, if it was.
    pub activated_at: Option<ActivationDateTime>,

    /// [`DateTime`] when this [`Contract`] was cancelled, if it was.
    pub cancelled_at: Option<CancellationDateTime>,

    /// [`DateTime`] when this [`Contract`] was rejected, if it was.
    pub rejected_at: Option<RejectionDateTime>,

    /// [`DateTime`] when this [`Contract`] expired.
    ///
    /// Unused for now, and so is always [`None`].
    pub expired_at: Option<ExpirationDateTime>,

    /// [`Reason`] of the cancellation, if this [`Contract`] was cancelled.
    pub cancel_reason: Option<Reason>,

    /// [`Reason`] of the rejection, if this [`Contract`] was rejected.
    pub rejected_reason: Option<Reason>,
}

/// ID of a [`Contract`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

define_kind! {
    #[doc = "Status of a [`Contract`]."]
    enum Status {
        #[doc = "The [`Contract`] awaits an admin decision."]
        Pending = 1,

        #[doc = "The [`Contract`] is in force."]
        Active = 2,

        #[doc = "The [`Contract`] was rejected. Terminal."]
        Rejected = 3,

        #[doc = "The [`Contract`] was cancelled. Terminal."]
        Canceled = 4,
    }
}

impl Status {
    /// Returns whether a [`Contract`] in this [`Status`] can be cancelled.
    #[must_use]
    pub fn is_cancellable(self) -> bool {
        matches!(self, Self::Pending | Self::Active)
    }
}

/// Reason of a [`Contract`] rejection or cancellation.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Reason(String);

impl Reason {
    /// Creates a new [`Reason`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `reason` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }

    /// Creates a new [`Reason`] if the given `reason` is valid.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Option<Self> {
        let reason = reason.into();
        Self::check(&reason).then_some(Self(reason))
    }

    /// Checks whether the given `reason` is a valid [`Reason`].
    fn check(reason: impl AsRef<str>) -> bool {
        let reason = reason.as_ref();
        reason.trim() == reason && reason.len() >= 3 && reason.len() <= 500
    }
}

impl FromStr for Reason {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Reason`")
    }
}

/// Marker type indicating the start of a rental period.
#[derive(Clone, Copy, Debug)]
pub struct Start;

/// Marker type indicating the end of a rental period.
#[derive(Clone, Copy, Debug)]
pub struct End;

/// Marker type indicating a [`Contract`] activation.
#[derive(Clone, Copy, Debug)]
pub struct Activation;

/// Marker type indicating a [`Contract`] cancellation.
#[derive(Clone, Copy, Debug)]
pub struct Cancellation;

/// Marker type indicating a [`Contract`] rejection.
#[derive(Clone, Copy, Debug)]
pub struct Rejection;

/// Marker type indicating a [`Contract`] expiration.
#[derive(Clone, Copy, Debug)]
pub struct Expiration;

/// [`DateTime`] when a [`Contract`] rental period starts.
pub type StartDateTime = DateTimeOf<(Contract, Start)>;

/// [`DateTime`] when a [`Contract`] rental period ends.
pub type EndDateTime = DateTimeOf<(Contract, End)>;

/// [`DateTime`] when a [`Contract`] was created.
pub type CreationDateTime = DateTimeOf<(Contract, unit::Creation)>;

/// [`DateTime`] when a [`Contract`] was activated.
pub type ActivationDateTime = DateTimeOf<(Contract, Activation)>;

/// [`DateTime`] when a [`Contract`] was cancelled.
pub type CancellationDateTime = DateTimeOf<(Contract, Cancellation)>;

/// [`DateTime`] when a [`Contract`] was rejected.
pub type RejectionDateTime = DateTimeOf<(Contract, Rejection)>;

/// [`DateTime`] when a [`Contract`] expired.
pub type ExpirationDateTime = DateTimeOf<(Contract, Expiration)>;

#[cfg(test)]
mod spec {
    use super::{Reason, Status};

    #[test]
    fn reason_requires_3_to_500_chars() {
        assert!(Reason::new("no").is_none());
        assert!(Reason::new("Invalid documentation").is_some());
        assert!(Reason::new("a".repeat(500)).is_some());
        assert!(Reason::new("a".repeat(501)).is_none());
    }

    #[test]
    fn reason_rejects_surrounding_whitespace() {
        assert!(Reason::new("  why  ").is_none());
    }

    #[test]
    fn only_pending_and_active_are_cancellable() {
        assert!(Status::Pending.is_cancellable());
        assert!(Status::Active.is_cancellable());
        assert!(!Status::Rejected.is_cancellable());
        assert!(!Status::Canceled.is_cancellable());
    }
}
