//! [`Property`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::Contract;

/// Rentable property.
#[derive(Clone, Debug)]
pub struct Property {
    /// ID of this [`Property`].
    pub id: Id,

    /// [`Title`] of this [`Property`].
    pub title: Title,

    /// [`Kind`] of this [`Property`].
    pub kind: Kind,

    /// [`Status`] of this [`Property`].
    pub status: Status,

    /// [`Address`] of this [`Property`].
    pub address: Address,

    /// Active [`Reservation`] hold of this [`Property`].
    ///
    /// Set if and only if the [`Status`] is [`Reserved`].
    ///
    /// [`Reserved`]: Status::Reserved
    pub reservation: Option<Reservation>,

    /// [`DateTime`] when this [`Property`] was created.
    pub created_at: CreationDateTime,
}

impl Property {
    /// Returns whether this [`Property`] can be reserved.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.status == Status::Available
    }
}

/// ID of a [`Property`].
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

/// Title of a [`Property`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Title(String);

impl Title {
    /// Creates a new [`Title`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `title` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(title: impl Into<String>) -> Self {
        Self(title.into())
    }

    /// Creates a new [`Title`] if the given `title` is valid.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Option<Self> {
        let title = title.into();
        Self::check(&title).then_some(Self(title))
    }

    /// Checks whether the given `title` is a valid [`Title`].
    fn check(title: impl AsRef<str>) -> bool {
        let title = title.as_ref();
        title.trim() == title && title.len() >= 3 && title.len() <= 512
    }
}

impl FromStr for Title {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Title`")
    }
}

/// Full address of a [`Property`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Address(String);

impl Address {
    /// Creates a new [`Address`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `address` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Creates a new [`Address`] if the given `address` is valid.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Option<Self> {
        let address = address.into();
        Self::check(&address).then_some(Self(address))
    }

    /// Checks whether the given `address` is a valid [`Address`].
    fn check(address: impl AsRef<str>) -> bool {
        let address = address.as_ref();
        address.trim() == address && !address.is_empty() && address.len() <= 512
    }
}

impl FromStr for Address {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Address`")
    }
}

define_kind! {
    #[doc = "Kind of a [`Property`]."]
    enum Kind {
        #[doc = "A detached house."]
        House = 1,

        #[doc = "An apartment in a building."]
        Apartment = 2,

        #[doc = "A single-room studio."]
        Studio = 3,

        #[doc = "A kitchenette apartment."]
        Kitnet = 4,

        #[doc = "A room in a shared property."]
        Room = 5,
    }
}

define_kind! {
    #[doc = "Availability status of a [`Property`]."]
    enum Status {
        #[doc = "The [`Property`] can be reserved."]
        Available = 1,

        #[doc = "The [`Property`] is held by a PENDING [`Contract`]."]
        Reserved = 2,

        #[doc = "The [`Property`] is rented under an ACTIVE [`Contract`]."]
        Occupied = 3,
    }
}

/// Reservation hold placed on a [`Property`] by a PENDING [`Contract`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Reservation {
    /// [`DateTime`] when this [`Reservation`] was placed.
    pub at: ReservationDateTime,

    /// [`DateTime`] when this [`Reservation`] lapses.
    pub until: ReservationDeadline,
}

/// Marker type indicating the expiry of a [`Reservation`].
#[derive(Clone, Copy, Debug)]
pub struct Expiry;

/// [`DateTime`] when a [`Property`] was reserved.
pub type ReservationDateTime = DateTimeOf<(Property, Reservation)>;

/// [`DateTime`] until which a [`Property`] stays reserved.
pub type ReservationDeadline = DateTimeOf<(Property, Expiry)>;

/// [`DateTime`] when a [`Property`] was created.
pub type CreationDateTime = DateTimeOf<(Property, unit::Creation)>;

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use common::DateTime;

    use super::{Id, Kind, Property, Status, Title};

    impl Property {
        /// Returns an available [`Property`] for storing in tests.
        pub(crate) fn stored() -> Self {
            Self {
                id: Id::new(),
                title: "Sunny two-room apartment".parse().unwrap(),
                kind: Kind::Apartment,
                status: Status::Available,
                address: "742 Evergreen Terrace".parse().unwrap(),
                reservation: None,
                created_at: DateTime::now().coerce(),
            }
        }
    }

    #[test]
    fn title_requires_3_to_512_chars() {
        assert!(Title::new("ab").is_none());
        assert!(Title::new("Sea side apartment").is_some());
        assert!(Title::new("a".repeat(512)).is_some());
        assert!(Title::new("a".repeat(513)).is_none());
    }

    #[test]
    fn title_rejects_surrounding_whitespace() {
        assert!(Title::new(" padded ").is_none());
    }

    #[test]
    fn kind_parses_screaming_snake_case() {
        assert_eq!(Kind::from_str("HOUSE").ok(), Some(Kind::House));
        assert_eq!(Kind::from_str("KITNET").ok(), Some(Kind::Kitnet));
        assert_eq!(Kind::House.to_string(), "HOUSE");
        assert!(Kind::from_str("CASTLE").is_err());
    }

    #[test]
    fn status_is_int2_sized() {
        assert_eq!(Status::Available.u8(), 1);
        assert_eq!(Status::Reserved.u8(), 2);
        assert_eq!(Status::Occupied.u8(), 3);
    }
}
