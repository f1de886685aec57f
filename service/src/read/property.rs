//! [`Property`]-related read definitions.

use derive_more::Deref;

#[cfg(doc)]
use crate::domain::{Contract, Property, User};

/// Indicator whether a [`Property`] is rented under an ACTIVE [`Contract`].
#[derive(Clone, Copy, Debug, Deref, Eq, Hash, PartialEq)]
pub struct IsRented(pub bool);

impl PartialEq<bool> for IsRented {
    fn eq(&self, other: &bool) -> bool {
        self.0 == *other
    }
}

/// Indicator whether a [`Property`] is rented by a particular [`User`] under
/// an ACTIVE [`Contract`].
#[derive(Clone, Copy, Debug, Deref, Eq, Hash, PartialEq)]
pub struct IsRentedBy(pub bool);

impl PartialEq<bool> for IsRentedBy {
    fn eq(&self, other: &bool) -> bool {
        self.0 == *other
    }
}
