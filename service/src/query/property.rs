//! [`Query`] collection related to a single [`Property`].

use common::operations::By;

use crate::{
    domain::{property, user, Property},
    read,
};
#[cfg(doc)]
use crate::{
    domain::{Contract, User},
    Query,
};

use super::DatabaseQuery;

/// Queries a [`Property`] by its [`property::Id`].
pub type ById = DatabaseQuery<By<Option<Property>, property::Id>>;

/// Queries whether a [`Property`] is rented by the given [`User`] under an
/// ACTIVE [`Contract`].
///
/// Consumed by the external support ticket system to check that the ticket
/// author actually rents the [`Property`] the ticket is about.
pub type IsRentedBy =
    DatabaseQuery<By<read::property::IsRentedBy, (user::Id, property::Id)>>;
