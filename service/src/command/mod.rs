//! [`Command`] definition.

pub mod activate_rental_contract;
pub mod cancel_rental_contract;
pub mod create_property;
pub mod create_rental_contract;
pub mod delete_property;
pub mod reject_rental_contract;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    activate_rental_contract::ActivateRentalContract,
    cancel_rental_contract::CancelRentalContract,
    create_property::CreateProperty,
    create_rental_contract::CreateRentalContract,
    delete_property::DeleteProperty,
    reject_rental_contract::RejectRentalContract,
};
