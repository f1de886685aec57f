//! [`Property`]-related HTTP API definitions.

use axum::{extract::Path, Json};
use common::Handler as _;
use serde::{Deserialize, Serialize};
use service::{
    command,
    domain::{self, property},
    query,
};

use crate::{define_error, AsError, Context, Error};

/// Representation of a [`domain::Property`] in HTTP exchanges.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    /// ID of this `Property`.
    pub id: property::Id,

    /// Title of this `Property`.
    pub title: String,

    /// Kind of this `Property`.
    pub kind: String,

    /// Availability status of this `Property`.
    pub status: String,

    /// Address of this `Property`.
    pub address: String,

    /// `DateTime` when this `Property` was reserved, if it is.
    pub reserved_at: Option<property::ReservationDateTime>,

    /// `DateTime` until which this `Property` stays reserved, if it is.
    pub reserved_until: Option<property::ReservationDeadline>,

    /// `DateTime` when this `Property` was created.
    pub created_at: property::CreationDateTime,
}

impl From<domain::Property> for Property {
    fn from(property: domain::Property) -> Self {
        let domain::Property {
            id,
            title,
            kind,
            status,
            address,
            reservation,
            created_at,
        } = property;

        Self {
            id,
            title: title.to_string(),
            kind: kind.to_string(),
            status: status.to_string(),
            address: address.to_string(),
            reserved_at: reservation.map(|r| r.at),
            reserved_until: reservation.map(|r| r.until),
            created_at,
        }
    }
}

/// Body of the `POST /properties` HTTP request.
#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    /// Title of the new `Property`.
    pub title: String,

    /// Kind of the new `Property`.
    pub kind: String,

    /// Address of the new `Property`.
    pub address: String,
}

/// Handles the `POST /properties` HTTP request, registering a new AVAILABLE
/// `Property`.
///
/// # Errors
///
/// Possible error codes:
/// - `ONLY_ADMIN_CAN_CREATE_PROPERTY` - the caller is not an admin;
/// - `INVALID_PROPERTY_TITLE` - the provided title is malformed;
/// - `INVALID_PROPERTY_KIND` - the provided kind is not a known one;
/// - `INVALID_PROPERTY_ADDRESS` - the provided address is malformed.
#[tracing::instrument(skip_all, fields(kind = %req.kind))]
pub async fn create(
    ctx: Context,
    Json(req): Json<CreateRequest>,
) -> Result<(http::StatusCode, Json<Property>), Error> {
    let admin_id = ctx.caller().await?;
    let CreateRequest {
        title,
        kind,
        address,
    } = req;

    let title = title
        .parse()
        .map_err(|_| Error::from(PropertyError::InvalidTitle))?;
    let kind = kind
        .parse()
        .map_err(|_| Error::from(PropertyError::InvalidKind))?;
    let address = address
        .parse()
        .map_err(|_| Error::from(PropertyError::InvalidAddress))?;

    ctx.service()
        .execute(command::CreateProperty {
            title,
            kind,
            address,
            admin_id,
        })
        .await
        .map(|p| (http::StatusCode::CREATED, Json(p.into())))
        .map_err(AsError::into_error)
}

/// Handles the `DELETE /properties/:id` HTTP request, removing a `Property`
/// from the agency's portfolio.
///
/// # Errors
///
/// Possible error codes:
/// - `ONLY_ADMIN_CAN_DELETE_PROPERTY` - the caller is not an admin;
/// - `PROPERTY_NOT_FOUND` - the `Property` with the provided ID does not
///                          exist;
/// - `PROPERTY_HAS_ACTIVE_CONTRACT` - an ACTIVE `Contract` references the
///                                    `Property`;
/// - `PROPERTY_IS_OCCUPIED` - the `Property` is OCCUPIED;
/// - `PROPERTY_IS_RESERVED` - the `Property` is RESERVED.
#[tracing::instrument(skip_all, fields(property.id = %id))]
pub async fn delete(
    ctx: Context,
    Path(id): Path<property::Id>,
) -> Result<Json<Message>, Error> {
    let admin_id = ctx.caller().await?;

    ctx.service()
        .execute(command::DeleteProperty {
            property_id: id,
            admin_id,
        })
        .await
        .map(|()| {
            Json(Message {
                message: "Property deleted successfully",
            })
        })
        .map_err(AsError::into_error)
}

/// Handles the `GET /properties/:id` HTTP request, returning the `Property`
/// with the provided ID.
///
/// # Errors
///
/// Possible error codes:
/// - `PROPERTY_NOT_FOUND` - the `Property` with the provided ID does not
///                          exist.
#[tracing::instrument(skip_all, fields(property.id = %id))]
pub async fn get(
    ctx: Context,
    Path(id): Path<property::Id>,
) -> Result<Json<Property>, Error> {
    ctx.caller().await.map(drop)?;

    ctx.service()
        .execute(query::property::ById::by(id))
        .await
        .map_err(AsError::into_error)?
        .map(|p| Json(p.into()))
        .ok_or_else(|| PropertyError::NotFound.into())
}

/// Confirmation message of a successful HTTP request.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Message {
    /// Human-readable confirmation.
    pub message: &'static str,
}

define_error! {
    enum PropertyError {
        #[code = "PROPERTY_NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "Property not found"]
        NotFound,

        #[code = "INVALID_PROPERTY_TITLE"]
        #[status = BAD_REQUEST]
        #[message = "Title must have 3 to 512 characters"]
        InvalidTitle,

        #[code = "INVALID_PROPERTY_KIND"]
        #[status = BAD_REQUEST]
        #[message = "Unknown property kind"]
        InvalidKind,

        #[code = "INVALID_PROPERTY_ADDRESS"]
        #[status = BAD_REQUEST]
        #[message = "Address must have 1 to 512 characters"]
        InvalidAddress,
    }
}

impl AsError for command::create_property::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "ONLY_ADMIN_CAN_CREATE_PROPERTY"]
                #[status = FORBIDDEN]
                #[message = "Only admins can create properties"]
                OnlyAdminCanCreateProperty,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::OnlyAdminCanCreateProperty(_) => {
                Some(Error::OnlyAdminCanCreateProperty.into())
            }
        }
    }
}

impl AsError for command::delete_property::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "ONLY_ADMIN_CAN_DELETE_PROPERTY"]
                #[status = FORBIDDEN]
                #[message = "Only admins can delete properties"]
                OnlyAdminCanDeleteProperty,

                #[code = "PROPERTY_HAS_ACTIVE_CONTRACT"]
                #[status = CONFLICT]
                #[message = "Property is rented out under an active contract"]
                PropertyHasActiveContract,

                #[code = "PROPERTY_IS_OCCUPIED"]
                #[status = CONFLICT]
                #[message = "Property is occupied"]
                PropertyIsOccupied,

                #[code = "PROPERTY_IS_RESERVED"]
                #[status = CONFLICT]
                #[message = "Property is reserved"]
                PropertyIsReserved,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::OnlyAdminCanDeleteProperty(_) => {
                Some(Error::OnlyAdminCanDeleteProperty.into())
            }
            Self::PropertyHasActiveContract(_) => {
                Some(Error::PropertyHasActiveContract.into())
            }
            Self::PropertyIsOccupied(_) => {
                Some(Error::PropertyIsOccupied.into())
            }
            Self::PropertyIsReserved(_) => {
                Some(Error::PropertyIsReserved.into())
            }
            Self::PropertyNotFound(_) => Some(PropertyError::NotFound.into()),
        }
    }
}
