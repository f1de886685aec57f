//! [`Contract`]-related HTTP API definitions.

use axum::{extract::Path, Json};
use common::Handler as _;
use serde::{Deserialize, Serialize};
use service::{
    command,
    domain::{self, contract, property, user},
    query,
};

use crate::{define_error, AsError, Context, Error};

/// Representation of a rental [`domain::Contract`] in HTTP exchanges.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    /// ID of this `Contract`.
    pub id: contract::Id,

    /// ID of the tenant `User` renting the `Property`.
    pub tenant_id: user::Id,

    /// ID of the rented `Property`.
    pub property_id: property::Id,

    /// ID of the admin `User` who created this `Contract`.
    pub admin_id: user::Id,

    /// `DateTime` when the rental period starts.
    pub starts_at: contract::StartDateTime,

    /// `DateTime` when the rental period ends.
    pub ends_at: contract::EndDateTime,

    /// Status of this `Contract`.
    pub status: String,

    /// `DateTime` when this `Contract` was created.
    pub created_at: contract::CreationDateTime,

    /// `DateTime` when this `Contract` was activated, if it was.
    pub activated_at: Option<contract::ActivationDateTime>,

    /// `DateTime` when this `Contract` was cancelled, if it was.
    pub cancelled_at: Option<contract::CancellationDateTime>,

    /// `DateTime` when this `Contract` was rejected, if it was.
    pub rejected_at: Option<contract::RejectionDateTime>,

    /// `DateTime` when this `Contract` expired, if it did.
    pub expired_at: Option<contract::ExpirationDateTime>,

    /// Reason of the cancellation, if this `Contract` was cancelled.
    pub cancel_reason: Option<String>,

    /// Reason of the rejection, if this `Contract` was rejected.
    pub rejected_reason: Option<String>,
}

impl From<domain::Contract> for Contract {
    fn from(contract: domain::Contract) -> Self {
        let domain::Contract {
            id,
            tenant_id,
            property_id,
            admin_id,
            starts_at,
            ends_at,
            status,
            created_at,
            activated_at,
            cancelled_at,
            rejected_at,
            expired_at,
            cancel_reason,
            rejected_reason,
        } = contract;

        Self {
            id,
            tenant_id,
            property_id,
            admin_id,
            starts_at,
            ends_at,
            status: status.to_string(),
            created_at,
            activated_at,
            cancelled_at,
            rejected_at,
            expired_at,
            cancel_reason: cancel_reason.map(|r| r.to_string()),
            rejected_reason: rejected_reason.map(|r| r.to_string()),
        }
    }
}

/// Body of the `POST /contracts` HTTP request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    /// ID of the `Property` to rent out.
    pub property_id: property::Id,

    /// ID of the tenant `User` to rent the `Property` out to.
    pub tenant_id: user::Id,

    /// `DateTime` when the rental period starts.
    pub starts_at: contract::StartDateTime,

    /// `DateTime` when the rental period ends.
    pub ends_at: contract::EndDateTime,
}

/// Body of the `POST /contracts/:id/reject` and `POST /contracts/:id/cancel`
/// HTTP requests.
#[derive(Debug, Deserialize)]
pub struct ReasonRequest {
    /// Reason of the rejection or cancellation.
    pub reason: String,
}

/// Handles the `POST /contracts` HTTP request, creating a new PENDING rental
/// `Contract` and reserving its `Property`.
///
/// # Errors
///
/// Possible error codes:
/// - `ONLY_ADMIN_CAN_CREATE_CONTRACT` - the caller is not an admin;
/// - `INVALID_CONTRACT_DATES` - the rental period is empty or inverted;
/// - `TENANT_NOT_FOUND` - the tenant with the provided ID does not exist;
/// - `PROPERTY_NOT_AVAILABLE` - the `Property` does not exist or is not
///                              AVAILABLE.
#[tracing::instrument(
    skip_all,
    fields(
        property.id = %req.property_id,
        tenant.id = %req.tenant_id,
    ),
)]
pub async fn create(
    ctx: Context,
    Json(req): Json<CreateRequest>,
) -> Result<(http::StatusCode, Json<Contract>), Error> {
    let admin_id = ctx.caller().await?;
    let CreateRequest {
        property_id,
        tenant_id,
        starts_at,
        ends_at,
    } = req;

    ctx.service()
        .execute(command::CreateRentalContract {
            property_id,
            tenant_id,
            admin_id,
            starts_at,
            ends_at,
        })
        .await
        .map(|c| (http::StatusCode::CREATED, Json(c.into())))
        .map_err(AsError::into_error)
}

/// Handles the `POST /contracts/:id/activate` HTTP request, putting a PENDING
/// `Contract` in force and occupying its `Property`.
///
/// # Errors
///
/// Possible error codes:
/// - `ONLY_ADMIN_CAN_ACTIVATE_CONTRACT` - the caller is not an admin;
/// - `CONTRACT_NOT_FOUND` - the `Contract` with the provided ID does not
///                          exist;
/// - `INVALID_CONTRACT_STATUS` - the `Contract` is not PENDING.
#[tracing::instrument(skip_all, fields(contract.id = %id))]
pub async fn activate(
    ctx: Context,
    Path(id): Path<contract::Id>,
) -> Result<Json<Contract>, Error> {
    let admin_id = ctx.caller().await?;

    ctx.service()
        .execute(command::ActivateRentalContract {
            contract_id: id,
            admin_id,
        })
        .await
        .map(|c| Json(c.into()))
        .map_err(AsError::into_error)
}

/// Handles the `POST /contracts/:id/reject` HTTP request, declining a PENDING
/// `Contract` and releasing its `Property`.
///
/// # Errors
///
/// Possible error codes:
/// - `ONLY_ADMIN_CAN_REJECT_CONTRACT` - the caller is not an admin;
/// - `CONTRACT_NOT_FOUND` - the `Contract` with the provided ID does not
///                          exist;
/// - `INVALID_CONTRACT_STATUS` - the `Contract` is not PENDING;
/// - `INVALID_REASON` - the provided reason is malformed.
#[tracing::instrument(skip_all, fields(contract.id = %id))]
pub async fn reject(
    ctx: Context,
    Path(id): Path<contract::Id>,
    Json(req): Json<ReasonRequest>,
) -> Result<Json<Contract>, Error> {
    let admin_id = ctx.caller().await?;
    let reason = req
        .reason
        .parse()
        .map_err(|_| Error::from(ContractError::InvalidReason))?;

    ctx.service()
        .execute(command::RejectRentalContract {
            contract_id: id,
            admin_id,
            reason,
        })
        .await
        .map(|c| Json(c.into()))
        .map_err(AsError::into_error)
}

/// Handles the `POST /contracts/:id/cancel` HTTP request, withdrawing a
/// PENDING or ACTIVE `Contract` and releasing its `Property`.
///
/// # Errors
///
/// Possible error codes:
/// - `ONLY_ADMIN_CAN_CANCEL_CONTRACT` - the caller is not an admin;
/// - `CONTRACT_NOT_FOUND` - the `Contract` with the provided ID does not
///                          exist;
/// - `INVALID_CONTRACT_STATUS` - the `Contract` is neither PENDING nor
///                               ACTIVE;
/// - `INVALID_REASON` - the provided reason is malformed.
#[tracing::instrument(skip_all, fields(contract.id = %id))]
pub async fn cancel(
    ctx: Context,
    Path(id): Path<contract::Id>,
    Json(req): Json<ReasonRequest>,
) -> Result<Json<Contract>, Error> {
    let admin_id = ctx.caller().await?;
    let reason = req
        .reason
        .parse()
        .map_err(|_| Error::from(ContractError::InvalidReason))?;

    ctx.service()
        .execute(command::CancelRentalContract {
            contract_id: id,
            admin_id,
            reason,
        })
        .await
        .map(|c| Json(c.into()))
        .map_err(AsError::into_error)
}

/// Handles the `GET /contracts/:id` HTTP request, returning the `Contract`
/// with the provided ID.
///
/// # Errors
///
/// Possible error codes:
/// - `CONTRACT_NOT_FOUND` - the `Contract` with the provided ID does not
///                          exist.
#[tracing::instrument(skip_all, fields(contract.id = %id))]
pub async fn get(
    ctx: Context,
    Path(id): Path<contract::Id>,
) -> Result<Json<Contract>, Error> {
    ctx.caller().await.map(drop)?;

    ctx.service()
        .execute(query::contract::ById::by(id))
        .await
        .map_err(AsError::into_error)?
        .map(|c| Json(c.into()))
        .ok_or_else(|| ContractError::NotFound.into())
}

define_error! {
    enum ContractError {
        #[code = "CONTRACT_NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "Contract not found"]
        NotFound,

        #[code = "INVALID_REASON"]
        #[status = BAD_REQUEST]
        #[message = "Reason must have 3 to 500 characters"]
        InvalidReason,
    }
}

impl AsError for command::create_rental_contract::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "ONLY_ADMIN_CAN_CREATE_CONTRACT"]
                #[status = FORBIDDEN]
                #[message = "Only admins can create contracts"]
                OnlyAdminCanCreateContract,

                #[code = "INVALID_CONTRACT_DATES"]
                #[status = BAD_REQUEST]
                #[message = "Contract end date must be after its start date"]
                InvalidContractDates,

                #[code = "TENANT_NOT_FOUND"]
                #[status = BAD_REQUEST]
                #[message = "Tenant with the provided ID does not exist"]
                TenantNotFound,

                #[code = "PROPERTY_NOT_AVAILABLE"]
                #[status = CONFLICT]
                #[message = "Property is not available for rent"]
                PropertyNotAvailable,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::InvalidContractDates { .. } => {
                Some(Error::InvalidContractDates.into())
            }
            Self::OnlyAdminCanCreateContract(_) => {
                Some(Error::OnlyAdminCanCreateContract.into())
            }
            Self::PropertyNotAvailable(_) => {
                Some(Error::PropertyNotAvailable.into())
            }
            Self::TenantNotFound(_) => Some(Error::TenantNotFound.into()),
        }
    }
}

impl AsError for command::activate_rental_contract::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "ONLY_ADMIN_CAN_ACTIVATE_CONTRACT"]
                #[status = FORBIDDEN]
                #[message = "Only admins can activate contracts"]
                OnlyAdminCanActivateContract,

                #[code = "INVALID_CONTRACT_STATUS"]
                #[status = BAD_REQUEST]
                #[message = "Only PENDING contracts can be activated"]
                InvalidContractStatus,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::ContractNotFound(_) => Some(ContractError::NotFound.into()),
            Self::InvalidContractStatus { .. } => {
                Some(Error::InvalidContractStatus.into())
            }
            Self::OnlyAdminCanActivateContract(_) => {
                Some(Error::OnlyAdminCanActivateContract.into())
            }
        }
    }
}

impl AsError for command::reject_rental_contract::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "ONLY_ADMIN_CAN_REJECT_CONTRACT"]
                #[status = FORBIDDEN]
                #[message = "Only admins can reject contracts"]
                OnlyAdminCanRejectContract,

                #[code = "INVALID_CONTRACT_STATUS"]
                #[status = BAD_REQUEST]
                #[message = "Only PENDING contracts can be rejected"]
                InvalidContractStatus,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::ContractNotFound(_) => Some(ContractError::NotFound.into()),
            Self::InvalidContractStatus { .. } => {
                Some(Error::InvalidContractStatus.into())
            }
            Self::OnlyAdminCanRejectContract(_) => {
                Some(Error::OnlyAdminCanRejectContract.into())
            }
        }
    }
}

impl AsError for command::cancel_rental_contract::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "ONLY_ADMIN_CAN_CANCEL_CONTRACT"]
                #[status = FORBIDDEN]
                #[message = "Only admins can cancel contracts"]
                OnlyAdminCanCancelContract,

                #[code = "INVALID_CONTRACT_STATUS"]
                #[status = BAD_REQUEST]
                #[message = "Only PENDING or ACTIVE contracts can be \
                             cancelled"]
                InvalidContractStatus,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::ContractNotFound(_) => Some(ContractError::NotFound.into()),
            Self::InvalidContractStatus { .. } => {
                Some(Error::InvalidContractStatus.into())
            }
            Self::OnlyAdminCanCancelContract(_) => {
                Some(Error::OnlyAdminCanCancelContract.into())
            }
        }
    }
}
