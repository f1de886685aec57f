//! [`Command`] for cancelling a rental [`Contract`].

use common::{
    operations::{
        By, Cancel, Commit, Lock, Release, Select, Transact, Transacted,
    },
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{contract, property, user, Contract, Property, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for cancelling a [`Contract`], either
/// [`contract::Status::Pending`] or [`contract::Status::Active`].
///
/// Releases the [`Property`] back to [`property::Status::Available`] and
/// marks the [`Contract`] as [`contract::Status::Canceled`], which is
/// terminal.
#[derive(Clone, Debug)]
pub struct CancelRentalContract {
    /// ID of the [`Contract`] to cancel.
    pub contract_id: contract::Id,

    /// ID of the administrator [`User`] cancelling the [`Contract`].
    pub admin_id: user::Id,

    /// [`contract::Reason`] of the cancellation.
    pub reason: contract::Reason,
}

impl<Db> Command<CancelRentalContract> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Contract>, contract::Id>>,
            Ok = Option<Contract>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Property, property::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Release<By<Property, property::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Cancel<
                By<
                    Contract,
                    (
                        contract::Id,
                        contract::CancellationDateTime,
                        contract::Reason,
                    ),
                >,
            >,
            Ok = Option<Contract>,
            Err = Traced<database::Error>,
        > + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Contract;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CancelRentalContract,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CancelRentalContract {
            contract_id,
            admin_id,
            reason,
        } = cmd;

        self.database()
            .execute(Select(By::<Option<User>, _>::new(admin_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(User::is_admin)
            .ok_or(E::OnlyAdminCanCancelContract(admin_id))
            .map_err(tracerr::wrap!())
            .map(drop)?;

        let contract = self
            .database()
            .execute(Select(By::<Option<Contract>, _>::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ContractNotFound(contract_id))
            .map_err(tracerr::wrap!())?;
        if !contract.status.is_cancellable() {
            return Err(tracerr::new!(E::InvalidContractStatus {
                id: contract.id,
                status: contract.status,
            }));
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent actions upon the same `Property`.
        tx.execute(Lock(By::new(contract.property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Release(By::new(contract.property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let contract = tx
            .execute(Cancel(By::<Contract, _>::new((
                contract.id,
                DateTime::now().coerce(),
                reason,
            ))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::InvalidContractStatus {
                id: contract.id,
                status: contract.status,
            })
            .map_err(tracerr::wrap!())?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(contract)
    }
}

/// Error of [`CancelRentalContract`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`User`] with the provided ID is not an administrator.
    #[display("`User(id: {_0})` is not allowed to cancel `Contract`s")]
    OnlyAdminCanCancelContract(#[error(not(source))] user::Id),

    /// [`Contract`] with the provided ID does not exist.
    #[display("`Contract(id: {_0})` does not exist")]
    ContractNotFound(#[error(not(source))] contract::Id),

    /// [`Contract`] status does not allow cancellation.
    #[display(
        "`Contract(id: {id})` cannot be cancelled from status `{status}`"
    )]
    InvalidContractStatus {
        /// ID of the [`Contract`].
        id: contract::Id,

        /// Current [`contract::Status`] of the [`Contract`].
        status: contract::Status,
    },
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Insert, Select};

    use crate::{
        command::{
            activate_rental_contract::ExecutionError as ActivationError,
            ActivateRentalContract, CreateRentalContract,
            RejectRentalContract,
        },
        domain::{contract, property, user, Contract, Property, User},
        infra::InMemory,
        Command as _, Service,
    };

    use super::{CancelRentalContract, ExecutionError};

    /// Returns a [`Service`] with a freshly created
    /// [`contract::Status::Pending`] [`Contract`].
    async fn service() -> (Service<InMemory>, Contract, user::Id) {
        let db = InMemory::new();
        let admin = User::stored(user::Role::Admin);
        let tenant = User::stored(user::Role::User);
        let property = Property::stored();
        let (admin_id, tenant_id, property_id) =
            (admin.id, tenant.id, property.id);

        db.execute(Insert(admin)).await.unwrap();
        db.execute(Insert(tenant)).await.unwrap();
        db.execute(Insert(property)).await.unwrap();

        let service = Service::new(db);
        let contract = service
            .execute(CreateRentalContract {
                property_id,
                tenant_id,
                admin_id,
                starts_at: "2030-01-01T12:00:00Z".parse().unwrap(),
                ends_at: "2030-06-01T12:00:00Z".parse().unwrap(),
            })
            .await
            .unwrap();

        (service, contract, admin_id)
    }

    /// Returns a [`CancelRentalContract`] command with a plausible reason.
    fn cmd(
        contract_id: contract::Id,
        admin_id: user::Id,
    ) -> CancelRentalContract {
        CancelRentalContract {
            contract_id,
            admin_id,
            reason: "Tenant withdrew the application".parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn cancels_pending_contract_and_releases_property() {
        let (service, contract, admin_id) = service().await;

        let cancelled = service
            .execute(cmd(contract.id, admin_id))
            .await
            .unwrap();

        assert_eq!(cancelled.status, contract::Status::Canceled);
        assert!(cancelled.cancelled_at.is_some());
        assert_eq!(
            cancelled.cancel_reason.as_ref().map(AsRef::as_ref),
            Some("Tenant withdrew the application"),
        );
        assert_eq!(cancelled.rejected_reason, None);

        let property = service
            .database()
            .execute(Select(By::<Option<Property>, _>::new(
                contract.property_id,
            )))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(property.status, property::Status::Available);
        assert_eq!(property.reservation, None, "hold must be cleared");
    }

    #[tokio::test]
    async fn cancels_active_contract_and_frees_occupied_property() {
        let (service, contract, admin_id) = service().await;

        service
            .execute(ActivateRentalContract {
                contract_id: contract.id,
                admin_id,
            })
            .await
            .unwrap();

        let cancelled = service
            .execute(cmd(contract.id, admin_id))
            .await
            .unwrap();
        assert_eq!(cancelled.status, contract::Status::Canceled);
        assert!(
            cancelled.activated_at.is_some(),
            "activation history must survive cancellation",
        );

        let property = service
            .database()
            .execute(Select(By::<Option<Property>, _>::new(
                contract.property_id,
            )))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(property.status, property::Status::Available);
    }

    #[tokio::test]
    async fn denies_non_admin_caller() {
        let (service, contract, _) = service().await;

        let err = service
            .execute(cmd(contract.id, contract.tenant_id))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::OnlyAdminCanCancelContract(..),
        ));
    }

    #[tokio::test]
    async fn rejects_unknown_contract() {
        let (service, _, admin_id) = service().await;
        let unknown = contract::Id::new();

        let err = service.execute(cmd(unknown, admin_id)).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::ContractNotFound(id) if *id == unknown,
        ));
    }

    #[tokio::test]
    async fn cannot_cancel_twice() {
        let (service, contract, admin_id) = service().await;

        service.execute(cmd(contract.id, admin_id)).await.unwrap();

        let err = service
            .execute(cmd(contract.id, admin_id))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvalidContractStatus {
                status: contract::Status::Canceled,
                ..
            },
        ));
    }

    #[tokio::test]
    async fn cannot_cancel_rejected_contract() {
        let (service, contract, admin_id) = service().await;

        service
            .execute(RejectRentalContract {
                contract_id: contract.id,
                admin_id,
                reason: "Income verification failed".parse().unwrap(),
            })
            .await
            .unwrap();

        let err = service
            .execute(cmd(contract.id, admin_id))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvalidContractStatus {
                status: contract::Status::Rejected,
                ..
            },
        ));
    }

    #[tokio::test]
    async fn cancelled_contract_cannot_be_activated() {
        let (service, contract, admin_id) = service().await;

        service.execute(cmd(contract.id, admin_id)).await.unwrap();

        let err = service
            .execute(ActivateRentalContract {
                contract_id: contract.id,
                admin_id,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ActivationError::InvalidContractStatus {
                status: contract::Status::Canceled,
                ..
            },
        ));

        let property = service
            .database()
            .execute(Select(By::<Option<Property>, _>::new(
                contract.property_id,
            )))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            property.status,
            property::Status::Available,
            "failed activation must leave the released property alone",
        );
    }

    #[tokio::test]
    async fn rolls_back_property_on_contract_write_failure() {
        let (service, contract, admin_id) = service().await;
        let db = service.database().clone();

        db.fail_contract_writes(true);
        let err = service
            .execute(cmd(contract.id, admin_id))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::Db(..)));
        db.fail_contract_writes(false);

        let property = db
            .execute(Select(By::<Option<Property>, _>::new(
                contract.property_id,
            )))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            property.status,
            property::Status::Reserved,
            "failed cancellation must keep the hold in place",
        );
        let stored = db
            .execute(Select(By::<Option<Contract>, _>::new(contract.id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, contract::Status::Pending);
    }
}
