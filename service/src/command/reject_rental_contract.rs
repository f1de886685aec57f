//! [`Command`] for rejecting a pending rental [`Contract`].

use common::{
    operations::{
        By, Commit, Lock, Reject, Release, Select, Transact, Transacted,
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

/// [`Command`] for rejecting a [`contract::Status::Pending`] [`Contract`].
///
/// Releases the reserved [`Property`] back to
/// [`property::Status::Available`] and marks the [`Contract`] as
/// [`contract::Status::Rejected`], which is terminal.
#[derive(Clone, Debug)]
pub struct RejectRentalContract {
    /// ID of the [`Contract`] to reject.
    pub contract_id: contract::Id,

    /// ID of the administrator [`User`] rejecting the [`Contract`].
    pub admin_id: user::Id,

    /// [`contract::Reason`] of the rejection.
    pub reason: contract::Reason,
}

impl<Db> Command<RejectRentalContract> for Service<Db>
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
            Reject<
                By<
                    Contract,
                    (
                        contract::Id,
                        contract::RejectionDateTime,
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
        cmd: RejectRentalContract,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RejectRentalContract {
            contract_id,
            admin_id,
            reason,
        } = cmd;

        self.database()
            .execute(Select(By::<Option<User>, _>::new(admin_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(User::is_admin)
            .ok_or(E::OnlyAdminCanRejectContract(admin_id))
            .map_err(tracerr::wrap!())
            .map(drop)?;

        let contract = self
            .database()
            .execute(Select(By::<Option<Contract>, _>::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ContractNotFound(contract_id))
            .map_err(tracerr::wrap!())?;
        if contract.status != contract::Status::Pending {
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
            .execute(Reject(By::<Contract, _>::new((
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

/// Error of [`RejectRentalContract`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`User`] with the provided ID is not an administrator.
    #[display("`User(id: {_0})` is not allowed to reject `Contract`s")]
    OnlyAdminCanRejectContract(#[error(not(source))] user::Id),

    /// [`Contract`] with the provided ID does not exist.
    #[display("`Contract(id: {_0})` does not exist")]
    ContractNotFound(#[error(not(source))] contract::Id),

    /// [`Contract`] status does not allow rejection.
    #[display(
        "`Contract(id: {id})` cannot be rejected from status `{status}`"
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
        command::{ActivateRentalContract, CreateRentalContract},
        domain::{contract, property, user, Contract, Property, User},
        infra::InMemory,
        Command as _, Service,
    };

    use super::{ExecutionError, RejectRentalContract};

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

    /// Returns a [`RejectRentalContract`] command with a plausible reason.
    fn cmd(
        contract_id: contract::Id,
        admin_id: user::Id,
    ) -> RejectRentalContract {
        RejectRentalContract {
            contract_id,
            admin_id,
            reason: "Income verification failed".parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn rejects_contract_and_releases_property() {
        let (service, contract, admin_id) = service().await;

        let rejected = service
            .execute(cmd(contract.id, admin_id))
            .await
            .unwrap();

        assert_eq!(rejected.status, contract::Status::Rejected);
        assert!(rejected.rejected_at.is_some());
        assert_eq!(
            rejected.rejected_reason.as_ref().map(AsRef::as_ref),
            Some("Income verification failed"),
        );
        assert_eq!(rejected.activated_at, None);
        assert_eq!(rejected.cancel_reason, None);

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
    async fn denies_non_admin_caller() {
        let (service, contract, _) = service().await;

        let err = service
            .execute(cmd(contract.id, contract.tenant_id))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::OnlyAdminCanRejectContract(..),
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
    async fn cannot_reject_active_contract() {
        let (service, contract, admin_id) = service().await;

        service
            .execute(ActivateRentalContract {
                contract_id: contract.id,
                admin_id,
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
                status: contract::Status::Active,
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
            property::Status::Occupied,
            "failed rejection must not release the property",
        );
    }

    #[tokio::test]
    async fn cannot_reject_twice() {
        let (service, contract, admin_id) = service().await;

        service.execute(cmd(contract.id, admin_id)).await.unwrap();

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
    async fn property_is_rentable_again_after_rejection() {
        let (service, contract, admin_id) = service().await;

        service.execute(cmd(contract.id, admin_id)).await.unwrap();

        let replacement = service
            .execute(CreateRentalContract {
                property_id: contract.property_id,
                tenant_id: contract.tenant_id,
                admin_id,
                starts_at: "2031-01-01T12:00:00Z".parse().unwrap(),
                ends_at: "2031-06-01T12:00:00Z".parse().unwrap(),
            })
            .await
            .unwrap();
        assert_eq!(replacement.status, contract::Status::Pending);
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
            "failed rejection must keep the hold in place",
        );
        let stored = db
            .execute(Select(By::<Option<Contract>, _>::new(contract.id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, contract::Status::Pending);
    }
}
