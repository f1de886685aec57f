//! [`Command`] for creating a new rental [`Contract`].

use std::collections::HashMap;

use common::{
    operations::{
        By, Commit, Insert, Lock, Reserve, Select, Transact, Transacted,
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

/// [`Command`] for creating a new rental [`Contract`].
///
/// The created [`Contract`] is [`contract::Status::Pending`], with the
/// [`Property`] reserved until the rental period starts.
#[derive(Clone, Copy, Debug)]
pub struct CreateRentalContract {
    /// ID of the [`Property`] to rent out.
    pub property_id: property::Id,

    /// ID of the [`User`] renting the [`Property`].
    pub tenant_id: user::Id,

    /// ID of the administrator [`User`] creating the [`Contract`].
    pub admin_id: user::Id,

    /// [`DateTime`] when the rental period starts.
    pub starts_at: contract::StartDateTime,

    /// [`DateTime`] when the rental period ends.
    pub ends_at: contract::EndDateTime,
}

impl<Db> Command<CreateRentalContract> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<HashMap<user::Id, User>, [user::Id; 2]>>,
            Ok = HashMap<user::Id, User>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Property, property::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Reserve<By<Property, (property::Id, property::Reservation)>>,
            Ok = bool,
            Err = Traced<database::Error>,
        > + Database<Insert<Contract>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Contract;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateRentalContract,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateRentalContract {
            property_id,
            tenant_id,
            admin_id,
            starts_at,
            ends_at,
        } = cmd;

        let users = self
            .database()
            .execute(Select(By::new([admin_id, tenant_id])))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let admin = users
            .get(&admin_id)
            .filter(|u| u.is_admin())
            .ok_or(E::OnlyAdminCanCreateContract(admin_id))
            .map_err(tracerr::wrap!())?;

        if ends_at <= starts_at.coerce() {
            return Err(tracerr::new!(E::InvalidContractDates {
                starts_at,
                ends_at,
            }));
        }

        let tenant = users
            .get(&tenant_id)
            .ok_or(E::TenantNotFound(tenant_id))
            .map_err(tracerr::wrap!())?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent actions upon the same `Property`.
        tx.execute(Lock(By::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let now = DateTime::now();
        let reservation = property::Reservation {
            at: now.coerce(),
            until: starts_at.coerce(),
        };
        tx.execute(Reserve(By::<Property, _>::new((property_id, reservation))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .then_some(())
            .ok_or(E::PropertyNotAvailable(property_id))
            .map_err(tracerr::wrap!())?;

        let contract = Contract {
            id: contract::Id::new(),
            tenant_id: tenant.id,
            property_id,
            admin_id: admin.id,
            starts_at,
            ends_at,
            status: contract::Status::Pending,
            created_at: now.coerce(),
            activated_at: None,
            cancelled_at: None,
            rejected_at: None,
            expired_at: None,
            cancel_reason: None,
            rejected_reason: None,
        };
        tx.execute(Insert(contract.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(contract)
    }
}

/// Error of [`CreateRentalContract`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Rental period ends before it starts.
    #[display(
        "Rental period cannot end at `{ends_at}` before starting at \
         `{starts_at}`"
    )]
    InvalidContractDates {
        /// Requested start of the rental period.
        starts_at: contract::StartDateTime,

        /// Requested end of the rental period.
        ends_at: contract::EndDateTime,
    },

    /// [`User`] with the provided ID is not an administrator.
    #[display("`User(id: {_0})` is not allowed to create `Contract`s")]
    OnlyAdminCanCreateContract(#[error(not(source))] user::Id),

    /// [`Property`] with the provided ID cannot be reserved.
    #[display("`Property(id: {_0})` is not available for rent")]
    PropertyNotAvailable(#[error(not(source))] property::Id),

    /// Tenant [`User`] with the provided ID does not exist.
    #[display("Tenant `User(id: {_0})` does not exist")]
    TenantNotFound(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Insert, Select};

    use crate::{
        command,
        domain::{contract, property, user, Property, User},
        infra::InMemory,
        query, read, Command as _, Service,
    };

    use super::{CreateRentalContract, ExecutionError};

    /// Returns a [`Service`] with an administrator, a tenant and an
    /// available [`Property`] stored.
    async fn service(
    ) -> (Service<InMemory>, (user::Id, user::Id, property::Id)) {
        let db = InMemory::new();
        let admin = User::stored(user::Role::Admin);
        let tenant = User::stored(user::Role::User);
        let property = Property::stored();
        let ids = (admin.id, tenant.id, property.id);

        db.execute(Insert(admin)).await.unwrap();
        db.execute(Insert(tenant)).await.unwrap();
        db.execute(Insert(property)).await.unwrap();

        (Service::new(db), ids)
    }

    /// Returns a [`CreateRentalContract`] command with a valid rental period.
    fn cmd(
        property_id: property::Id,
        tenant_id: user::Id,
        admin_id: user::Id,
    ) -> CreateRentalContract {
        CreateRentalContract {
            property_id,
            tenant_id,
            admin_id,
            starts_at: "2030-01-01T12:00:00Z".parse().unwrap(),
            ends_at: "2030-06-01T12:00:00Z".parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn creates_pending_contract_and_reserves_property() {
        let (service, (admin_id, tenant_id, property_id)) = service().await;

        let contract = service
            .execute(cmd(property_id, tenant_id, admin_id))
            .await
            .unwrap();

        assert_eq!(contract.status, contract::Status::Pending);
        assert_eq!(contract.tenant_id, tenant_id);
        assert_eq!(contract.admin_id, admin_id);
        assert_eq!(contract.property_id, property_id);
        assert_eq!(contract.activated_at, None);
        assert_eq!(contract.cancel_reason, None);

        let property = service
            .database()
            .execute(Select(By::<Option<Property>, _>::new(property_id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(property.status, property::Status::Reserved);
        let reservation = property.reservation.unwrap();
        assert_eq!(
            reservation.until,
            contract.starts_at.coerce(),
            "hold must end when the rental period starts",
        );
        assert!(reservation.at <= common::DateTime::now().coerce());

        let stored = service
            .database()
            .execute(Select(By::<Option<contract::Contract>, _>::new(
                contract.id,
            )))
            .await
            .unwrap();
        assert!(stored.is_some(), "contract must be persisted");
    }

    #[tokio::test]
    async fn denies_non_admin_caller() {
        let (service, (_, tenant_id, property_id)) = service().await;

        let err = service
            .execute(cmd(property_id, tenant_id, tenant_id))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::OnlyAdminCanCreateContract(id) if *id == tenant_id,
        ));
    }

    #[tokio::test]
    async fn denies_unknown_caller() {
        let (service, (_, tenant_id, property_id)) = service().await;
        let unknown = user::Id::new();

        let err = service
            .execute(cmd(property_id, tenant_id, unknown))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::OnlyAdminCanCreateContract(id) if *id == unknown,
        ));
    }

    #[tokio::test]
    async fn rejects_period_ending_before_start() {
        let (service, (admin_id, tenant_id, property_id)) = service().await;

        let mut cmd = cmd(property_id, tenant_id, admin_id);
        cmd.starts_at = "2030-06-01T12:00:00Z".parse().unwrap();
        cmd.ends_at = "2030-01-01T12:00:00Z".parse().unwrap();

        let err = service.execute(cmd).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvalidContractDates { .. },
        ));
    }

    #[tokio::test]
    async fn rejects_empty_period() {
        let (service, (admin_id, tenant_id, property_id)) = service().await;

        let mut cmd = cmd(property_id, tenant_id, admin_id);
        cmd.starts_at = "2030-01-01T12:00:00Z".parse().unwrap();
        cmd.ends_at = "2030-01-01T12:00:00Z".parse().unwrap();

        let err = service.execute(cmd).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvalidContractDates { .. },
        ));
    }

    #[tokio::test]
    async fn rejects_unknown_tenant() {
        let (service, (admin_id, _, property_id)) = service().await;
        let unknown = user::Id::new();

        let err = service
            .execute(cmd(property_id, unknown, admin_id))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::TenantNotFound(id) if *id == unknown,
        ));
    }

    #[tokio::test]
    async fn rejects_missing_property() {
        let (service, (admin_id, tenant_id, _)) = service().await;
        let unknown = property::Id::new();

        let err = service
            .execute(cmd(unknown, tenant_id, admin_id))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::PropertyNotAvailable(id) if *id == unknown,
        ));
    }

    #[tokio::test]
    async fn rejects_already_reserved_property() {
        let (service, (admin_id, tenant_id, property_id)) = service().await;

        service
            .execute(cmd(property_id, tenant_id, admin_id))
            .await
            .unwrap();

        let err = service
            .execute(cmd(property_id, tenant_id, admin_id))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::PropertyNotAvailable(id) if *id == property_id,
        ));
    }

    #[tokio::test]
    async fn single_winner_on_concurrent_creates() {
        let (service, (admin_id, tenant_id, property_id)) = service().await;

        let (a, b) = tokio::join!(
            service.execute(cmd(property_id, tenant_id, admin_id)),
            service.execute(cmd(property_id, tenant_id, admin_id)),
        );

        let winners = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1, "exactly one create must win");
        let loser = if a.is_ok() { b } else { a };
        assert!(matches!(
            loser.unwrap_err().as_ref(),
            ExecutionError::PropertyNotAvailable(..),
        ));
    }

    #[tokio::test]
    async fn rolls_back_reservation_on_contract_write_failure() {
        let (service, (admin_id, tenant_id, property_id)) = service().await;
        let db = service.database().clone();

        db.fail_contract_writes(true);
        let err = service
            .execute(cmd(property_id, tenant_id, admin_id))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::Db(..)));
        db.fail_contract_writes(false);

        let property = db
            .execute(Select(By::<Option<Property>, _>::new(property_id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            property.status,
            property::Status::Available,
            "failed create must not leave the property reserved",
        );
        assert_eq!(property.reservation, None);

        // The property is usable again once writes recover.
        let contract = service
            .execute(cmd(property_id, tenant_id, admin_id))
            .await
            .unwrap();
        assert_eq!(contract.status, contract::Status::Pending);
    }

    #[tokio::test]
    async fn tenant_rents_property_once_contract_is_active() {
        let (service, (admin_id, tenant_id, property_id)) = service().await;

        let contract = service
            .execute(cmd(property_id, tenant_id, admin_id))
            .await
            .unwrap();
        let read::property::IsRentedBy(rented) = service
            .execute(query::property::IsRentedBy::by((tenant_id, property_id)))
            .await
            .unwrap();
        assert!(!rented, "pending contract is not an active rental yet");

        service
            .execute(command::ActivateRentalContract {
                contract_id: contract.id,
                admin_id,
            })
            .await
            .unwrap();

        let read::property::IsRentedBy(rented) = service
            .execute(query::property::IsRentedBy::by((tenant_id, property_id)))
            .await
            .unwrap();
        assert!(rented);
    }
}
