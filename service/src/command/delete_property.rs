//! [`Command`] for deleting a [`Property`].

use common::operations::{By, Delete, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{property, user, Property, User},
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for deleting a [`Property`] from the agency's portfolio.
#[derive(Clone, Copy, Debug)]
pub struct DeleteProperty {
    /// ID of the [`Property`] to delete.
    pub property_id: property::Id,

    /// ID of the administrator [`User`] deleting the [`Property`].
    pub admin_id: user::Id,
}

impl<Db> Command<DeleteProperty> for Service<Db>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Property>, property::Id>>,
            Ok = Option<Property>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<read::property::IsRented, property::Id>>,
            Ok = read::property::IsRented,
            Err = Traced<database::Error>,
        > + Database<
            Delete<By<Property, property::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        >,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: DeleteProperty) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteProperty {
            property_id,
            admin_id,
        } = cmd;

        self.database()
            .execute(Select(By::<Option<User>, _>::new(admin_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(User::is_admin)
            .ok_or(E::OnlyAdminCanDeleteProperty(admin_id))
            .map_err(tracerr::wrap!())
            .map(drop)?;

        let property = self
            .database()
            .execute(Select(By::<Option<Property>, _>::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::PropertyNotFound(property_id))
            .map_err(tracerr::wrap!())?;

        let is_rented = self
            .database()
            .execute(Select(By::<read::property::IsRented, _>::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if *is_rented {
            return Err(tracerr::new!(E::PropertyHasActiveContract(
                property_id
            )));
        }
        match property.status {
            property::Status::Occupied => {
                return Err(tracerr::new!(E::PropertyIsOccupied(property_id)));
            }
            property::Status::Reserved => {
                return Err(tracerr::new!(E::PropertyIsReserved(property_id)));
            }
            property::Status::Available => {}
        }

        self.database()
            .execute(Delete(By::<Property, _>::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// Error of [`DeleteProperty`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`User`] with the provided ID is not an administrator.
    #[display("`User(id: {_0})` is not allowed to delete `Property`s")]
    OnlyAdminCanDeleteProperty(#[error(not(source))] user::Id),

    /// [`Property`] is referenced by an active [`Contract`].
    ///
    /// [`Contract`]: crate::domain::Contract
    #[display("`Property(id: {_0})` is rented out under an active contract")]
    PropertyHasActiveContract(#[error(not(source))] property::Id),

    /// [`Property`] is occupied by a tenant.
    #[display("`Property(id: {_0})` is occupied")]
    PropertyIsOccupied(#[error(not(source))] property::Id),

    /// [`Property`] is held by a reservation.
    #[display("`Property(id: {_0})` is reserved")]
    PropertyIsReserved(#[error(not(source))] property::Id),

    /// [`Property`] doesn't exist.
    #[display("`Property(id: {_0})` doesn't exist")]
    PropertyNotFound(#[error(not(source))] property::Id),
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Insert, Select};

    use crate::{
        command::{
            ActivateRentalContract, CancelRentalContract, CreateRentalContract,
        },
        domain::{property, user, Property, User},
        infra::InMemory,
        Command as _, Service,
    };

    use super::{DeleteProperty, ExecutionError};

    /// Returns a [`Service`] with an administrator, a tenant and an available
    /// [`Property`] stored.
    async fn service() -> (Service<InMemory>, (user::Id, user::Id, property::Id))
    {
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

    /// Reserves the [`Property`] by creating a pending rental contract for it.
    async fn reserve(
        service: &Service<InMemory>,
        admin_id: user::Id,
        tenant_id: user::Id,
        property_id: property::Id,
    ) -> crate::domain::Contract {
        service
            .execute(CreateRentalContract {
                property_id,
                tenant_id,
                admin_id,
                starts_at: "2030-01-01T12:00:00Z".parse().unwrap(),
                ends_at: "2030-07-01T12:00:00Z".parse().unwrap(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn deletes_available_property() {
        let (service, (admin_id, _, property_id)) = service().await;

        service
            .execute(DeleteProperty {
                property_id,
                admin_id,
            })
            .await
            .unwrap();

        let stored = service
            .database()
            .execute(Select(By::<Option<Property>, _>::new(property_id)))
            .await
            .unwrap();
        assert!(stored.is_none(), "property must be gone");
    }

    #[tokio::test]
    async fn denies_non_admin_caller() {
        let (service, (_, tenant_id, property_id)) = service().await;

        let err = service
            .execute(DeleteProperty {
                property_id,
                admin_id: tenant_id,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::OnlyAdminCanDeleteProperty(id) if *id == tenant_id,
        ));
    }

    #[tokio::test]
    async fn rejects_unknown_property() {
        let (service, (admin_id, _, _)) = service().await;
        let unknown = property::Id::new();

        let err = service
            .execute(DeleteProperty {
                property_id: unknown,
                admin_id,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::PropertyNotFound(id) if *id == unknown,
        ));
    }

    #[tokio::test]
    async fn rejects_reserved_property() {
        let (service, (admin_id, tenant_id, property_id)) = service().await;
        let _ = reserve(&service, admin_id, tenant_id, property_id).await;

        let err = service
            .execute(DeleteProperty {
                property_id,
                admin_id,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::PropertyIsReserved(id) if *id == property_id,
        ));
    }

    #[tokio::test]
    async fn rejects_property_under_active_contract() {
        let (service, (admin_id, tenant_id, property_id)) = service().await;
        let contract =
            reserve(&service, admin_id, tenant_id, property_id).await;
        service
            .execute(ActivateRentalContract {
                contract_id: contract.id,
                admin_id,
            })
            .await
            .unwrap();

        let err = service
            .execute(DeleteProperty {
                property_id,
                admin_id,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::PropertyHasActiveContract(id) if *id == property_id,
        ));
    }

    #[tokio::test]
    async fn deletes_property_once_its_contract_is_cancelled() {
        let (service, (admin_id, tenant_id, property_id)) = service().await;
        let contract =
            reserve(&service, admin_id, tenant_id, property_id).await;
        service
            .execute(CancelRentalContract {
                contract_id: contract.id,
                admin_id,
                reason: "Tenant withdrew the application".parse().unwrap(),
            })
            .await
            .unwrap();

        service
            .execute(DeleteProperty {
                property_id,
                admin_id,
            })
            .await
            .unwrap();

        let stored = service
            .database()
            .execute(Select(By::<Option<Property>, _>::new(property_id)))
            .await
            .unwrap();
        assert!(stored.is_none(), "property must be gone");
    }
}
