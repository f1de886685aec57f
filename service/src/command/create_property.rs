//! [`Command`] for registering a new [`Property`].

use common::{
    operations::{By, Insert, Select},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{property, user, Property, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for registering a new [`Property`] available for rent.
#[derive(Clone, Debug)]
pub struct CreateProperty {
    /// [`property::Title`] of the new [`Property`].
    pub title: property::Title,

    /// [`property::Kind`] of the new [`Property`].
    pub kind: property::Kind,

    /// [`property::Address`] of the new [`Property`].
    pub address: property::Address,

    /// ID of the administrator [`User`] registering the [`Property`].
    pub admin_id: user::Id,
}

impl<Db> Command<CreateProperty> for Service<Db>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Insert<Property>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Property;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateProperty) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateProperty {
            title,
            kind,
            address,
            admin_id,
        } = cmd;

        self.database()
            .execute(Select(By::<Option<User>, _>::new(admin_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(User::is_admin)
            .ok_or(E::OnlyAdminCanCreateProperty(admin_id))
            .map_err(tracerr::wrap!())
            .map(drop)?;

        let property = Property {
            id: property::Id::new(),
            title,
            kind,
            status: property::Status::Available,
            address,
            reservation: None,
            created_at: DateTime::now().coerce(),
        };
        self.database()
            .execute(Insert(property.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(property)
    }
}

/// Error of [`CreateProperty`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`User`] with the provided ID is not an administrator.
    #[display("`User(id: {_0})` is not allowed to create `Property`s")]
    OnlyAdminCanCreateProperty(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Insert, Select};

    use crate::{
        domain::{property, user, Property, User},
        infra::InMemory,
        Command as _, Service,
    };

    use super::{CreateProperty, ExecutionError};

    /// Returns a [`Service`] with an administrator and a regular user stored.
    async fn service() -> (Service<InMemory>, user::Id, user::Id) {
        let db = InMemory::new();
        let admin = User::stored(user::Role::Admin);
        let user = User::stored(user::Role::User);
        let (admin_id, user_id) = (admin.id, user.id);

        db.execute(Insert(admin)).await.unwrap();
        db.execute(Insert(user)).await.unwrap();

        (Service::new(db), admin_id, user_id)
    }

    /// Returns a [`CreateProperty`] command describing a small studio.
    fn cmd(admin_id: user::Id) -> CreateProperty {
        CreateProperty {
            title: "Compact studio near the station".parse().unwrap(),
            kind: property::Kind::Studio,
            address: "12 Market Lane".parse().unwrap(),
            admin_id,
        }
    }

    #[tokio::test]
    async fn creates_available_property() {
        let (service, admin_id, _) = service().await;

        let property = service.execute(cmd(admin_id)).await.unwrap();

        assert_eq!(property.status, property::Status::Available);
        assert_eq!(property.kind, property::Kind::Studio);
        assert_eq!(property.reservation, None);
        assert!(property.is_available());

        let stored = service
            .database()
            .execute(Select(By::<Option<Property>, _>::new(property.id)))
            .await
            .unwrap();
        assert!(stored.is_some(), "property must be persisted");
    }

    #[tokio::test]
    async fn denies_non_admin_caller() {
        let (service, _, user_id) = service().await;

        let err = service.execute(cmd(user_id)).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::OnlyAdminCanCreateProperty(id) if *id == user_id,
        ));
    }

    #[tokio::test]
    async fn denies_unknown_caller() {
        let (service, _, _) = service().await;
        let unknown = user::Id::new();

        let err = service.execute(cmd(unknown)).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::OnlyAdminCanCreateProperty(id) if *id == unknown,
        ));
    }
}
