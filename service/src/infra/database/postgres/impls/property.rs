//! [`Property`]-related [`Database`] implementations.

use common::operations::{
    By, Delete, Insert, Lock, Occupy, Release, Reserve, Select,
};
use tracerr::Traced;

use crate::{
    domain::{contract, property, user, Property},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

impl<C> Database<Select<By<Option<Property>, property::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Property>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Property>, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: property::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, title, kind, status, address, \
                   reserved_at, reserved_until, \
                   created_at \
            FROM properties \
            WHERE id = $1::UUID \
            LIMIT 1";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| Property {
                id: row.get("id"),
                title: row.get("title"),
                kind: row.get("kind"),
                status: row.get("status"),
                address: row.get("address"),
                reservation: row
                    .get::<_, Option<property::ReservationDateTime>>(
                        "reserved_at",
                    )
                    .zip(row.get::<_, Option<property::ReservationDeadline>>(
                        "reserved_until",
                    ))
                    .map(|(at, until)| property::Reservation { at, until }),
                created_at: row.get("created_at"),
            }))
    }
}

impl<C> Database<Insert<Property>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(property): Insert<Property>,
    ) -> Result<Self::Ok, Self::Err> {
        let Property {
            id,
            title,
            kind,
            status,
            address,
            reservation,
            created_at,
        } = property;

        let reserved_at = reservation.map(|r| r.at);
        let reserved_until = reservation.map(|r| r.until);

        const SQL: &str = "\
            INSERT INTO properties (\
                id, title, kind, status, address, \
                reserved_at, reserved_until, \
                created_at\
            ) VALUES (\
                $1::UUID, $2::VARCHAR, $3::INT2, $4::INT2, $5::VARCHAR, \
                $6::TIMESTAMPTZ, $7::TIMESTAMPTZ, \
                $8::TIMESTAMPTZ\
            )";
        self.exec(
            SQL,
            &[
                &id,
                &title,
                &kind,
                &status,
                &address,
                &reserved_at,
                &reserved_until,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Delete<By<Property, property::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Property, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: property::Id = by.into_inner();

        const SQL: &str = "\
            DELETE FROM properties \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Lock<By<Property, property::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Property, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: property::Id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO properties_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO NOTHING";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Reserve<By<Property, (property::Id, property::Reservation)>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Reserve(by): Reserve<
            By<Property, (property::Id, property::Reservation)>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let (id, reservation) = by.into_inner();

        const SQL: &str = "\
            UPDATE properties \
            SET status = $2::INT2, \
                reserved_at = $3::TIMESTAMPTZ, \
                reserved_until = $4::TIMESTAMPTZ \
            WHERE id = $1::UUID \
              AND status = $5::INT2";
        self.exec(
            SQL,
            &[
                &id,
                &property::Status::Reserved,
                &reservation.at,
                &reservation.until,
                &property::Status::Available,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(|affected| affected > 0)
    }
}

impl<C> Database<Occupy<By<Property, property::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Occupy(by): Occupy<By<Property, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: property::Id = by.into_inner();

        const SQL: &str = "\
            UPDATE properties \
            SET status = $2::INT2, \
                reserved_at = NULL, \
                reserved_until = NULL \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id, &property::Status::Occupied])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Release<By<Property, property::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Release(by): Release<By<Property, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: property::Id = by.into_inner();

        const SQL: &str = "\
            UPDATE properties \
            SET status = $2::INT2, \
                reserved_at = NULL, \
                reserved_until = NULL \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id, &property::Status::Available])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Select<By<read::property::IsRented, property::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::property::IsRented;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::property::IsRented, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let property_id: property::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM contracts \
            WHERE property_id = $1::UUID \
              AND status = $2::INT2 \
            LIMIT 1";
        self.query_opt(SQL, &[&property_id, &contract::Status::Active])
            .await
            .map_err(tracerr::wrap!())
            .map(|r| read::property::IsRented(r.is_some()))
    }
}

impl<C>
    Database<Select<By<read::property::IsRentedBy, (user::Id, property::Id)>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::property::IsRentedBy;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::property::IsRentedBy, (user::Id, property::Id)>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let (tenant_id, property_id) = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM contracts \
            WHERE tenant_id = $1::UUID \
              AND property_id = $2::UUID \
              AND status = $3::INT2 \
            LIMIT 1";
        self.query_opt(
            SQL,
            &[&tenant_id, &property_id, &contract::Status::Active],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(|r| read::property::IsRentedBy(r.is_some()))
    }
}
