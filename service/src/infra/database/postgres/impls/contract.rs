//! [`Contract`]-related [`Database`] implementations.

use common::operations::{Activate, By, Cancel, Insert, Reject, Select};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{contract, Contract},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

/// Columns of the `contracts` table, in the order [`from_row`] reads them.
const COLUMNS: &str = "\
    id, tenant_id, property_id, admin_id, \
    starts_at, ends_at, \
    status, \
    created_at, activated_at, cancelled_at, rejected_at, expired_at, \
    cancel_reason, rejected_reason";

/// Reconstructs a [`Contract`] from the provided `contracts` table [`Row`].
fn from_row(row: &Row) -> Contract {
    Contract {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        property_id: row.get("property_id"),
        admin_id: row.get("admin_id"),
        starts_at: row.get("starts_at"),
        ends_at: row.get("ends_at"),
        status: row.get("status"),
        created_at: row.get("created_at"),
        activated_at: row.get("activated_at"),
        cancelled_at: row.get("cancelled_at"),
        rejected_at: row.get("rejected_at"),
        expired_at: row.get("expired_at"),
        cancel_reason: row.get("cancel_reason"),
        rejected_reason: row.get("rejected_reason"),
    }
}

impl<C> Database<Select<By<Option<Contract>, contract::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Contract>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Contract>, contract::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: contract::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM contracts \
             WHERE id = $1::UUID \
             LIMIT 1",
        );
        Ok(self
            .query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| from_row(&row)))
    }
}

impl<C> Database<Insert<Contract>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(contract): Insert<Contract>,
    ) -> Result<Self::Ok, Self::Err> {
        let Contract {
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

        const SQL: &str = "\
            INSERT INTO contracts (\
                id, tenant_id, property_id, admin_id, \
                starts_at, ends_at, \
                status, \
                created_at, activated_at, cancelled_at, rejected_at, \
                expired_at, \
                cancel_reason, rejected_reason\
            ) VALUES (\
                $1::UUID, $2::UUID, $3::UUID, $4::UUID, \
                $5::TIMESTAMPTZ, $6::TIMESTAMPTZ, \
                $7::INT2, \
                $8::TIMESTAMPTZ, $9::TIMESTAMPTZ, $10::TIMESTAMPTZ, \
                $11::TIMESTAMPTZ, $12::TIMESTAMPTZ, \
                $13::VARCHAR, $14::VARCHAR\
            )";
        self.exec(
            SQL,
            &[
                &id,
                &tenant_id,
                &property_id,
                &admin_id,
                &starts_at,
                &ends_at,
                &status,
                &created_at,
                &activated_at,
                &cancelled_at,
                &rejected_at,
                &expired_at,
                &cancel_reason,
                &rejected_reason,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C>
    Database<
        Activate<By<Contract, (contract::Id, contract::ActivationDateTime)>>,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Contract>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Activate(by): Activate<
            By<Contract, (contract::Id, contract::ActivationDateTime)>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let (id, activated_at) = by.into_inner();

        let sql = format!(
            "UPDATE contracts \
             SET status = $2::INT2, \
                 activated_at = $3::TIMESTAMPTZ \
             WHERE id = $1::UUID \
               AND status = $4::INT2 \
             RETURNING {COLUMNS}",
        );
        Ok(self
            .query_opt(
                &sql,
                &[
                    &id,
                    &contract::Status::Active,
                    &activated_at,
                    &contract::Status::Pending,
                ],
            )
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| from_row(&row)))
    }
}

impl<C>
    Database<
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
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Contract>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Cancel(by): Cancel<
            By<
                Contract,
                (
                    contract::Id,
                    contract::CancellationDateTime,
                    contract::Reason,
                ),
            >,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let (id, cancelled_at, reason) = by.into_inner();

        let sql = format!(
            "UPDATE contracts \
             SET status = $2::INT2, \
                 cancelled_at = $3::TIMESTAMPTZ, \
                 cancel_reason = $4::VARCHAR \
             WHERE id = $1::UUID \
               AND status IN ($5::INT2, $6::INT2) \
             RETURNING {COLUMNS}",
        );
        Ok(self
            .query_opt(
                &sql,
                &[
                    &id,
                    &contract::Status::Canceled,
                    &cancelled_at,
                    &reason,
                    &contract::Status::Pending,
                    &contract::Status::Active,
                ],
            )
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| from_row(&row)))
    }
}

impl<C>
    Database<
        Reject<
            By<
                Contract,
                (contract::Id, contract::RejectionDateTime, contract::Reason),
            >,
        >,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Contract>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Reject(by): Reject<
            By<
                Contract,
                (contract::Id, contract::RejectionDateTime, contract::Reason),
            >,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let (id, rejected_at, reason) = by.into_inner();

        let sql = format!(
            "UPDATE contracts \
             SET status = $2::INT2, \
                 rejected_at = $3::TIMESTAMPTZ, \
                 rejected_reason = $4::VARCHAR \
             WHERE id = $1::UUID \
               AND status = $5::INT2 \
             RETURNING {COLUMNS}",
        );
        Ok(self
            .query_opt(
                &sql,
                &[
                    &id,
                    &contract::Status::Rejected,
                    &rejected_at,
                    &reason,
                    &contract::Status::Pending,
                ],
            )
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| from_row(&row)))
    }
}
