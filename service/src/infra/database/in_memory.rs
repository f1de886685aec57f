//! In-memory [`Database`] implementation.
//!
//! Keeps everything in process memory, so commands stay executable without a
//! running Postgres. Backs the command test suites.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use common::operations::{
    Activate, By, Cancel, Commit, Delete, Insert, Lock, Occupy, Reject,
    Release, Reserve, Select, Transact,
};
use derive_more::{Display, Error as StdError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracerr::Traced;

use crate::{
    domain::{contract, property, user, Contract, Property, User},
    infra::{database, Database},
    read,
};

/// In-memory [`Database`].
#[derive(Clone, Debug, Default)]
pub struct InMemory {
    /// Committed [`State`] shared between clones of this [`Database`].
    state: Arc<Mutex<State>>,

    /// Indicator whether [`Contract`] writes should fail.
    contract_write_failure: Arc<AtomicBool>,
}

impl InMemory {
    /// Creates a new empty [`InMemory`] database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggles failing of [`Contract`] writes.
    ///
    /// While enabled, every operation writing a [`Contract`] fails with
    /// [`Error::InjectedContractWriteFailure`], allowing to exercise
    /// transaction rollback.
    pub fn fail_contract_writes(&self, fail: bool) {
        self.contract_write_failure.store(fail, Ordering::SeqCst);
    }
}

/// Data stored by an [`InMemory`] database.
#[derive(Clone, Debug, Default)]
struct State {
    /// Stored [`User`]s.
    users: HashMap<user::Id, User>,

    /// Stored [`Property`]s.
    properties: HashMap<property::Id, Property>,

    /// Stored [`Contract`]s.
    contracts: HashMap<contract::Id, Contract>,
}

/// In-memory database [`Error`].
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Failure injected via [`InMemory::fail_contract_writes`].
    #[display("Injected `Contract` write failure")]
    InjectedContractWriteFailure,
}

/// Transactional handle to an [`InMemory`] database.
///
/// Holds an exclusive guard over the committed [`State`], so only one
/// [`Transaction`] is in flight at a time. Operations apply to a scratch copy
/// of the [`State`], replacing the committed one on [`Commit`]. Dropping the
/// [`Transaction`] without committing discards the scratch copy.
#[derive(Clone, Debug)]
pub struct Transaction {
    /// Inner representation of this [`Transaction`].
    inner: Arc<Inner>,
}

/// Inner representation of a [`Transaction`].
#[derive(Debug)]
struct Inner {
    /// Exclusive guard over the committed [`State`].
    committed: Mutex<OwnedMutexGuard<State>>,

    /// Scratch copy of the [`State`] the operations apply to.
    scratch: Mutex<State>,

    /// Indicator whether [`Contract`] writes should fail.
    contract_write_failure: Arc<AtomicBool>,
}

impl Inner {
    /// Indicates whether [`Contract`] writes should fail at the moment.
    fn contract_writes_fail(&self) -> bool {
        self.contract_write_failure.load(Ordering::SeqCst)
    }
}

impl Database<Transact> for InMemory {
    type Ok = Transaction;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        let committed = Arc::clone(&self.state).lock_owned().await;
        let scratch = (*committed).clone();
        Ok(Transaction {
            inner: Arc::new(Inner {
                committed: Mutex::new(committed),
                scratch: Mutex::new(scratch),
                contract_write_failure: Arc::clone(
                    &self.contract_write_failure,
                ),
            }),
        })
    }
}

impl Database<Transact> for Transaction {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Transaction {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        let scratch = self.inner.scratch.lock().await;
        let mut committed = self.inner.committed.lock().await;
        **committed = scratch.clone();
        Ok(())
    }
}

impl<IDs> Database<Select<By<HashMap<user::Id, User>, IDs>>> for InMemory
where
    IDs: AsRef<[user::Id]>,
{
    type Ok = HashMap<user::Id, User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<user::Id, User>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        let state = self.state.lock().await;
        Ok(ids
            .as_ref()
            .iter()
            .filter_map(|id| state.users.get(id).map(|u| (*id, u.clone())))
            .collect())
    }
}

impl Database<Select<By<Option<User>, user::Id>>> for InMemory {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self.state.lock().await.users.get(&id).cloned())
    }
}

impl Database<Insert<User>> for InMemory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<User>,
    ) -> Result<Self::Ok, Self::Err> {
        drop(self.state.lock().await.users.insert(user.id, user));
        Ok(())
    }
}

impl Database<Select<By<Option<Property>, property::Id>>> for InMemory {
    type Ok = Option<Property>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Property>, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self.state.lock().await.properties.get(&id).cloned())
    }
}

impl Database<Insert<Property>> for InMemory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(property): Insert<Property>,
    ) -> Result<Self::Ok, Self::Err> {
        drop(
            self.state
                .lock()
                .await
                .properties
                .insert(property.id, property),
        );
        Ok(())
    }
}

impl Database<Delete<By<Property, property::Id>>> for InMemory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Property, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        drop(self.state.lock().await.properties.remove(&id));
        Ok(())
    }
}

impl Database<Select<By<Option<Contract>, contract::Id>>> for InMemory {
    type Ok = Option<Contract>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Contract>, contract::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self.state.lock().await.contracts.get(&id).cloned())
    }
}

impl Database<Select<By<read::property::IsRented, property::Id>>>
    for InMemory
{
    type Ok = read::property::IsRented;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::property::IsRented, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let property_id = by.into_inner();
        let state = self.state.lock().await;
        Ok(read::property::IsRented(state.contracts.values().any(|c| {
            c.property_id == property_id
                && c.status == contract::Status::Active
        })))
    }
}

impl Database<Select<By<read::property::IsRentedBy, (user::Id, property::Id)>>>
    for InMemory
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
        let state = self.state.lock().await;
        Ok(read::property::IsRentedBy(state.contracts.values().any(
            |c| {
                c.tenant_id == tenant_id
                    && c.property_id == property_id
                    && c.status == contract::Status::Active
            },
        )))
    }
}

impl Database<Lock<By<Property, property::Id>>> for Transaction {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(_): Lock<By<Property, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // The exclusive `committed` guard already serializes transactions.
        Ok(())
    }
}

impl Database<Reserve<By<Property, (property::Id, property::Reservation)>>>
    for Transaction
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
        let mut state = self.inner.scratch.lock().await;
        let Some(property) = state.properties.get_mut(&id) else {
            return Ok(false);
        };
        if property.status != property::Status::Available {
            return Ok(false);
        }
        property.status = property::Status::Reserved;
        property.reservation = Some(reservation);
        Ok(true)
    }
}

impl Database<Occupy<By<Property, property::Id>>> for Transaction {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Occupy(by): Occupy<By<Property, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        let mut state = self.inner.scratch.lock().await;
        if let Some(property) = state.properties.get_mut(&id) {
            property.status = property::Status::Occupied;
            property.reservation = None;
        }
        Ok(())
    }
}

impl Database<Release<By<Property, property::Id>>> for Transaction {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Release(by): Release<By<Property, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        let mut state = self.inner.scratch.lock().await;
        if let Some(property) = state.properties.get_mut(&id) {
            property.status = property::Status::Available;
            property.reservation = None;
        }
        Ok(())
    }
}

impl Database<Insert<Contract>> for Transaction {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(contract): Insert<Contract>,
    ) -> Result<Self::Ok, Self::Err> {
        if self.inner.contract_writes_fail() {
            return Err(tracerr::new!(Error::InjectedContractWriteFailure))
                .map_err(tracerr::map_from);
        }
        drop(
            self.inner
                .scratch
                .lock()
                .await
                .contracts
                .insert(contract.id, contract),
        );
        Ok(())
    }
}

impl
    Database<
        Activate<By<Contract, (contract::Id, contract::ActivationDateTime)>>,
    > for Transaction
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
        if self.inner.contract_writes_fail() {
            return Err(tracerr::new!(Error::InjectedContractWriteFailure))
                .map_err(tracerr::map_from);
        }
        let mut state = self.inner.scratch.lock().await;
        Ok(state.contracts.get_mut(&id).and_then(|c| {
            (c.status == contract::Status::Pending).then(|| {
                c.status = contract::Status::Active;
                c.activated_at = Some(activated_at);
                c.clone()
            })
        }))
    }
}

impl
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
    > for Transaction
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
        if self.inner.contract_writes_fail() {
            return Err(tracerr::new!(Error::InjectedContractWriteFailure))
                .map_err(tracerr::map_from);
        }
        let mut state = self.inner.scratch.lock().await;
        Ok(state.contracts.get_mut(&id).and_then(|c| {
            c.status.is_cancellable().then(|| {
                c.status = contract::Status::Canceled;
                c.cancelled_at = Some(cancelled_at);
                c.cancel_reason = Some(reason);
                c.clone()
            })
        }))
    }
}

impl
    Database<
        Reject<
            By<
                Contract,
                (contract::Id, contract::RejectionDateTime, contract::Reason),
            >,
        >,
    > for Transaction
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
        if self.inner.contract_writes_fail() {
            return Err(tracerr::new!(Error::InjectedContractWriteFailure))
                .map_err(tracerr::map_from);
        }
        let mut state = self.inner.scratch.lock().await;
        Ok(state.contracts.get_mut(&id).and_then(|c| {
            (c.status == contract::Status::Pending).then(|| {
                c.status = contract::Status::Rejected;
                c.rejected_at = Some(rejected_at);
                c.rejected_reason = Some(reason);
                c.clone()
            })
        }))
    }
}
