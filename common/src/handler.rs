//! [`Handler`] abstractions.

use std::future::Future;

/// Asynchronous executor of typed arguments.
///
/// A single executor implements this trait once per arguments type, so the
/// set of operations it supports is spelled out in its trait bounds rather
/// than in a method list.
pub trait Handler<Args = ()> {
    /// Type of successful [`Handler`] result.
    type Ok;

    /// Type of this [`Handler`] error.
    type Err;

    /// Executes this [`Handler`] with the provided arguments.
    fn execute(
        &self,
        args: Args,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>>;
}
