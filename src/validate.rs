//! Validator wrapper and the post-match validation pipeline.
//!
//! A validator may answer immediately or hand back a future. Either way it is
//! normalised into a [`ValidatorFuture`], and all of them are awaited together;
//! failures come back in declaration order no matter which settles first.

use crate::entity::{ArgState, Entity, Value};
use futures_util::future::{self, BoxFuture};
use futures_util::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, trace};

/// Copy of one argument's state handed to a validator.
///
/// Each validator receives its own copy, so nothing it does to the snapshot
/// reaches the caller's result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgSnapshot {
    pub signature: String,
    pub has_value: bool,
    pub is_set: bool,
    pub times_set: usize,
    pub value: Option<Value>,
}

impl ArgSnapshot {
    /// Every value carried by the argument, in occurrence order.
    pub fn values(&self) -> &[String] {
        self.value.as_ref().map(Value::as_slice).unwrap_or(&[])
    }

    /// The scalar value, if there is exactly one.
    pub fn as_str(&self) -> Option<&str> {
        self.value.as_ref().and_then(Value::as_str)
    }
}

/// Boxed asynchronous validator result.
pub type ValidatorFuture = BoxFuture<'static, Result<(), String>>;

/// What a validator returns.
pub enum Outcome {
    Ready(Result<(), String>),
    Pending(ValidatorFuture),
}

impl Outcome {
    pub fn ok() -> Self {
        Outcome::Ready(Ok(()))
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Outcome::Ready(Err(message.into()))
    }

    pub fn pending<F>(fut: F) -> Self
    where
        F: Future<Output = Result<(), String>> + Send + 'static,
    {
        Outcome::Pending(fut.boxed())
    }
}

impl From<Result<(), String>> for Outcome {
    fn from(result: Result<(), String>) -> Self {
        Outcome::Ready(result)
    }
}

impl From<()> for Outcome {
    fn from(_: ()) -> Self {
        Outcome::ok()
    }
}

/// A validator function.
pub type Validator = Arc<dyn Fn(ArgSnapshot) -> Outcome + Send + Sync>;

/// Wraps a closure as a [`Validator`].
pub fn validator<F, O>(f: F) -> Validator
where
    F: Fn(ArgSnapshot) -> O + Send + Sync + 'static,
    O: Into<Outcome>,
{
    Arc::new(move |snapshot| f(snapshot).into())
}

/// Capability shared by options and operands: a list of validators run
/// against a snapshot of the argument's state.
pub trait Validatable {
    fn validators(&self) -> &[Validator];

    fn snapshot(&self, state: &ArgState) -> ArgSnapshot;

    /// Runs every validator; resolves to the failure messages in validator order.
    fn validate(&self, state: &ArgState) -> BoxFuture<'static, Vec<String>> {
        let snapshot = self.snapshot(state);
        trace!(
            signature = %snapshot.signature,
            count = self.validators().len(),
            "dispatching validators"
        );
        let pending: Vec<ValidatorFuture> = self
            .validators()
            .iter()
            .map(|v| dispatch(v, snapshot.clone()))
            .collect();
        async move {
            future::join_all(pending)
                .await
                .into_iter()
                .filter_map(Result::err)
                .collect()
        }
        .boxed()
    }
}

fn dispatch(validator: &Validator, snapshot: ArgSnapshot) -> ValidatorFuture {
    match catch_unwind(AssertUnwindSafe(|| validator(snapshot))) {
        Ok(Outcome::Ready(result)) => future::ready(result).boxed(),
        Ok(Outcome::Pending(fut)) => AssertUnwindSafe(fut)
            .catch_unwind()
            .map(|settled| settled.unwrap_or_else(|payload| Err(panic_message(payload))))
            .boxed(),
        Err(payload) => future::ready(Err(panic_message(payload))).boxed(),
    }
}

/// Message carried by a panic payload.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unexpected panic".to_string()
    }
}

/// Validates every entity and flattens the failures into one ordered list.
pub(crate) async fn validate_all(entities: &[Entity], states: &[ArgState]) -> Vec<String> {
    let checks: Vec<_> = entities
        .iter()
        .zip(states)
        .filter_map(|(entity, state)| {
            let target = entity.as_validatable()?;
            (!target.validators().is_empty()).then(|| target.validate(state))
        })
        .collect();
    debug!(entities = checks.len(), "running validators");

    future::join_all(checks).await.into_iter().flatten().collect()
}
