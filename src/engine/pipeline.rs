//! Call composition primitives.
//!
//! Stages are built from two shapes only: a [`Pipeline`] (each call settles
//! before the next is issued, optionally spaced) and a [`JoinGroup`] (all calls
//! in flight together, every outcome collected). Neither cancels siblings.

use std::time::Duration;

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;

use super::outcome::StepName;
use crate::error_handling::{body_snippet, StepError};
use crate::transport::{HttpRequest, HttpResponse, Transport};

/// A pending call.
pub type StepFuture<'a> = BoxFuture<'a, Result<HttpResponse, StepError>>;

/// Settled calls, in the order they were added.
pub type Settled = Vec<(StepName, Result<HttpResponse, StepError>)>;

/// Sends one request; any non-2xx status becomes `StepError::Status`.
pub async fn send_checked(
    transport: &dyn Transport,
    request: HttpRequest,
) -> Result<HttpResponse, StepError> {
    let response = transport.send(request).await?;
    if response.is_success() {
        Ok(response)
    } else {
        Err(StepError::Status {
            status: response.status,
            snippet: body_snippet(&response.body),
        })
    }
}

/// Boxes a checked call so it can join a pipeline or group.
pub fn step<'a>(
    transport: &'a dyn Transport,
    request: HttpRequest,
) -> (StepName, StepFuture<'a>) {
    let name = request.step;
    (name, send_checked(transport, request).boxed())
}

/// Strictly sequential calls.
pub struct Pipeline<'a> {
    steps: Vec<(StepName, StepFuture<'a>)>,
    spacing: Option<Duration>,
}

impl<'a> Pipeline<'a> {
    /// `spacing` is slept between consecutive calls, never before the first.
    pub fn new(spacing: Option<Duration>) -> Self {
        Self {
            steps: Vec::new(),
            spacing,
        }
    }

    pub fn push(&mut self, (name, future): (StepName, StepFuture<'a>)) {
        self.steps.push((name, future));
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs every call to completion, one at a time.
    pub async fn run(self) -> Settled {
        let mut settled = Vec::with_capacity(self.steps.len());
        for (index, (name, future)) in self.steps.into_iter().enumerate() {
            if index > 0 {
                if let Some(spacing) = self.spacing.filter(|d| !d.is_zero()) {
                    tokio::time::sleep(spacing).await;
                }
            }
            settled.push((name, future.await));
        }
        settled
    }
}

/// Concurrent calls joined with "wait for all".
#[derive(Default)]
pub struct JoinGroup<'a> {
    members: Vec<(StepName, StepFuture<'a>)>,
}

impl<'a> JoinGroup<'a> {
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
        }
    }

    pub fn push(&mut self, (name, future): (StepName, StepFuture<'a>)) {
        self.members.push((name, future));
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Waits for every member; a failure never cancels the others.
    pub async fn settle(self) -> Settled {
        let (names, futures): (Vec<StepName>, Vec<StepFuture<'a>>) =
            self.members.into_iter().unzip();
        names.into_iter().zip(join_all(futures).await).collect()
    }
}
