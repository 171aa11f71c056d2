#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Serialising brokers for the host's single-concurrency native operations.
//!
//! The host can only run one ray cast and one unit spawn at a time, and it
//! reports completion through events rather than return values. The
//! [`AsyncOpBroker`] turns that surface into a FIFO queue of typed requests
//! with at most one request in flight. [`RayCaster`] and [`SpawnBroker`]
//! specialise it for the two native calls the control core relies on.

mod ray;
mod spawn;

use std::{
    collections::{BTreeMap, VecDeque},
    fmt,
    marker::PhantomData,
    task::Poll,
};

use horde_defense_core::RequestId;

pub use ray::{RayCastResult, RayCaster, RaySegment};
pub use spawn::{SpawnBroker, SpawnBrokerConfig, SpawnOutcome, SpawnRequest};

/// Handle to the eventual result of a brokered request.
pub struct Ticket<R> {
    token: RequestId,
    marker: PhantomData<fn() -> R>,
}

impl<R> Ticket<R> {
    const fn new(token: RequestId) -> Self {
        Self {
            token,
            marker: PhantomData,
        }
    }

    /// Correlation token attached to the native call backing this ticket.
    #[must_use]
    pub const fn token(&self) -> RequestId {
        self.token
    }
}

impl<R> Clone for Ticket<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for Ticket<R> {}

impl<R> PartialEq for Ticket<R> {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}

impl<R> Eq for Ticket<R> {}

impl<R> fmt::Debug for Ticket<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Ticket").field(&self.token).finish()
    }
}

#[derive(Debug)]
struct Entry<P> {
    token: RequestId,
    params: P,
    detached: bool,
}

/// FIFO broker that keeps at most one native operation in flight.
///
/// Requests are dispatched strictly in submission order. Dispatching happens
/// through a caller-supplied closure that receives the request's correlation
/// token and parameters and issues the native call, so the broker itself
/// never touches the host. A "missed" or otherwise negative outcome is a
/// regular result value; there is no error channel.
#[derive(Debug)]
pub struct AsyncOpBroker<P, R> {
    waiting: VecDeque<Entry<P>>,
    in_flight: Option<Entry<P>>,
    resolved: BTreeMap<RequestId, R>,
    next_token: u64,
}

impl<P, R> Default for AsyncOpBroker<P, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, R> AsyncOpBroker<P, R> {
    /// Creates an idle broker with an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            waiting: VecDeque::new(),
            in_flight: None,
            resolved: BTreeMap::new(),
            next_token: 0,
        }
    }

    /// Enqueues a request and dispatches it immediately when the broker is idle.
    pub fn submit<F>(&mut self, params: P, dispatch: F) -> Ticket<R>
    where
        F: FnOnce(RequestId, &P),
    {
        let token = self.enqueue(params, false);
        self.dispatch_next(dispatch);
        Ticket::new(token)
    }

    /// Enqueues a request whose result nobody will poll.
    ///
    /// The request occupies the queue like any other; its result is discarded
    /// on completion.
    pub fn submit_detached<F>(&mut self, params: P, dispatch: F) -> RequestId
    where
        F: FnOnce(RequestId, &P),
    {
        let token = self.enqueue(params, true);
        self.dispatch_next(dispatch);
        token
    }

    /// Resolves the in-flight request and dispatches the next queued one.
    ///
    /// Returns the token of the resolved request, or `None` when nothing was
    /// in flight and the completion was dropped.
    pub fn complete<F>(&mut self, result: R, dispatch: F) -> Option<RequestId>
    where
        F: FnOnce(RequestId, &P),
    {
        let Some(entry) = self.in_flight.take() else {
            log::trace!("dropping completion with no request in flight");
            return None;
        };

        if !entry.detached {
            let _ = self.resolved.insert(entry.token, result);
        }
        self.dispatch_next(dispatch);
        Some(entry.token)
    }

    /// Resolves the in-flight request when `token` matches it.
    ///
    /// A completion without a token is attributed to the in-flight request. A
    /// token naming any other request is a stale completion and is dropped.
    pub fn complete_for<F>(
        &mut self,
        token: Option<RequestId>,
        result: R,
        dispatch: F,
    ) -> Option<RequestId>
    where
        F: FnOnce(RequestId, &P),
    {
        if let Some(token) = token {
            if self.in_flight() != Some(token) {
                log::trace!("dropping stale completion for {token:?}");
                return None;
            }
        }
        self.complete(result, dispatch)
    }

    /// Hands `result` to the in-flight request's ticket without freeing the slot.
    ///
    /// The native operation stays in flight; its eventual completion is
    /// accepted as usual but the result it carries is discarded. Returns the
    /// settled token, or `None` when nothing is in flight or the request was
    /// already settled.
    pub fn settle_in_flight(&mut self, result: R) -> Option<RequestId> {
        let entry = self.in_flight.as_mut().filter(|entry| !entry.detached)?;
        entry.detached = true;
        let token = entry.token;
        let _ = self.resolved.insert(token, result);
        Some(token)
    }

    /// Takes the result of a resolved request; ready exactly once.
    pub fn poll(&mut self, ticket: &Ticket<R>) -> Poll<R> {
        self.resolved
            .remove(&ticket.token)
            .map_or(Poll::Pending, Poll::Ready)
    }

    /// Token of the request currently awaiting completion.
    #[must_use]
    pub fn in_flight(&self) -> Option<RequestId> {
        self.in_flight.as_ref().map(|entry| entry.token)
    }

    /// Parameters of the request currently awaiting completion.
    #[must_use]
    pub fn in_flight_params(&self) -> Option<&P> {
        self.in_flight.as_ref().map(|entry| &entry.params)
    }

    /// Number of requests queued behind the in-flight one.
    #[must_use]
    pub fn waiting_len(&self) -> usize {
        self.waiting.len()
    }

    /// Number of requests not yet completed, including the in-flight one.
    #[must_use]
    pub fn outstanding_len(&self) -> usize {
        self.waiting.len() + usize::from(self.in_flight.is_some())
    }

    /// Reports whether no request is in flight.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_none()
    }

    fn enqueue(&mut self, params: P, detached: bool) -> RequestId {
        let token = RequestId::new(self.next_token);
        self.next_token = self.next_token.wrapping_add(1);
        self.waiting.push_back(Entry {
            token,
            params,
            detached,
        });
        token
    }

    fn dispatch_next<F>(&mut self, dispatch: F)
    where
        F: FnOnce(RequestId, &P),
    {
        if self.in_flight.is_some() {
            return;
        }

        if let Some(entry) = self.waiting.pop_front() {
            log::trace!("dispatching request {:?}", entry.token);
            dispatch(entry.token, &entry.params);
            self.in_flight = Some(entry);
        }
    }
}
