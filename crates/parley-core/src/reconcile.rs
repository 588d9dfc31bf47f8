//! OptimisticReconciler: client-side speculative updates.
//!
//! Each request follows the same protocol:
//!
//! 1. snapshot the displayed state for its key,
//! 2. replace it with a local projection,
//! 3. send the mutation through a transport,
//! 4. on success show the server's answer,
//! 5. on failure restore the snapshot and surface the error.
//!
//! A newer request for the same key supersedes an older one. The older
//! request's response, whenever it arrives, is discarded and reported as
//! [`Settled::Superseded`]. The cache lock is never held across an `.await`.

use std::{collections::HashMap, future::Future, hash::Hash};

use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::{
  reply::Reply,
  subject::SubjectRef,
  vote::{VoteSummary, VoteValue},
};

// ─── Cache ───────────────────────────────────────────────────────────────────

/// What became of a request once its response arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled<T> {
  /// The server's answer is now the displayed state.
  Confirmed(T),
  /// A newer request for the same key was issued; this response was ignored.
  Superseded,
}

struct Slot<T> {
  shown:      T,
  generation: u64,
}

/// A request that has been projected locally but not yet settled.
#[derive(Debug, Clone)]
pub struct Ticket<K, T> {
  key:           K,
  generation:    u64,
  snapshot:      T,
  /// The state displayed while the request is in flight.
  pub projected: T,
}

/// Displayed state per key, plus the bookkeeping for supersession.
pub struct OptimisticCache<K, T> {
  slots: Mutex<HashMap<K, Slot<T>>>,
}

impl<K, T> Default for OptimisticCache<K, T> {
  fn default() -> Self { Self { slots: Mutex::new(HashMap::new()) } }
}

impl<K, T> OptimisticCache<K, T>
where
  K: Eq + Hash + Clone,
  T: Clone,
{
  pub fn new() -> Self { Self::default() }

  /// The state currently displayed for `key`.
  pub fn shown(&self, key: &K) -> Option<T> {
    self.slots.lock().get(key).map(|slot| slot.shown.clone())
  }

  /// Record server state for a key that has none yet.
  pub fn seed(&self, key: K, value: T) {
    self
      .slots
      .lock()
      .entry(key)
      .or_insert(Slot { shown: value, generation: 0 });
  }

  /// Drop a key, e.g. when its subject leaves the screen. Any in-flight
  /// request for it will settle as superseded.
  pub fn forget(&self, key: &K) { self.slots.lock().remove(key); }

  /// Steps 1–2: snapshot and project. Returns `None` if `key` was never
  /// seeded.
  pub fn begin(
    &self,
    key: K,
    project: impl FnOnce(&T) -> T,
  ) -> Option<Ticket<K, T>> {
    let mut slots = self.slots.lock();
    let slot = slots.get_mut(&key)?;
    let snapshot = slot.shown.clone();
    let projected = project(&snapshot);
    slot.shown = projected.clone();
    slot.generation += 1;
    Some(Ticket { key, generation: slot.generation, snapshot, projected })
  }

  /// Steps 4–5: apply the response unless the ticket was superseded.
  pub fn settle<E>(
    &self,
    ticket: Ticket<K, T>,
    response: Result<T, E>,
  ) -> Result<Settled<T>, E> {
    let mut slots = self.slots.lock();
    let current = match slots.get_mut(&ticket.key) {
      Some(slot) if slot.generation == ticket.generation => slot,
      _ => return Ok(Settled::Superseded),
    };
    match response {
      Ok(confirmed) => {
        current.shown = confirmed.clone();
        Ok(Settled::Confirmed(confirmed))
      }
      Err(e) => {
        current.shown = ticket.snapshot;
        Err(e)
      }
    }
  }
}

// ─── Votes ───────────────────────────────────────────────────────────────────

/// The ledger as seen from the client.
pub trait VoteTransport: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn fetch_vote(
    &self,
    subject: SubjectRef,
  ) -> impl Future<Output = Result<VoteSummary, Self::Error>> + Send + '_;

  fn cast_vote(
    &self,
    subject: SubjectRef,
    requested: VoteValue,
  ) -> impl Future<Output = Result<VoteSummary, Self::Error>> + Send + '_;
}

pub struct VoteReconciler<T> {
  transport: T,
  cache:     OptimisticCache<SubjectRef, VoteSummary>,
}

/// A vote that is displayed but not yet sent.
#[derive(Debug, Clone)]
pub struct PendingVote {
  subject:   SubjectRef,
  requested: VoteValue,
  ticket:    Ticket<SubjectRef, VoteSummary>,
}

impl PendingVote {
  pub fn projected(&self) -> VoteSummary { self.ticket.projected }
}

impl<T: VoteTransport> VoteReconciler<T> {
  pub fn new(transport: T) -> Self {
    Self { transport, cache: OptimisticCache::new() }
  }

  pub fn transport(&self) -> &T { &self.transport }

  pub fn shown(&self, subject: SubjectRef) -> Option<VoteSummary> {
    self.cache.shown(&subject)
  }

  pub fn seed(&self, subject: SubjectRef, summary: VoteSummary) {
    self.cache.seed(subject, summary);
  }

  /// Snapshot and project locally. Fetches the server state first if this
  /// subject has never been seen.
  pub async fn prepare(
    &self,
    subject: SubjectRef,
    requested: VoteValue,
  ) -> Result<PendingVote, T::Error> {
    loop {
      if let Some(ticket) =
        self.cache.begin(subject, |current| current.project(requested))
      {
        return Ok(PendingVote { subject, requested, ticket });
      }
      let summary = self.transport.fetch_vote(subject).await?;
      self.cache.seed(subject, summary);
    }
  }

  /// Send a prepared vote and reconcile with the response.
  pub async fn commit(
    &self,
    pending: PendingVote,
  ) -> Result<Settled<VoteSummary>, T::Error> {
    let response = self
      .transport
      .cast_vote(pending.subject, pending.requested)
      .await;
    let settled = self.cache.settle(pending.ticket, response);
    if matches!(settled, Ok(Settled::Superseded)) {
      debug!(subject = %pending.subject, "discarded superseded vote response");
    }
    settled
  }

  pub async fn cast(
    &self,
    subject: SubjectRef,
    requested: VoteValue,
  ) -> Result<Settled<VoteSummary>, T::Error> {
    let pending = self.prepare(subject, requested).await?;
    self.commit(pending).await
  }
}

// ─── Reply edits ─────────────────────────────────────────────────────────────

pub trait EditTransport: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn fetch_reply(
    &self,
    reply_id: Uuid,
  ) -> impl Future<Output = Result<Reply, Self::Error>> + Send + '_;

  fn edit_reply(
    &self,
    reply_id: Uuid,
    content: String,
  ) -> impl Future<Output = Result<Reply, Self::Error>> + Send + '_;
}

pub struct EditReconciler<T> {
  transport: T,
  cache:     OptimisticCache<Uuid, Reply>,
}

#[derive(Debug, Clone)]
pub struct PendingEdit {
  content: String,
  ticket:  Ticket<Uuid, Reply>,
}

impl PendingEdit {
  pub fn projected(&self) -> &Reply { &self.ticket.projected }
}

impl<T: EditTransport> EditReconciler<T> {
  pub fn new(transport: T) -> Self {
    Self { transport, cache: OptimisticCache::new() }
  }

  pub fn shown(&self, reply_id: Uuid) -> Option<Reply> {
    self.cache.shown(&reply_id)
  }

  pub async fn prepare(
    &self,
    reply_id: Uuid,
    content: String,
  ) -> Result<PendingEdit, T::Error> {
    loop {
      let projected_content = content.clone();
      if let Some(ticket) = self.cache.begin(reply_id, move |current| Reply {
        content: projected_content,
        ..current.clone()
      }) {
        return Ok(PendingEdit { content, ticket });
      }
      let reply = self.transport.fetch_reply(reply_id).await?;
      self.cache.seed(reply_id, reply);
    }
  }

  pub async fn commit(
    &self,
    pending: PendingEdit,
  ) -> Result<Settled<Reply>, T::Error> {
    let reply_id = pending.ticket.key;
    let response = self.transport.edit_reply(reply_id, pending.content).await;
    self.cache.settle(pending.ticket, response)
  }

  pub async fn edit(
    &self,
    reply_id: Uuid,
    content: String,
  ) -> Result<Settled<Reply>, T::Error> {
    let pending = self.prepare(reply_id, content).await?;
    self.commit(pending).await
  }
}
