use crate::types::{
    Amount,
    HistoryEntry,
};
use alloy::primitives::Address;
use std::sync::{
    Mutex,
    MutexGuard,
    PoisonError,
};
use tokio::sync::watch;
use tracing::debug;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    pub wallet_address: Option<Address>,
    pub connected: bool,
}

impl Session {
    pub fn connected(wallet_address: Address) -> Self {
        Self {
            wallet_address: Some(wallet_address),
            connected: true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum UiFeedback {
    #[default]
    None,
    Error(String),
    Success(String),
}

impl UiFeedback {
    pub fn error_message(&self) -> Option<&str> {
        match self {
            UiFeedback::Error(message) => Some(message),
            _ => None,
        }
    }

    pub fn success_message(&self) -> Option<&str> {
        match self {
            UiFeedback::Success(message) => Some(message),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LotterySnapshot {
    pub session: Session,
    pub lottery_id: Option<u64>,
    pub history: Vec<HistoryEntry>,
    pub pot: Option<Amount>,
    pub players: Vec<Address>,
    pub feedback: UiFeedback,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(u64);

pub struct StateStore {
    snapshots: watch::Sender<LotterySnapshot>,
    generation: Mutex<Generation>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        let (snapshots, _) = watch::channel(LotterySnapshot::default());
        Self {
            snapshots,
            generation: Mutex::new(Generation(0)),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<LotterySnapshot> {
        self.snapshots.subscribe()
    }

    pub fn snapshot(&self) -> LotterySnapshot {
        self.snapshots.borrow().clone()
    }

    pub(crate) fn begin_refresh(&self) -> Generation {
        self.advance()
    }

    /// Applies `update` only if `generation` is still the latest.
    pub(crate) fn commit(
        &self,
        generation: Generation,
        update: impl FnOnce(&mut LotterySnapshot),
    ) -> bool {
        let latest = self.lock_generation();
        if *latest != generation {
            debug!(
                stale = generation.0,
                latest = latest.0,
                "discarding stale refresh result"
            );
            return false;
        }
        self.snapshots.send_modify(update);
        true
    }

    pub(crate) fn replace_session(&self, session: Session) {
        let _ = self.advance();
        self.snapshots.send_modify(|snapshot| {
            *snapshot = LotterySnapshot {
                session,
                feedback: std::mem::take(&mut snapshot.feedback),
                ..LotterySnapshot::default()
            };
        });
    }

    pub(crate) fn clear_feedback(&self) {
        self.set_feedback(UiFeedback::None);
    }

    pub(crate) fn set_error(&self, message: impl Into<String>) {
        self.set_feedback(UiFeedback::Error(message.into()));
    }

    pub(crate) fn set_success(&self, message: impl Into<String>) {
        self.set_feedback(UiFeedback::Success(message.into()));
    }

    fn set_feedback(&self, feedback: UiFeedback) {
        self.snapshots.send_if_modified(|snapshot| {
            if snapshot.feedback == feedback {
                return false;
            }
            snapshot.feedback = feedback;
            true
        });
    }

    fn advance(&self) -> Generation {
        let mut generation = self.lock_generation();
        generation.0 += 1;
        *generation
    }

    fn lock_generation(&self) -> MutexGuard<'_, Generation> {
        self.generation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn commit__current_generation__applies_update() {
        // given
        let store = StateStore::new();
        let generation = store.begin_refresh();

        // when
        let applied = store.commit(generation, |s| s.lottery_id = Some(4));

        // then
        assert!(applied);
        assert_eq!(store.snapshot().lottery_id, Some(4));
    }

    #[test]
    fn commit__superseded_generation__is_discarded() {
        // given
        let store = StateStore::new();
        let stale = store.begin_refresh();
        let latest = store.begin_refresh();

        // when
        let stale_applied = store.commit(stale, |s| s.lottery_id = Some(1));
        let latest_applied = store.commit(latest, |s| s.lottery_id = Some(2));

        // then
        assert!(!stale_applied);
        assert!(latest_applied);
        assert_eq!(store.snapshot().lottery_id, Some(2));
    }

    #[test]
    fn replace_session__invalidates_running_refresh_and_resets_entities() {
        // given
        let store = StateStore::new();
        let generation = store.begin_refresh();
        store.commit(generation, |s| {
            s.lottery_id = Some(3);
            s.players = vec![Address::repeat_byte(1)];
        });
        let address = Address::repeat_byte(9);

        // when
        store.replace_session(Session::connected(address));
        let applied = store.commit(generation, |s| s.lottery_id = Some(7));

        // then
        assert!(!applied);
        let snapshot = store.snapshot();
        assert_eq!(snapshot.session, Session::connected(address));
        assert_eq!(snapshot.lottery_id, None);
        assert!(snapshot.players.is_empty());
    }

    #[test]
    fn feedback__error_then_success__are_exclusive() {
        // given
        let store = StateStore::new();

        // when
        store.set_error("boom");
        store.set_success("done");

        // then
        let feedback = store.snapshot().feedback;
        assert_eq!(feedback.success_message(), Some("done"));
        assert_eq!(feedback.error_message(), None);
    }

    #[tokio::test]
    async fn subscribe__observer__sees_committed_snapshot() {
        // given
        let store = StateStore::new();
        let mut observer = store.subscribe();
        let generation = store.begin_refresh();

        // when
        store.commit(generation, |s| s.lottery_id = Some(5));

        // then
        observer.changed().await.unwrap();
        assert_eq!(observer.borrow().lottery_id, Some(5));
    }
}
