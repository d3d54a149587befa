//! Capture slots for asynchronous, token-correlated replies.
//!
//! # Responsibility
//! - Hold one result slot per open capture token.
//! - Accept replies from arbitrary threads and merge them deterministically.
//!
//! # Invariants
//! - A token maps to at most one open slot.
//! - Reply order in a slot is by source rank (plugins in registration order,
//!   then default capture handlers in declaration order, then the default
//!   handler), never by arrival time.
//! - Every produced value is type-checked once, when it enters the slot.
//! - Dropping the owning `CaptureSlot` abandons the token; late replies are
//!   refused. In-flight plugin work is not cancelled.

use crate::contract::HandlerResult;
use crate::error::{CommandError, HandlerFailure, TypeContractError};
use crate::value::{Value, ValueType};
use log::{debug, warn};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Application-defined correlation id for one capture invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CaptureToken(String);

impl CaptureToken {
    /// Creates a random token.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CaptureToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for CaptureToken {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for CaptureToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CaptureToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Capture protocol errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    TokenInUse(CaptureToken),
    UnknownToken(CaptureToken),
    TokenMismatch {
        expected: CaptureToken,
        actual: Option<CaptureToken>,
    },
    UnexpectedSource {
        token: CaptureToken,
        plugin_id: String,
    },
    DuplicateReply {
        token: CaptureToken,
        plugin_id: String,
    },
    NotCaptureMode(String),
}

impl Display for CaptureError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TokenInUse(token) => write!(f, "capture token already open: {token}"),
            Self::UnknownToken(token) => {
                write!(f, "capture token is not open (abandoned or never opened): {token}")
            }
            Self::TokenMismatch { expected, actual } => match actual {
                Some(actual) => write!(
                    f,
                    "capture token mismatch: slot {expected}, invocation {actual}"
                ),
                None => write!(f, "capture token mismatch: slot {expected}, invocation unstamped"),
            },
            Self::UnexpectedSource { token, plugin_id } => write!(
                f,
                "plugin '{plugin_id}' was not part of capture {token}"
            ),
            Self::DuplicateReply { token, plugin_id } => write!(
                f,
                "plugin '{plugin_id}' already replied to capture {token}"
            ),
            Self::NotCaptureMode(name) => {
                write!(f, "invocation of '{name}' was not made in capture mode")
            }
        }
    }
}

impl Error for CaptureError {}

/// How [`CaptureBoard::deliver`] handled one reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Checked against the fan-out sources and stored in the slot.
    Recorded,
    /// Held until the fan-out attaches its sources. It may still be refused
    /// then; see [`CaptureSlot::dropped`].
    Buffered,
}

/// Producer of one captured reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplySource {
    Plugin(String),
    CaptureDefault(usize),
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplyOutcome {
    Value(Value),
    Declined,
    Failed(CommandError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureReply {
    pub source: ReplySource,
    pub outcome: ReplyOutcome,
}

struct SlotState {
    qualified_name: String,
    expected_type: ValueType,
    // Plugin ids in registration order; `None` until the fan-out attaches.
    sources: Option<Vec<String>>,
    replied: BTreeSet<String>,
    replies: BTreeMap<usize, CaptureReply>,
    early: Vec<(String, HandlerResult)>,
    dropped: Vec<CaptureError>,
}

impl SlotState {
    fn is_complete(&self) -> bool {
        match &self.sources {
            Some(sources) => sources.iter().all(|id| self.replied.contains(id)),
            None => false,
        }
    }

    fn classify(&self, source: &ReplySource, result: HandlerResult) -> ReplyOutcome {
        match result {
            Ok(Some(value)) if value.is_instance_of(self.expected_type) => {
                ReplyOutcome::Value(value)
            }
            Ok(Some(value)) => ReplyOutcome::Failed(CommandError::TypeContract(TypeContractError {
                qualified_name: self.qualified_name.clone(),
                produced: value.value_type(),
                expected: self.expected_type,
            })),
            Ok(None) => ReplyOutcome::Declined,
            Err(error) => ReplyOutcome::Failed(CommandError::Handler(HandlerFailure {
                qualified_name: self.qualified_name.clone(),
                plugin_id: match source {
                    ReplySource::Plugin(id) => Some(id.clone()),
                    ReplySource::CaptureDefault(_) | ReplySource::Default => None,
                },
                error,
            })),
        }
    }

    fn insert(&mut self, rank: usize, source: ReplySource, result: HandlerResult) {
        let outcome = self.classify(&source, result);
        self.replies.insert(rank, CaptureReply { source, outcome });
    }

    fn accept_plugin(
        &mut self,
        token: &CaptureToken,
        plugin_id: String,
        result: HandlerResult,
    ) -> Result<Delivery, CaptureError> {
        let Some(sources) = &self.sources else {
            self.early.push((plugin_id, result));
            return Ok(Delivery::Buffered);
        };
        let Some(rank) = sources.iter().position(|id| *id == plugin_id) else {
            return Err(CaptureError::UnexpectedSource {
                token: token.clone(),
                plugin_id,
            });
        };
        if !self.replied.insert(plugin_id.clone()) {
            return Err(CaptureError::DuplicateReply {
                token: token.clone(),
                plugin_id,
            });
        }
        self.insert(rank, ReplySource::Plugin(plugin_id), result);
        Ok(Delivery::Recorded)
    }

    fn accept_or_drop(
        &mut self,
        token: &CaptureToken,
        plugin_id: String,
        result: HandlerResult,
    ) {
        if let Err(err) = self.accept_plugin(token, plugin_id, result) {
            warn!(
                "event=capture_reply_dropped module=capture token={} reason={}",
                token, err
            );
            self.dropped.push(err);
        }
    }
}

struct BoardInner {
    slots: Mutex<HashMap<CaptureToken, SlotState>>,
    changed: Condvar,
}

/// Shared map of open capture slots. Cloning shares the same board.
#[derive(Clone)]
pub struct CaptureBoard {
    inner: Arc<BoardInner>,
}

impl Default for CaptureBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBoard {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BoardInner {
                slots: Mutex::new(HashMap::new()),
                changed: Condvar::new(),
            }),
        }
    }

    /// Reserves a slot for `token`. Replies may arrive as soon as this returns.
    pub fn open(
        &self,
        token: CaptureToken,
        qualified_name: impl Into<String>,
        expected_type: ValueType,
    ) -> Result<CaptureSlot, CaptureError> {
        let mut slots = self.inner.slots.lock();
        if slots.contains_key(&token) {
            return Err(CaptureError::TokenInUse(token));
        }
        let qualified_name = qualified_name.into();
        debug!(
            "event=capture_open module=capture qualified_name={} token={}",
            qualified_name, token
        );
        slots.insert(
            token.clone(),
            SlotState {
                qualified_name,
                expected_type,
                sources: None,
                replied: BTreeSet::new(),
                replies: BTreeMap::new(),
                early: Vec::new(),
                dropped: Vec::new(),
            },
        );
        Ok(CaptureSlot {
            token,
            inner: Arc::clone(&self.inner),
        })
    }

    /// Delivers one late plugin reply for `token`.
    ///
    /// A value that violates the entry's return type is accepted as a failed
    /// reply and surfaced by [`CaptureSlot::resolve`]. Replies arriving before
    /// the fan-out attaches return [`Delivery::Buffered`]; if the source check
    /// refuses them at attach time they are listed by [`CaptureSlot::dropped`].
    pub fn deliver(
        &self,
        token: &CaptureToken,
        plugin_id: impl Into<String>,
        result: HandlerResult,
    ) -> Result<Delivery, CaptureError> {
        let plugin_id = plugin_id.into();
        let mut slots = self.inner.slots.lock();
        let Some(state) = slots.get_mut(token) else {
            debug!(
                "event=capture_reply_refused module=capture token={} plugin_id={} reason=unknown_token",
                token, plugin_id
            );
            return Err(CaptureError::UnknownToken(token.clone()));
        };
        let delivery = state.accept_plugin(token, plugin_id, result)?;
        self.inner.changed.notify_all();
        Ok(delivery)
    }

    /// Returns true while a slot for `token` is open.
    pub fn is_open(&self, token: &CaptureToken) -> bool {
        self.inner.slots.lock().contains_key(token)
    }

    pub fn open_count(&self) -> usize {
        self.inner.slots.lock().len()
    }
}

/// Owner handle of one open capture.
pub struct CaptureSlot {
    token: CaptureToken,
    inner: Arc<BoardInner>,
}

impl CaptureSlot {
    pub fn token(&self) -> &CaptureToken {
        &self.token
    }

    /// Attaches fan-out sources and the replies produced synchronously.
    ///
    /// `immediate` holds the plugin outcomes in registration order; plugins
    /// that returned `Ok(None)` stay pending. `capture_defaults` and `default`
    /// are the capture and default handler outcomes in rank order. A refused
    /// plugin reply never stops the rest from being recorded.
    pub(crate) fn attach(
        &self,
        immediate: Vec<(String, HandlerResult)>,
        capture_defaults: Vec<HandlerResult>,
        default: Option<HandlerResult>,
    ) -> Result<(), CaptureError> {
        let mut slots = self.inner.slots.lock();
        let state = slots
            .get_mut(&self.token)
            .ok_or_else(|| CaptureError::UnknownToken(self.token.clone()))?;

        let sources = immediate.iter().map(|(id, _)| id.clone()).collect::<Vec<_>>();
        let plugin_count = sources.len();
        state.sources = Some(sources);

        for (plugin_id, result) in immediate {
            if matches!(result, Ok(None)) {
                continue;
            }
            state.accept_or_drop(&self.token, plugin_id, result);
        }
        for (plugin_id, result) in std::mem::take(&mut state.early) {
            state.accept_or_drop(&self.token, plugin_id, result);
        }

        let capture_count = capture_defaults.len();
        for (index, result) in capture_defaults.into_iter().enumerate() {
            state.insert(plugin_count + index, ReplySource::CaptureDefault(index), result);
        }
        if let Some(result) = default {
            state.insert(plugin_count + capture_count, ReplySource::Default, result);
        }

        self.inner.changed.notify_all();
        Ok(())
    }

    /// True once every fanned-out plugin has replied.
    pub fn is_complete(&self) -> bool {
        self.inner
            .slots
            .lock()
            .get(&self.token)
            .is_some_and(SlotState::is_complete)
    }

    /// Plugin ids that have not replied yet, in registration order.
    pub fn pending(&self) -> Vec<String> {
        let slots = self.inner.slots.lock();
        let Some(state) = slots.get(&self.token) else {
            return vec![];
        };
        state
            .sources
            .iter()
            .flatten()
            .filter(|id| !state.replied.contains(*id))
            .cloned()
            .collect()
    }

    /// Blocks until the slot is complete or `timeout` elapses.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut slots = self.inner.slots.lock();
        loop {
            if slots.get(&self.token).is_some_and(SlotState::is_complete) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.inner.changed.wait_for(&mut slots, deadline - now);
        }
    }

    /// Plugin replies refused after being accepted for later checking.
    pub fn dropped(&self) -> Vec<CaptureError> {
        self.inner
            .slots
            .lock()
            .get(&self.token)
            .map(|state| state.dropped.clone())
            .unwrap_or_default()
    }

    /// Replies received so far, in rank order.
    pub fn replies(&self) -> Vec<CaptureReply> {
        self.inner
            .slots
            .lock()
            .get(&self.token)
            .map(|state| state.replies.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Merges the replies received so far.
    ///
    /// The first failure in rank order is surfaced; otherwise the first value
    /// in rank order wins.
    pub fn resolve(&self) -> Result<Value, CommandError> {
        let slots = self.inner.slots.lock();
        let state = slots
            .get(&self.token)
            .ok_or_else(|| CaptureError::UnknownToken(self.token.clone()))?;

        let mut chosen = None;
        for reply in state.replies.values() {
            match &reply.outcome {
                ReplyOutcome::Failed(err) => return Err(err.clone()),
                ReplyOutcome::Value(value) if chosen.is_none() => chosen = Some(value.clone()),
                ReplyOutcome::Value(_) | ReplyOutcome::Declined => {}
            }
        }
        match chosen {
            Some(value) => Ok(value),
            None if state.expected_type == ValueType::Null => Ok(Value::Null),
            None => Err(CommandError::NoResult(state.qualified_name.clone())),
        }
    }

    /// Gives up on the token. Later deliveries are refused.
    pub fn abandon(self) {}
}

impl Drop for CaptureSlot {
    fn drop(&mut self) {
        if self.inner.slots.lock().remove(&self.token).is_some() {
            debug!(
                "event=capture_release module=capture token={}",
                self.token
            );
        }
        self.inner.changed.notify_all();
    }
}
