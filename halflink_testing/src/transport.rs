//! Scripted transport and dialer.

use std::{
    collections::VecDeque,
    io,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use halflink::{
    config::LinkParams,
    transport::{Dialer, ReadSignal, Transport},
};

/// One element of a scripted reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// Deliver these bytes, one per read.
    Bytes(Bytes),
    /// Sleep before the next read completes.
    Delay(Duration),
    /// Report a read timeout.
    Timeout,
    /// Report a read error.
    Error(io::ErrorKind),
}

/// The link's answer to one request.
///
/// Once every step has been consumed the link is silent and further reads
/// time out.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reply {
    steps: Vec<Step>,
}

impl Reply {
    /// An empty reply: the request is met with silence.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// A reply consisting of `bytes`.
    #[must_use]
    pub fn frame(bytes: impl Into<Bytes>) -> Self { Self::new().bytes(bytes) }

    /// Append bytes.
    #[must_use]
    pub fn bytes(mut self, bytes: impl Into<Bytes>) -> Self {
        self.steps.push(Step::Bytes(bytes.into()));
        self
    }

    /// Append a pause.
    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.steps.push(Step::Delay(delay));
        self
    }

    /// Append a read timeout.
    #[must_use]
    pub fn timeout(mut self) -> Self {
        self.steps.push(Step::Timeout);
        self
    }

    /// Append a read error.
    #[must_use]
    pub fn error(mut self, kind: io::ErrorKind) -> Self {
        self.steps.push(Step::Error(kind));
        self
    }
}

/// Everything the scripted links observed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Entries {
    /// Parameters of every dial, including refused ones.
    pub dials: Vec<LinkParams>,
    /// Mode strings passed to `open`.
    pub opens: Vec<String>,
    /// Requests written, without the trailing carriage return.
    pub writes: Vec<String>,
    /// Number of `close` calls.
    pub closes: usize,
}

/// Shared record of link activity.
#[derive(Clone, Debug, Default)]
pub struct Journal(Arc<Mutex<Entries>>);

impl Journal {
    /// Create an empty journal.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Copy of everything recorded so far.
    #[must_use]
    pub fn snapshot(&self) -> Entries { self.lock().clone() }

    /// Requests written so far.
    #[must_use]
    pub fn writes(&self) -> Vec<String> { self.lock().writes.clone() }

    fn record(&self, update: impl FnOnce(&mut Entries)) { update(&mut *self.lock()); }

    fn lock(&self) -> std::sync::MutexGuard<'_, Entries> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A transport that plays back scripted replies.
#[derive(Debug)]
pub struct ScriptedTransport {
    greeting: Reply,
    replies: VecDeque<Reply>,
    pending: VecDeque<Step>,
    accept_open: bool,
    writes_left: Option<usize>,
    journal: Journal,
}

impl ScriptedTransport {
    /// A link that greets with `\r\n\n\n` and has no replies yet.
    #[must_use]
    pub fn new(journal: &Journal) -> Self {
        Self {
            greeting: Reply::frame(&b"ITHAKI test link\r\n\n\n"[..]),
            replies: VecDeque::new(),
            pending: VecDeque::new(),
            accept_open: true,
            writes_left: None,
            journal: journal.clone(),
        }
    }

    /// Replace the greeting sent after `open`.
    #[must_use]
    pub fn greeting(mut self, greeting: Reply) -> Self {
        self.greeting = greeting;
        self
    }

    /// Queue the answer to the next unanswered request.
    #[must_use]
    pub fn reply(mut self, reply: Reply) -> Self {
        self.replies.push_back(reply);
        self
    }

    /// Queue several answers.
    #[must_use]
    pub fn replies(mut self, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.replies.extend(replies);
        self
    }

    /// Refuse to enter data mode.
    #[must_use]
    pub fn reject_open(mut self) -> Self {
        self.accept_open = false;
        self
    }

    /// Accept `count` writes, then report send failures.
    #[must_use]
    pub fn fail_writes_after(mut self, count: usize) -> Self {
        self.writes_left = Some(count);
        self
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(&mut self, mode: &str) -> bool {
        self.journal.record(|entries| entries.opens.push(mode.to_owned()));
        if self.accept_open {
            self.pending = self.greeting.steps.iter().cloned().collect();
        }
        self.accept_open
    }

    async fn write(&mut self, bytes: &[u8]) -> bool {
        if let Some(left) = self.writes_left.as_mut() {
            if *left == 0 {
                return false;
            }
            *left -= 1;
        }
        let request = String::from_utf8_lossy(bytes).trim_end_matches('\r').to_owned();
        self.journal.record(|entries| entries.writes.push(request));
        self.pending = self
            .replies
            .pop_front()
            .map(|reply| reply.steps.into_iter().collect())
            .unwrap_or_default();
        true
    }

    async fn read_byte(&mut self) -> ReadSignal {
        loop {
            match self.pending.pop_front() {
                None | Some(Step::Timeout) => return ReadSignal::Timeout,
                Some(Step::Error(kind)) => return ReadSignal::Error(io::Error::from(kind)),
                Some(Step::Delay(delay)) => tokio::time::sleep(delay).await,
                Some(Step::Bytes(bytes)) => {
                    let Some(&byte) = bytes.first() else {
                        continue;
                    };
                    if bytes.len() > 1 {
                        self.pending.push_front(Step::Bytes(bytes.slice(1..)));
                    }
                    return ReadSignal::Byte(byte);
                }
            }
        }
    }

    async fn close(&mut self) {
        self.pending.clear();
        self.journal.record(|entries| entries.closes += 1);
    }
}

/// Hands out scripted transports in order.
///
/// Dials beyond the scripted links, or onto a [`refuse`](Self::refuse)
/// slot, fail with `ConnectionRefused`.
#[derive(Debug)]
pub struct ScriptedDialer {
    links: Mutex<VecDeque<Option<ScriptedTransport>>>,
    journal: Journal,
}

impl ScriptedDialer {
    /// A dialer with no links.
    #[must_use]
    pub fn new(journal: &Journal) -> Self {
        Self {
            links: Mutex::new(VecDeque::new()),
            journal: journal.clone(),
        }
    }

    /// Queue a link for the next dial.
    #[must_use]
    pub fn link(self, link: ScriptedTransport) -> Self {
        self.push(Some(link));
        self
    }

    /// Queue a refused dial.
    #[must_use]
    pub fn refuse(self) -> Self {
        self.push(None);
        self
    }

    fn push(&self, slot: Option<ScriptedTransport>) {
        self.links
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(slot);
    }
}

#[async_trait]
impl Dialer for ScriptedDialer {
    type Transport = ScriptedTransport;

    async fn dial(&self, params: &LinkParams) -> io::Result<ScriptedTransport> {
        self.journal.record(|entries| entries.dials.push(*params));
        let slot = self
            .links
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .flatten();
        slot.ok_or_else(|| io::Error::new(io::ErrorKind::ConnectionRefused, "no scripted link"))
    }
}
