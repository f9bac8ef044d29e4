use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};
use std::sync::Arc;

use time::OffsetDateTime;

use crate::types::{GraphError, Result};

/// Serialized length of an [`Etag`].
pub const ETAG_LEN: usize = 16;

/// Version stamp attached to stored nodes and edges.
///
/// Equality compares both fields. Ordering is partial: `a > b`
/// holds only when `a.count > b.count` and `a.timestamp >= b.timestamp`
/// (mirrored for `<`). Any other pair of distinct etags is incomparable,
/// which callers read as "concurrent or unknown".
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Etag {
    count: i64,
    timestamp: i64,
}

impl Etag {
    /// Stamp carried by records that were never issued one.
    pub const EMPTY: Etag = Etag {
        count: 0,
        timestamp: 0,
    };

    /// Sentinel distinct from every issued stamp.
    pub const INVALID: Etag = Etag {
        count: i64::MIN,
        timestamp: i64::MIN,
    };

    /// Builds an etag from raw parts.
    pub const fn new(count: i64, timestamp: i64) -> Self {
        Self { count, timestamp }
    }

    /// Issues a fresh etag from the process-wide issuer.
    pub fn generate() -> Self {
        EtagIssuer::global().issue()
    }

    /// Issue counter component.
    pub fn count(&self) -> i64 {
        self.count
    }

    /// Timestamp component, in 100ns ticks since the Unix epoch.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Serializes as big-endian `timestamp ‖ count`.
    pub fn to_bytes(&self) -> [u8; ETAG_LEN] {
        let mut buf = [0u8; ETAG_LEN];
        buf[0..8].copy_from_slice(&self.timestamp.to_be_bytes());
        buf[8..16].copy_from_slice(&self.count.to_be_bytes());
        buf
    }

    /// Reads an etag from the first [`ETAG_LEN`] bytes of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < ETAG_LEN {
            return Err(GraphError::corrupt(format!(
                "etag needs {ETAG_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let mut ts = [0u8; 8];
        ts.copy_from_slice(&bytes[0..8]);
        let mut count = [0u8; 8];
        count.copy_from_slice(&bytes[8..16]);
        Ok(Self {
            count: i64::from_be_bytes(count),
            timestamp: i64::from_be_bytes(ts),
        })
    }
}

impl Default for Etag {
    fn default() -> Self {
        Etag::EMPTY
    }
}

impl PartialOrd for Etag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            Some(Ordering::Equal)
        } else if self.count > other.count && self.timestamp >= other.timestamp {
            Some(Ordering::Greater)
        } else if self.count < other.count && self.timestamp <= other.timestamp {
            Some(Ordering::Less)
        } else {
            None
        }
    }
}

impl fmt::Display for Etag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.timestamp, self.count)
    }
}

type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Issues monotonically increasing etags.
///
/// The counter starts at zero and is pre-incremented, so the first issued
/// count is 1. Timestamps never move backwards even if the clock does.
pub struct EtagIssuer {
    counter: AtomicI64,
    last_timestamp: AtomicI64,
    clock: Option<Clock>,
}

static GLOBAL_ISSUER: EtagIssuer = EtagIssuer::new();

impl EtagIssuer {
    /// Creates an issuer reading the UTC wall clock.
    pub const fn new() -> Self {
        Self {
            counter: AtomicI64::new(0),
            last_timestamp: AtomicI64::new(i64::MIN),
            clock: None,
        }
    }

    /// Creates an issuer driven by a caller-supplied tick source.
    pub fn with_clock(clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        Self {
            counter: AtomicI64::new(0),
            last_timestamp: AtomicI64::new(i64::MIN),
            clock: Some(Arc::new(clock)),
        }
    }

    /// The process-wide issuer used by [`Etag::generate`].
    pub fn global() -> &'static EtagIssuer {
        &GLOBAL_ISSUER
    }

    /// Issues the next etag.
    pub fn issue(&self) -> Etag {
        let count = self.counter.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        let now = match &self.clock {
            Some(clock) => clock(),
            None => utc_ticks(),
        };
        let previous = self.last_timestamp.fetch_max(now, AtomicOrdering::SeqCst);
        Etag::new(count, now.max(previous))
    }

    /// Number of etags issued so far.
    pub fn issued(&self) -> i64 {
        self.counter.load(AtomicOrdering::SeqCst)
    }
}

impl Default for EtagIssuer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EtagIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EtagIssuer")
            .field("issued", &self.issued())
            .field("custom_clock", &self.clock.is_some())
            .finish()
    }
}

fn utc_ticks() -> i64 {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos() / 100;
    i64::try_from(nanos).unwrap_or(i64::MAX)
}
