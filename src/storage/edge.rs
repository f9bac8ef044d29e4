use std::fmt;

use bytes::Bytes;

use crate::types::{EdgeType, NodeKey, Result};

use super::etag::Etag;
use super::keys;
use super::record;

/// Composite identity of a directed edge.
///
/// Field order matches the encoded key, so the derived ordering agrees with
/// the byte order of [`EdgeKey::encode`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct EdgeKey {
    pub from: NodeKey,
    pub to: NodeKey,
    pub ty: EdgeType,
}

impl EdgeKey {
    pub const fn new(from: NodeKey, to: NodeKey, ty: EdgeType) -> Self {
        Self { from, to, ty }
    }

    pub fn encode(&self) -> [u8; keys::EDGE_KEY_LEN] {
        keys::encode_edge_key(self.from, self.to, self.ty)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (from, to, ty) = keys::decode_edge_key(bytes)?;
        Ok(Self { from, to, ty })
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-[{}]->{}", self.from, self.ty, self.to)
    }
}

/// A directed, typed, weighted edge with an opaque payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edge {
    pub key: EdgeKey,
    pub weight: i64,
    pub payload: Bytes,
    pub etag: Etag,
}

impl Edge {
    pub fn new(key: EdgeKey, weight: i64, payload: impl Into<Bytes>) -> Self {
        Self {
            key,
            weight,
            payload: payload.into(),
            etag: Etag::EMPTY,
        }
    }

    pub fn with_etag(mut self, etag: Etag) -> Self {
        self.etag = etag;
        self
    }

    pub(crate) fn from_record(key: EdgeKey, value: &[u8]) -> Result<Self> {
        let (etag, weight, payload) = record::decode_edge_value(value)?;
        Ok(Self {
            key,
            weight,
            payload,
            etag,
        })
    }

    pub(crate) fn to_record(&self) -> Vec<u8> {
        record::encode_edge_value(self.etag, self.weight, &self.payload)
    }
}
