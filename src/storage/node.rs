use bytes::Bytes;

use crate::types::{NodeKey, Result};

use super::etag::Etag;
use super::keys;
use super::record;

/// A node as read from (or about to be written to) the node tree.
///
/// The payload is an owned buffer detached from store pages; the graph layer
/// never interprets it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub key: NodeKey,
    pub payload: Bytes,
    pub etag: Etag,
}

impl Node {
    pub fn new(key: NodeKey, payload: impl Into<Bytes>) -> Self {
        Self {
            key,
            payload: payload.into(),
            etag: Etag::EMPTY,
        }
    }

    pub fn with_etag(mut self, etag: Etag) -> Self {
        self.etag = etag;
        self
    }

    pub(crate) fn encoded_key(&self) -> [u8; keys::NODE_KEY_LEN] {
        keys::encode_node_key(self.key)
    }

    pub(crate) fn from_record(key: NodeKey, value: &[u8]) -> Result<Self> {
        let (etag, payload) = record::decode_node_value(value)?;
        Ok(Self { key, payload, etag })
    }

    pub(crate) fn to_record(&self) -> Vec<u8> {
        record::encode_node_value(self.etag, &self.payload)
    }
}
