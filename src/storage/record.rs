//! Stored value layout for node and edge records.
//!
//! Node values are `etag ‖ payload`; edge values are `etag ‖ weight ‖ payload`
//! with the weight stored as a big-endian `i64`.

use bytes::Bytes;

use crate::types::{GraphError, Result};

use super::etag::{Etag, ETAG_LEN};

const WEIGHT_LEN: usize = 8;

/// Length of the fixed header in front of an edge payload.
pub const EDGE_HEADER_LEN: usize = ETAG_LEN + WEIGHT_LEN;

pub fn encode_node_value(etag: Etag, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(ETAG_LEN + payload.len());
    buf.extend_from_slice(&etag.to_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Splits a node value into its etag and an owned copy of the payload.
pub fn decode_node_value(data: &[u8]) -> Result<(Etag, Bytes)> {
    if data.len() < ETAG_LEN {
        return Err(GraphError::corrupt("node record truncated before etag end"));
    }
    let etag = Etag::from_bytes(&data[..ETAG_LEN])?;
    Ok((etag, Bytes::copy_from_slice(&data[ETAG_LEN..])))
}

pub fn encode_edge_value(etag: Etag, weight: i64, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(EDGE_HEADER_LEN + payload.len());
    buf.extend_from_slice(&etag.to_bytes());
    buf.extend_from_slice(&weight.to_be_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Splits an edge value into etag, weight and an owned copy of the payload.
pub fn decode_edge_value(data: &[u8]) -> Result<(Etag, i64, Bytes)> {
    if data.len() < EDGE_HEADER_LEN {
        return Err(GraphError::corrupt(format!(
            "edge record needs {EDGE_HEADER_LEN} header bytes, got {}",
            data.len()
        )));
    }
    let etag = Etag::from_bytes(&data[..ETAG_LEN])?;
    let mut weight = [0u8; WEIGHT_LEN];
    weight.copy_from_slice(&data[ETAG_LEN..EDGE_HEADER_LEN]);
    Ok((
        etag,
        i64::from_be_bytes(weight),
        Bytes::copy_from_slice(&data[EDGE_HEADER_LEN..]),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_value_keeps_payload_after_etag() -> Result<()> {
        let etag = Etag::new(3, 4);
        let encoded = encode_node_value(etag, b"payload");
        assert_eq!(encoded.len(), ETAG_LEN + 7);
        let (decoded_etag, payload) = decode_node_value(&encoded)?;
        assert_eq!(decoded_etag, etag);
        assert_eq!(&payload[..], b"payload");
        Ok(())
    }

    #[test]
    fn empty_payload_is_valid() -> Result<()> {
        let (_, payload) = decode_node_value(&Etag::EMPTY.to_bytes())?;
        assert!(payload.is_empty());
        Ok(())
    }

    #[test]
    fn edge_value_carries_weight() -> Result<()> {
        let encoded = encode_edge_value(Etag::new(1, 1), -12, b"w");
        let (_, weight, payload) = decode_edge_value(&encoded)?;
        assert_eq!(weight, -12);
        assert_eq!(&payload[..], b"w");
        Ok(())
    }

    #[test]
    fn truncated_records_are_corrupt() {
        assert!(matches!(
            decode_node_value(&[0u8; 10]),
            Err(GraphError::CorruptData(_))
        ));
        assert!(matches!(
            decode_edge_value(&[0u8; 20]),
            Err(GraphError::CorruptData(_))
        ));
    }
}
