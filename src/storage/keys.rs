use std::convert::TryInto;

use crate::types::{EdgeType, GraphError, NodeKey, Result};

/// Encoded length of a node key.
pub const NODE_KEY_LEN: usize = 8;
/// Encoded length of an edge key: from ‖ to ‖ type.
pub const EDGE_KEY_LEN: usize = 8 + 8 + 2;
/// Length of the prefix shared by all edges between one ordered node pair.
pub const EDGE_PAIR_PREFIX_LEN: usize = 8 + 8;

const SIGN_FLIP: u64 = 1 << 63;

/// Encodes a node key so that byte order matches signed numeric order.
///
/// The value is written big-endian with the sign bit flipped, so negative
/// keys sort before positive ones under lexicographic comparison.
pub fn encode_node_key(key: NodeKey) -> [u8; NODE_KEY_LEN] {
    ((key as u64) ^ SIGN_FLIP).to_be_bytes()
}

/// Inverse of [`encode_node_key`].
pub fn decode_node_key(bytes: &[u8]) -> Result<NodeKey> {
    let arr: [u8; NODE_KEY_LEN] = bytes
        .try_into()
        .map_err(|_| GraphError::corrupt(format!("node key must be 8 bytes, got {}", bytes.len())))?;
    Ok((u64::from_be_bytes(arr) ^ SIGN_FLIP) as NodeKey)
}

/// Encodes an edge key as `from ‖ to ‖ type`.
pub fn encode_edge_key(from: NodeKey, to: NodeKey, ty: EdgeType) -> [u8; EDGE_KEY_LEN] {
    let mut buf = [0u8; EDGE_KEY_LEN];
    buf[0..8].copy_from_slice(&encode_node_key(from));
    buf[8..16].copy_from_slice(&encode_node_key(to));
    buf[16..18].copy_from_slice(&ty.to_be_bytes());
    buf
}

/// Inverse of [`encode_edge_key`], returning `(from, to, type)`.
pub fn decode_edge_key(bytes: &[u8]) -> Result<(NodeKey, NodeKey, EdgeType)> {
    if bytes.len() != EDGE_KEY_LEN {
        return Err(GraphError::corrupt(format!(
            "edge key must be {EDGE_KEY_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    let from = decode_node_key(&bytes[0..8])?;
    let to = decode_node_key(&bytes[8..16])?;
    let ty = EdgeType::from_be_bytes([bytes[16], bytes[17]]);
    Ok((from, to, ty))
}

/// Prefix selecting every outgoing edge of `from`.
pub fn edge_key_prefix(from: NodeKey) -> [u8; NODE_KEY_LEN] {
    encode_node_key(from)
}

/// Prefix selecting every edge from `from` to `to`, across all types.
pub fn edge_key_prefix_between(from: NodeKey, to: NodeKey) -> [u8; EDGE_PAIR_PREFIX_LEN] {
    let mut buf = [0u8; EDGE_PAIR_PREFIX_LEN];
    buf[0..8].copy_from_slice(&encode_node_key(from));
    buf[8..16].copy_from_slice(&encode_node_key(to));
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn edge_prefixes_are_leading_bytes_of_edge_key() {
        let key = encode_edge_key(42, -7, 3);
        assert_eq!(&key[..8], &edge_key_prefix(42));
        assert_eq!(&key[..16], &edge_key_prefix_between(42, -7));
    }

    #[test]
    fn decode_rejects_wrong_length() {
        assert!(matches!(
            decode_node_key(&[0u8; 7]),
            Err(GraphError::CorruptData(_))
        ));
        assert!(matches!(
            decode_edge_key(&[0u8; 16]),
            Err(GraphError::CorruptData(_))
        ));
    }

    #[test]
    fn extreme_keys_sort_at_the_ends() {
        assert!(encode_node_key(i64::MIN) < encode_node_key(-1));
        assert!(encode_node_key(-1) < encode_node_key(0));
        assert!(encode_node_key(0) < encode_node_key(i64::MAX));
    }

    proptest! {
        #[test]
        fn node_key_roundtrip(k in any::<i64>()) {
            prop_assert_eq!(decode_node_key(&encode_node_key(k)).unwrap(), k);
        }

        #[test]
        fn edge_key_roundtrip(f in any::<i64>(), t in any::<i64>(), ty in any::<u16>()) {
            prop_assert_eq!(decode_edge_key(&encode_edge_key(f, t, ty)).unwrap(), (f, t, ty));
        }

        #[test]
        fn node_key_order_matches_numeric_order(a in any::<i64>(), b in any::<i64>()) {
            prop_assert_eq!(a.cmp(&b), encode_node_key(a).cmp(&encode_node_key(b)));
        }

        #[test]
        fn edge_key_order_is_from_then_to_then_type(
            a in (any::<i64>(), any::<i64>(), any::<u16>()),
            b in (any::<i64>(), any::<i64>(), any::<u16>()),
        ) {
            let ea = encode_edge_key(a.0, a.1, a.2);
            let eb = encode_edge_key(b.0, b.1, b.2);
            prop_assert_eq!(a.cmp(&b), ea.cmp(&eb));
        }
    }
}
