//! Custom payload framing inside transaction calldata.
//!
//! ```text
//! [CA FE DA 7A][payload length: u32 BE][payload][standard data]
//! ```

use alloy::consensus::TxEip1559;
use alloy::primitives::{Address, Bytes, TxKind, U256};
use thiserror::Error;

/// Marker that opens every framed payload.
pub const MAGIC_BYTES: [u8; 4] = [0xCA, 0xFE, 0xDA, 0x7A];

/// Marker plus the length prefix.
pub const HEADER_LEN: usize = MAGIC_BYTES.len() + 4;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("payload of {0} bytes exceeds the 4-byte length prefix")]
    PayloadTooLarge(usize),

    #[error("invalid custom data encoding: declared {declared} bytes, {available} available")]
    Truncated { declared: usize, available: usize },
}

pub type EncodingResult<T> = Result<T, EncodingError>;

/// Calldata split into its embedded payload and the caller's own data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded<'a> {
    /// `None` when the calldata carries no marker.
    pub payload: Option<&'a [u8]>,
    pub standard: &'a [u8],
}

impl<'a> Decoded<'a> {
    /// Payload bytes, empty when absent.
    pub fn payload_or_empty(&self) -> &'a [u8] {
        self.payload.unwrap_or_default()
    }
}

/// Frame `payload` ahead of `standard`.
pub fn encode(standard: &[u8], payload: &[u8]) -> EncodingResult<Bytes> {
    let len = u32::try_from(payload.len())
        .map_err(|_| EncodingError::PayloadTooLarge(payload.len()))?;

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len() + standard.len());
    out.extend_from_slice(&MAGIC_BYTES);
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(payload);
    out.extend_from_slice(standard);
    Ok(out.into())
}

/// Split framed calldata.
///
/// Data shorter than the header, or without the marker, is returned whole as
/// standard data. A marker whose declared length runs past the end of the
/// buffer is an error.
pub fn decode(data: &[u8]) -> EncodingResult<Decoded<'_>> {
    let unframed = Decoded {
        payload: None,
        standard: data,
    };
    if data.len() < HEADER_LEN || !is_custom(data) {
        return Ok(unframed);
    }

    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&data[MAGIC_BYTES.len()..HEADER_LEN]);
    let declared = u32::from_be_bytes(len_bytes) as usize;

    let body = &data[HEADER_LEN..];
    if declared > body.len() {
        return Err(EncodingError::Truncated {
            declared,
            available: body.len(),
        });
    }

    let (payload, standard) = body.split_at(declared);
    Ok(Decoded {
        payload: Some(payload),
        standard,
    })
}

/// Whether `data` starts with the marker.
pub fn is_custom(data: &[u8]) -> bool {
    data.starts_with(&MAGIC_BYTES)
}

/// Unsigned EIP-1559 transaction whose calldata carries `payload`.
///
/// A `to` of `None` creates a contract.
#[allow(clippy::too_many_arguments)]
pub fn build_custom_transaction(
    chain_id: u64,
    nonce: u64,
    to: Option<Address>,
    value: U256,
    gas_limit: u64,
    max_priority_fee_per_gas: u128,
    max_fee_per_gas: u128,
    data: &[u8],
    payload: &[u8],
) -> EncodingResult<TxEip1559> {
    Ok(TxEip1559 {
        chain_id,
        nonce,
        gas_limit,
        max_fee_per_gas,
        max_priority_fee_per_gas,
        to: to.map_or(TxKind::Create, TxKind::Call),
        value,
        access_list: Default::default(),
        input: encode(data, payload)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    #[test]
    fn test_layout_is_bit_exact() {
        let encoded = encode(&[0x01, 0x02], b"custom").unwrap();
        let mut expected = vec![0xCA, 0xFE, 0xDA, 0x7A, 0x00, 0x00, 0x00, 0x06];
        expected.extend_from_slice(b"custom");
        expected.extend_from_slice(&[0x01, 0x02]);
        assert_eq!(encoded.as_ref(), expected.as_slice());
    }

    #[test]
    fn test_round_trip() {
        let encoded = encode(&[0x01, 0x02], b"custom").unwrap();
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded.payload, Some(&b"custom"[..]));
        assert_eq!(decoded.standard, &[0x01, 0x02]);
    }

    #[test]
    fn test_large_random_payload() {
        let mut payload = vec![0u8; 1024];
        rand::thread_rng().fill_bytes(&mut payload);
        let encoded = encode(&[], &payload).unwrap();
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded.payload, Some(payload.as_slice()));
        assert!(decoded.standard.is_empty());
    }

    #[test]
    fn test_empty_payload_is_still_framed() {
        let encoded = encode(b"abc", &[]).unwrap();
        assert!(is_custom(&encoded));
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded.payload, Some(&[][..]));
        assert_eq!(decoded.standard, b"abc");
    }

    #[test]
    fn test_unframed_data_passes_through() {
        let plain = [0xa9, 0x05, 0x9c, 0xbb, 0x00, 0x00, 0x00, 0x01, 0x02];
        let decoded = decode(&plain).unwrap();
        assert_eq!(decoded.payload, None);
        assert_eq!(decoded.standard, &plain);
        assert_eq!(decoded.payload_or_empty(), &[] as &[u8]);
    }

    #[test]
    fn test_short_buffer_with_marker_passes_through() {
        let short = [0xCA, 0xFE, 0xDA, 0x7A, 0x00];
        let decoded = decode(&short).unwrap();
        assert_eq!(decoded.payload, None);
        assert_eq!(decoded.standard, &short);
        assert!(is_custom(&short));
    }

    #[test]
    fn test_declared_length_past_end_is_rejected() {
        let bad = [0xCA, 0xFE, 0xDA, 0x7A, 0x00, 0x00, 0x00, 0x10, 0xAA];
        assert_eq!(
            decode(&bad),
            Err(EncodingError::Truncated {
                declared: 16,
                available: 1
            })
        );
    }

    #[test]
    fn test_is_custom_prefix_only() {
        assert!(!is_custom(&[]));
        assert!(!is_custom(&[0xCA, 0xFE, 0xDA]));
        assert!(!is_custom(&[0x00, 0xCA, 0xFE, 0xDA, 0x7A]));
        assert!(is_custom(&MAGIC_BYTES));
    }

    #[test]
    fn test_build_custom_transaction() {
        let to = Address::repeat_byte(0x42);
        let tx = build_custom_transaction(
            1337,
            9,
            Some(to),
            U256::from(5u64),
            100_000,
            2,
            22,
            &[0xde, 0xad],
            b"hello",
        )
        .unwrap();

        assert_eq!(tx.chain_id, 1337);
        assert_eq!(tx.nonce, 9);
        assert_eq!(tx.to, TxKind::Call(to));
        assert_eq!(tx.max_fee_per_gas, 22);
        assert_eq!(tx.max_priority_fee_per_gas, 2);
        let decoded = decode(&tx.input).unwrap();
        assert_eq!(decoded.payload, Some(&b"hello"[..]));
        assert_eq!(decoded.standard, &[0xde, 0xad]);

        let create = build_custom_transaction(1, 0, None, U256::ZERO, 1, 1, 1, &[], &[]).unwrap();
        assert_eq!(create.to, TxKind::Create);
    }
}
