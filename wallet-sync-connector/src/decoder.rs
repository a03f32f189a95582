//! # Transfer Payload Decoding
//!
//! Token `transfer(address,uint256)` calls carry an input payload of the form
//!
//! ```text
//! 0xa9059cbb 000000000000000000000000<recipient: 40 hex> 0000…<amount: 64 hex>
//! ```
//!
//! The decoder splits the payload on runs of [`PADDING_RUN`] zero characters to
//! find the selector and the amount. The recipient is read from its fixed ABI word
//! when the payload is long enough, since an address ending in `0` runs into the
//! padding of the next word. Decoding never fails: anything that does not
//! look like a transfer comes back as [`DecodedInput::Raw`], and an amount that
//! cannot be resolved is reported as zero.

use crate::amount;
use bigdecimal::BigDecimal;

/// Shortest payload that can hold a 4-byte method selector (`0x` + 8 hex chars).
pub const MIN_PAYLOAD_LEN: usize = 10;

/// The zero run separating the ABI words of a transfer payload.
pub const PADDING_RUN: &str = "00000000000000000000000";

const ADDRESS_HEX_LEN: usize = 40;

/// Hex offsets of the first ABI word: after `0x` and the selector, 24 padding
/// characters, then the 40-character address.
const RECIPIENT_WORD: std::ops::Range<usize> = MIN_PAYLOAD_LEN..MIN_PAYLOAD_LEN + 64;

/// Result of decoding a transaction input payload.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedInput {
    /// Not a recognizable transfer call; carries the input unchanged.
    Raw(String),
    /// A token transfer.
    Transfer {
        method_id: String,
        recipient: String,
        amount: BigDecimal,
    },
}

impl DecodedInput {
    /// Transferred token amount, zero for anything but a transfer.
    pub fn token_amount(&self) -> BigDecimal {
        match self {
            DecodedInput::Transfer { amount, .. } => amount.clone(),
            DecodedInput::Raw(_) => BigDecimal::from(0),
        }
    }

    /// The decoded segments in payload order: `[input]` or `[method, recipient, amount]`.
    pub fn segments(&self) -> Vec<String> {
        match self {
            DecodedInput::Raw(input) => vec![input.clone()],
            DecodedInput::Transfer {
                method_id,
                recipient,
                amount,
            } => vec![
                method_id.clone(),
                recipient.clone(),
                amount.to_plain_string(),
            ],
        }
    }
}

/// Decodes a transfer payload, scaling the amount by `10^token_decimals`.
pub fn decode_transfer_input(input: &str, token_decimals: u32) -> DecodedInput {
    if input.len() < MIN_PAYLOAD_LEN {
        return DecodedInput::Raw(input.to_string());
    }

    let mut segments = input.splitn(3, PADDING_RUN);
    let (Some(method_id), Some(recipient), Some(raw_amount)) =
        (segments.next(), segments.next(), segments.next())
    else {
        return DecodedInput::Raw(input.to_string());
    };

    let amount = amount::resolve_amount(raw_amount, token_decimals).unwrap_or_else(|| {
        tracing::warn!(
            payload = input,
            segment = raw_amount,
            "Transfer amount is not numeric, recording 0"
        );
        BigDecimal::from(0)
    });

    DecodedInput::Transfer {
        method_id: method_id.to_string(),
        recipient: format!(
            "0x{}",
            recipient_word(input).unwrap_or_else(|| trim_address_padding(recipient))
        ),
        amount,
    }
}

/// The address held in the first ABI word, when that word is fully present.
fn recipient_word(input: &str) -> Option<&str> {
    let word = input.get(RECIPIENT_WORD)?;
    let padding = word.get(..word.len() - ADDRESS_HEX_LEN)?;
    let address = word.get(word.len() - ADDRESS_HEX_LEN..)?;
    padding.bytes().all(|b| b == b'0').then_some(address)
}

/// Drops padding zeros the split left in front of a 20-byte address.
fn trim_address_padding(segment: &str) -> &str {
    if segment.len() > ADDRESS_HEX_LEN && segment.is_char_boundary(segment.len() - ADDRESS_HEX_LEN) {
        &segment[segment.len() - ADDRESS_HEX_LEN..]
    } else {
        segment
    }
}
