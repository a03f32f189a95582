mod common;

use bigdecimal::BigDecimal;
use common::TRANSFER_PAYLOAD;
use num_bigint::BigInt;
use std::{str::FromStr, time::Instant};
use wallet_sync_connector::{
    amount::scale_units,
    decoder::{decode_transfer_input, DecodedInput},
};

fn transfer_payload(recipient_hex: &str, amount_segment: &str) -> String {
    format!(
        "0xa9059cbb{}{}{}{}",
        "0".repeat(24),
        recipient_hex,
        "0".repeat(23),
        amount_segment
    )
}

#[test]
fn decodes_a_token_transfer() {
    let decoded = decode_transfer_input(TRANSFER_PAYLOAD, 18);

    assert_eq!(
        decoded,
        DecodedInput::Transfer {
            method_id: "0xa9059cbb".to_string(),
            recipient: "0x2abe40823174787749628be669d9d9ae4da84434".to_string(),
            amount: BigDecimal::from(11111),
        }
    );
    assert_eq!(
        decoded.segments(),
        vec![
            "0xa9059cbb".to_string(),
            "0x2abe40823174787749628be669d9d9ae4da84434".to_string(),
            "11111".to_string(),
        ]
    );
}

#[test]
fn token_decimals_control_the_scale() {
    let decoded = decode_transfer_input(TRANSFER_PAYLOAD, 21);
    assert_eq!(decoded.token_amount(), BigDecimal::from_str("11.111").unwrap());
}

#[test]
fn short_input_is_returned_unchanged() {
    for input in ["", "0x", "0xa9059c"] {
        let decoded = decode_transfer_input(input, 18);
        assert_eq!(decoded, DecodedInput::Raw(input.to_string()));
        assert_eq!(decoded.segments(), vec![input.to_string()]);
        assert_eq!(decoded.token_amount(), BigDecimal::from(0));
    }
}

#[test]
fn input_without_padding_is_not_a_transfer() {
    let decoded = decode_transfer_input("0xd0e30db0", 18);
    assert_eq!(decoded, DecodedInput::Raw("0xd0e30db0".to_string()));
}

#[test]
fn unreadable_amount_is_recorded_as_zero() {
    let payload = transfer_payload("2abe40823174787749628be669d9d9ae4da84434", "zz");

    let decoded = decode_transfer_input(&payload, 18);
    assert!(matches!(decoded, DecodedInput::Transfer { .. }));
    assert_eq!(decoded.token_amount(), BigDecimal::from(0));
}

#[test]
fn exponent_shaped_amount_is_read_as_hex() {
    let started = Instant::now();
    let decoded = decode_transfer_input(
        &transfer_payload("2abe40823174787749628be669d9d9ae4da84434", "1e9999999"),
        18,
    );

    assert_eq!(
        decoded.token_amount(),
        scale_units(BigInt::from(0x1_e999_9999u64), 18)
    );
    assert_eq!(decoded.token_amount().to_plain_string(), "0.000000008214124953");
    assert!(started.elapsed().as_secs() < 1);
}

#[test]
fn recipient_ending_in_zero_is_kept_whole() {
    let payload = format!(
        "0xa9059cbb{}{}{:0>64}",
        "0".repeat(24),
        "2abe40823174787749628be669d9d9ae4da84430",
        "25a5419af66253c0000"
    );

    let decoded = decode_transfer_input(&payload, 18);
    assert_eq!(
        decoded,
        DecodedInput::Transfer {
            method_id: "0xa9059cbb".to_string(),
            recipient: "0x2abe40823174787749628be669d9d9ae4da84430".to_string(),
            amount: BigDecimal::from(11111),
        }
    );
}
