//! Proptest generators for property-based testing.

use proptest::prelude::*;

use provenance_kernel_core::{
    credential::TOTAL_SHARES, ChannelId, Creator, Did, Ed25519PublicKey, Keypair,
};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random Ed25519PublicKey.
pub fn public_key() -> impl Strategy<Value = Ed25519PublicKey> {
    keypair().prop_map(|kp| kp.public_key())
}

/// Generate a channel id in the log's `0.0.<n>` form.
pub fn channel_id() -> impl Strategy<Value = ChannelId> {
    (1u64..10_000_000).prop_map(|n| ChannelId::new(format!("0.0.{n}")))
}

/// Generate a DID on testnet.
pub fn did() -> impl Strategy<Value = Did> {
    (public_key(), channel_id()).prop_filter_map("valid did", |(pk, channel)| {
        Did::derive("testnet", &pk, &channel).ok()
    })
}

/// Payload text of `min..=max` bytes, mixing ASCII with 2, 3 and 4 byte
/// code points so splits land inside multi-byte characters.
pub fn payload_text(min: usize, max: usize) -> impl Strategy<Value = String> {
    let piece = prop_oneof![
        4 => "[a-zA-Z0-9 ,.:{}\"\\[\\]]",
        1 => Just("é".to_string()),
        1 => Just("♪".to_string()),
        1 => Just("🎧".to_string()),
    ];
    (min..=max)
        .prop_flat_map(move |len| {
            prop::collection::vec(piece.clone(), len).prop_map(move |pieces| {
                let mut text = String::with_capacity(len);
                for piece in pieces {
                    if text.len() + piece.len() > len {
                        break;
                    }
                    text.push_str(&piece);
                }
                text
            })
        })
        .prop_filter("at least min bytes", move |text| text.len() >= min)
}

/// Creators whose shares sum to exactly 100.
pub fn valid_creators() -> impl Strategy<Value = Vec<Creator>> {
    prop::collection::vec(0u32..=TOTAL_SHARES as u32, 0..5).prop_map(|mut cuts| {
        cuts.sort_unstable();
        cuts.push(TOTAL_SHARES as u32);
        let mut previous = 0;
        cuts.into_iter()
            .enumerate()
            .map(|(i, cut)| {
                let share = cut - previous;
                previous = cut;
                Creator::new(format!("did:example:creator{i}"), "artist", share)
            })
            .collect()
    })
}

/// Non-empty creator sets whose shares do not sum to 100.
pub fn invalid_creators() -> impl Strategy<Value = Vec<Creator>> {
    prop::collection::vec(0u32..=120, 1..5)
        .prop_filter("sum differs from 100", |shares| {
            shares.iter().map(|s| u64::from(*s)).sum::<u64>() != TOTAL_SHARES
        })
        .prop_map(|shares| {
            shares
                .into_iter()
                .enumerate()
                .map(|(i, share)| Creator::new(format!("did:example:creator{i}"), "artist", share))
                .collect()
        })
}
