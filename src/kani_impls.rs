//! Kani Arbitrary implementations and proof harnesses for the model.
//!
//! # Usage
//!
//! ```bash
//! cargo install --locked kani-verifier
//! cargo kani setup
//! cargo kani --features kani
//! ```
//!
//! This module is only compiled when using Kani (`#[cfg(kani)]`).

use crate::{EntityType, is_group_reference, personnel_local_part};

/// Small alphabet that still hits every branch of the name-shape rules.
const NAME_CHARS: &[u8] = b"aAdD:@ x";

fn arbitrary_name_char() -> char {
    let idx: usize = kani::any();
    NAME_CHARS[idx % NAME_CHARS.len()] as char
}

fn arbitrary_name(max: usize) -> String {
    let len: usize = kani::any();
    (0..len % (max + 1)).map(|_| arbitrary_name_char()).collect()
}

impl kani::Arbitrary for EntityType {
    fn any() -> Self {
        EntityType::from_u8(kani::any())
    }
}

#[kani::proof]
fn proof_entity_type_wire_roundtrip() {
    let kind: EntityType = kani::any();
    assert_eq!(EntityType::from_u8(kind.as_u8()), kind);
}

#[kani::proof]
fn proof_unknown_wire_values_are_invalid() {
    let value: u8 = kani::any();
    kani::assume(value > 3);
    assert!(EntityType::from_u8(value).is_invalid());
}

#[kani::proof]
#[kani::unwind(6)]
fn proof_local_part_has_no_separator() {
    let name = arbitrary_name(4);
    if let Some(local) = personnel_local_part(&name) {
        assert!(!local.contains('@'));
        assert_eq!(name.matches('@').count(), 1);
    }
}

#[kani::proof]
#[kani::unwind(6)]
fn proof_group_reference_ignores_leading_space() {
    let name = arbitrary_name(4);
    let padded = format!(" {name}");
    assert_eq!(is_group_reference(&name), is_group_reference(&padded));
}
