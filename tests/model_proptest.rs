//! Property-based tests for signed model types and name shapes.
//!
//! Signatures must survive a JSON round trip and must break when any signed
//! byte or any signature byte changes.

use proptest::prelude::*;

use wonka::{
    Certificate, Claim, ClaimRequest, EntityType, SigningKey, is_group_reference,
    personnel_local_part,
};

mod strategies {
    use super::*;

    pub fn service_name() -> impl Strategy<Value = String> {
        prop::string::string_regex("[a-z][a-z0-9-]{0,20}").expect("valid regex")
    }

    pub fn host_name() -> impl Strategy<Value = String> {
        prop::string::string_regex("[a-z0-9]{1,10}(\\.[a-z0-9]{1,8}){0,3}").expect("valid regex")
    }

    pub fn claim_list() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(
            prop::string::string_regex("(AD:)?[A-Za-z][A-Za-z0-9-]{0,12}").expect("valid regex"),
            1..6,
        )
    }

    pub fn entity_type() -> impl Strategy<Value = EntityType> {
        (0u8..4).prop_map(EntityType::from_u8)
    }

    pub fn window() -> impl Strategy<Value = (u64, u64)> {
        (1u64..1 << 40, 1u64..1 << 20).prop_map(|(start, len)| (start, start + len))
    }
}

fn key_from(seed: [u8; 32]) -> SigningKey {
    SigningKey::from_bytes(&seed)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn certificate_survives_json(
        name in strategies::service_name(),
        host in strategies::host_name(),
        kind in strategies::entity_type(),
        (va, vb) in strategies::window(),
        seed in any::<[u8; 32]>(),
    ) {
        let authority = key_from(seed);
        let holder = SigningKey::generate();
        let mut cert = Certificate::new(name, kind, host, &holder.verifying_key(), va, vb);
        cert.sign(&authority).unwrap();

        let parsed = Certificate::from_bytes(&cert.to_bytes().unwrap()).unwrap();
        prop_assert_eq!(&parsed, &cert);
        prop_assert!(parsed.validate_signature(&[authority.verifying_key()]).is_ok());
    }

    #[test]
    fn flipped_signature_byte_fails(
        name in strategies::service_name(),
        (va, vb) in strategies::window(),
        index in 0usize..64,
        bit in 0u8..8,
    ) {
        let authority = SigningKey::generate();
        let holder = SigningKey::generate();
        let mut cert =
            Certificate::new(name, EntityType::Service, "h1", &holder.verifying_key(), va, vb);
        cert.sign(&authority).unwrap();

        cert.signature[index] ^= 1 << bit;
        prop_assert!(cert.validate_signature(&[authority.verifying_key()]).is_err());
    }

    #[test]
    fn flipped_payload_byte_fails(
        claims in strategies::claim_list(),
        index in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let authority = SigningKey::generate();
        let mut claim = Claim::new("svc-a", &claims.join(","), "svc-b", 1, 2);
        claim.sign(&authority).unwrap();

        let mut payload = claim.signing_bytes().unwrap();
        let at = index.index(payload.len());
        payload[at] ^= 1 << bit;
        prop_assert!(!authority.verifying_key().verify(&payload, &claim.signature));
    }

    #[test]
    fn claim_request_signature_survives_json(
        name in strategies::service_name(),
        claims in strategies::claim_list(),
        ctime in 0i64..1 << 40,
        lifetime in 1i64..86_400,
    ) {
        let key = SigningKey::generate();
        let mut req = ClaimRequest::new(name, claims.join(","), "dest", ctime, ctime + lifetime);
        req.sign(&key).unwrap();

        let json = serde_json::to_vec(&req).unwrap();
        let parsed: ClaimRequest = serde_json::from_slice(&json).unwrap();
        let sig = parsed.entity_signature_bytes().unwrap();
        prop_assert!(key.verifying_key().verify(&parsed.signing_bytes().unwrap(), &sig));
    }

    #[test]
    fn group_reference_is_case_insensitive(
        body in "[a-z-]{1,12}",
        upper_a in any::<bool>(),
        upper_d in any::<bool>(),
        indent in 0usize..3,
    ) {
        let a = if upper_a { 'A' } else { 'a' };
        let d = if upper_d { 'D' } else { 'd' };
        let text = format!("{}{a}{d}:{body}", " ".repeat(indent));
        prop_assert!(is_group_reference(&text));
        prop_assert!(!is_group_reference(&body));
    }

    #[test]
    fn local_part_matches_split(local in "[a-z]{1,8}", domain in "[a-z]{1,8}\\.com") {
        let name = format!("{local}@{domain}");
        prop_assert_eq!(personnel_local_part(&name), Some(local.as_str()));
        let twice = format!("{name}@x");
        prop_assert_eq!(personnel_local_part(&twice), None);
    }
}
