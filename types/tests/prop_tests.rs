use proptest::prelude::*;

use ballot_types::{Account, CandidateId, TxHash};

proptest! {
    /// Account roundtrip: from_bytes -> to_bytes produces identical bytes.
    #[test]
    fn account_bytes_roundtrip(bytes in prop::array::uniform20(0u8..)) {
        let account = Account::from_bytes(bytes);
        prop_assert_eq!(account.to_bytes(), bytes);
    }

    /// Parsing an upper-cased address yields the same account.
    #[test]
    fn account_parse_is_case_insensitive(bytes in prop::array::uniform20(0u8..)) {
        let account = Account::from_bytes(bytes);
        let upper = format!("0x{}", account.as_str()[2..].to_ascii_uppercase());
        prop_assert_eq!(Account::parse(&upper).unwrap(), account);
    }

    /// Display -> parse returns the original hash.
    #[test]
    fn tx_hash_display_parse(bytes in prop::array::uniform32(0u8..)) {
        let hash = TxHash::new(bytes);
        prop_assert_eq!(TxHash::parse(&hash.to_string()).unwrap(), hash);
    }

    /// Every integer in range is accepted, every integer out of range rejected.
    #[test]
    fn candidate_id_bounds(id in 0u64..1_000, count in 0usize..1_000) {
        let parsed = CandidateId::parse_bounded(&id.to_string(), count);
        prop_assert_eq!(parsed.is_ok(), (id as usize) < count);
    }

    /// Negative numbers never parse.
    #[test]
    fn candidate_id_rejects_negative(id in 1i64..1_000_000) {
        prop_assert!(CandidateId::parse_bounded(&(-id).to_string(), usize::MAX).is_err());
    }
}
