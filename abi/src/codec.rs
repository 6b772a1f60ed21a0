//! Call-data encoding and return-data decoding for the election contract.
//!
//! Only static head encoding is needed for arguments (`uint256`, `address`).
//! Return data is either a single `uint256` word or a dynamic array of the
//! static tuple `(uint256 candidateId, address candidateAddress, uint256 votes)`.

use ballot_types::{Account, Candidate};
use ethereum_types::U256;

use crate::error::AbiError;
use crate::schema::AbiFunction;

const WORD: usize = 32;
const CANDIDATE_WORDS: usize = 3;

/// A single static ABI argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Uint(U256),
    Address(Account),
}

impl Token {
    fn to_word(&self) -> [u8; WORD] {
        let mut word = [0u8; WORD];
        match self {
            Token::Uint(value) => value.to_big_endian(&mut word),
            Token::Address(account) => word[WORD - Account::LEN..].copy_from_slice(&account.to_bytes()),
        }
        word
    }
}

impl From<u64> for Token {
    fn from(value: u64) -> Self {
        Token::Uint(U256::from(value))
    }
}

/// Selector followed by one word per argument.
pub fn encode_call(function: &AbiFunction, args: &[Token]) -> Result<Vec<u8>, AbiError> {
    if function.inputs.len() != args.len() {
        return Err(AbiError::ArgumentCount {
            method: function.name.clone(),
            expected: function.inputs.len(),
            got: args.len(),
        });
    }
    let mut data = Vec::with_capacity(4 + WORD * args.len());
    data.extend_from_slice(&function.selector());
    for arg in args {
        data.extend_from_slice(&arg.to_word());
    }
    Ok(data)
}

pub fn encode_uint(value: U256) -> Vec<u8> {
    Token::Uint(value).to_word().to_vec()
}

/// Encode a candidate list the way the contract returns it from `getCandidates()`.
pub fn encode_candidates(candidates: &[Candidate]) -> Vec<u8> {
    let mut data = Vec::with_capacity(WORD * (2 + CANDIDATE_WORDS * candidates.len()));
    data.extend(encode_uint(U256::from(WORD)));
    data.extend(encode_uint(U256::from(candidates.len())));
    for c in candidates {
        data.extend(encode_uint(U256::from(c.candidate_id)));
        data.extend(Token::Address(c.candidate_address.clone()).to_word());
        data.extend(encode_uint(U256::from(c.votes)));
    }
    data
}

fn word_at(data: &[u8], offset: usize) -> Result<&[u8], AbiError> {
    offset
        .checked_add(WORD)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| {
            AbiError::Malformed(format!(
                "need a word at byte {offset}, only {} bytes available",
                data.len()
            ))
        })
}

fn to_u64(value: U256) -> Result<u64, AbiError> {
    if value > U256::from(u64::MAX) {
        return Err(AbiError::Overflow(value.to_string()));
    }
    Ok(value.low_u64())
}

fn to_usize(value: U256, data_len: usize) -> Result<usize, AbiError> {
    let v = to_u64(value)?;
    // Anything larger than the payload cannot be a valid offset or length.
    if v > data_len as u64 {
        return Err(AbiError::Malformed(format!("{v} exceeds payload of {data_len} bytes")));
    }
    Ok(v as usize)
}

/// Decode the first word of return data as `uint256`.
pub fn decode_uint(data: &[u8]) -> Result<U256, AbiError> {
    Ok(U256::from_big_endian(word_at(data, 0)?))
}

/// Decode the `(uint256,address,uint256)[]` returned by `getCandidates()`.
pub fn decode_candidates(data: &[u8]) -> Result<Vec<Candidate>, AbiError> {
    let offset = to_usize(decode_uint(data)?, data.len())?;
    let len = to_usize(U256::from_big_endian(word_at(data, offset)?), data.len())?;

    let mut candidates = Vec::with_capacity(len);
    let mut cursor = offset + WORD;
    for _ in 0..len {
        let id = U256::from_big_endian(word_at(data, cursor)?);
        let address_word = word_at(data, cursor + WORD)?;
        let votes = U256::from_big_endian(word_at(data, cursor + 2 * WORD)?);

        if address_word[..WORD - Account::LEN].iter().any(|b| *b != 0) {
            return Err(AbiError::Malformed("address word has non-zero padding".into()));
        }
        let mut address = [0u8; Account::LEN];
        address.copy_from_slice(&address_word[WORD - Account::LEN..]);

        candidates.push(Candidate {
            candidate_id: to_u64(id)?,
            candidate_address: Account::from_bytes(address),
            votes: to_u64(votes)?,
        });
        cursor += CANDIDATE_WORDS * WORD;
    }
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ContractAbi, ElectionMethod};

    fn candidate(id: u64, votes: u64) -> Candidate {
        Candidate {
            candidate_id: id,
            candidate_address: Account::from_bytes([0x10 + id as u8; 20]),
            votes,
        }
    }

    #[test]
    fn vote_call_data_layout() {
        let abi = ContractAbi::election();
        let vote = abi.function(ElectionMethod::Vote.name()).unwrap();
        let data = encode_call(vote, &[Token::from(2)]).unwrap();
        assert_eq!(data.len(), 36);
        assert_eq!(&data[..4], &vote.selector());
        assert_eq!(data[35], 2);
        assert!(data[4..35].iter().all(|b| *b == 0));
    }

    #[test]
    fn argument_count_is_checked() {
        let abi = ContractAbi::election();
        let vote = abi.function("Vote").unwrap();
        assert!(matches!(
            encode_call(vote, &[]),
            Err(AbiError::ArgumentCount { expected: 1, got: 0, .. })
        ));
        let register = abi.function("candidateRegistration").unwrap();
        assert_eq!(encode_call(register, &[]).unwrap().len(), 4);
    }

    #[test]
    fn candidate_list_decodes_in_order() {
        let list = vec![candidate(0, 3), candidate(1, 0), candidate(2, 9)];
        let decoded = decode_candidates(&encode_candidates(&list)).unwrap();
        assert_eq!(decoded, list);
    }

    #[test]
    fn empty_candidate_list() {
        let data = encode_candidates(&[]);
        assert_eq!(data.len(), 64);
        assert!(decode_candidates(&data).unwrap().is_empty());
    }

    #[test]
    fn truncated_return_data_is_malformed() {
        let mut data = encode_candidates(&[candidate(0, 1)]);
        data.truncate(data.len() - 1);
        assert!(matches!(decode_candidates(&data), Err(AbiError::Malformed(_))));
        assert!(matches!(decode_uint(&[0u8; 31]), Err(AbiError::Malformed(_))));
        assert!(matches!(decode_candidates(&[]), Err(AbiError::Malformed(_))));
    }

    #[test]
    fn oversized_votes_overflow() {
        let mut data = encode_candidates(&[candidate(0, 1)]);
        // Set the high byte of the votes word.
        let votes_word = 64 + 2 * 32;
        data[votes_word] = 1;
        assert!(matches!(decode_candidates(&data), Err(AbiError::Overflow(_))));
    }

    #[test]
    fn uint_word() {
        assert_eq!(decode_uint(&encode_uint(U256::from(7u64))).unwrap(), U256::from(7u64));
    }
}
