//! Display helpers for tallies and addresses.

/// Share of `votes` in `total`, as a percentage with one decimal.
pub fn vote_share(votes: u64, total: u64) -> String {
    if total == 0 {
        return "0.0%".to_string();
    }
    // Tenths of a percent, rounded half up.
    let tenths = (votes as u128 * 2000 + total as u128) / (total as u128 * 2);
    format!("{}.{}%", tenths / 10, tenths % 10)
}

/// Shorten `0x1234...abcd` style for narrow columns; short inputs are returned as is.
pub fn short_address(address: &str) -> String {
    if address.len() <= 12 {
        return address.to_string();
    }
    format!("{}…{}", &address[..6], &address[address.len() - 4..])
}
