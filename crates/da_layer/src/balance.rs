//! Balance responses from cosmos-style `q bank balances` queries.

use num_bigint::BigUint;
use serde::Deserialize;

/// A denom/amount pair. Amounts are decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

/// Output of `<binary> q bank balances <addr> -o json`.
#[derive(Debug, Clone, Deserialize)]
pub struct BankBalancesResponse {
    #[serde(default)]
    pub balances: Vec<Coin>,
}

impl BankBalancesResponse {
    /// Balance in `denom`, zero when the account holds none.
    pub fn balance_of(&self, denom: &str) -> Result<BigUint, String> {
        match self.balances.iter().find(|c| c.denom == denom) {
            Some(coin) => parse_amount(&coin.amount),
            None => Ok(BigUint::default()),
        }
    }
}

/// Parse a non-negative integer amount.
///
/// Accepts plain decimal, decimal with `,` or `_` separators, and `0x` hex.
pub fn parse_amount(raw: &str) -> Result<BigUint, String> {
    let raw = raw.trim();
    let parsed = if let Some(hex_digits) = raw.strip_prefix("0x") {
        BigUint::parse_bytes(hex_digits.as_bytes(), 16)
    } else {
        let digits: String = raw.chars().filter(|c| *c != ',' && *c != '_').collect();
        BigUint::parse_bytes(digits.as_bytes(), 10)
    };
    parsed.ok_or_else(|| format!("invalid amount {:?}", raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_of() {
        let resp: BankBalancesResponse = serde_json::from_str(
            r#"{"balances":[{"denom":"utia","amount":"123456789012345678901234567890"}],"pagination":{"next_key":null,"total":"0"}}"#,
        )
        .unwrap();
        assert_eq!(
            resp.balance_of("utia").unwrap().to_string(),
            "123456789012345678901234567890"
        );
        assert_eq!(resp.balance_of("adym").unwrap(), BigUint::default());
    }

    #[test]
    fn test_parse_amount_formats() {
        assert_eq!(parse_amount("1,000,000").unwrap(), BigUint::from(1_000_000u32));
        assert_eq!(parse_amount("0x10").unwrap(), BigUint::from(16u32));
        assert!(parse_amount("-5").is_err());
        assert!(parse_amount("1.5").is_err());
    }
}
