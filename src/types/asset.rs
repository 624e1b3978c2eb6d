use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use snafu::{ensure, Snafu, OptionExt, ResultExt};

use crate::{InvalidSymbol, Name, Symbol};


#[derive(Debug, Snafu)]
pub enum InvalidAsset {
    #[snafu(display("asset amount and symbol should be separated with space"))]
    MissingSpace,

    #[snafu(display("missing decimal fraction after decimal point"))]
    MissingDecimal,

    #[snafu(display("could not parse amount for asset"))]
    ParseAmount { source: ParseIntError },

    #[snafu(display("amount overflow for: {amount}"))]
    AmountOverflow { amount: String },

    #[snafu(display("amount out of range, max is 2^62-1"))]
    AmountOutOfRange,

    #[snafu(display("could not parse symbol from asset string"))]
    InvalidSymbol { source: InvalidSymbol },
}


/// A quantity of some token: a signed amount in fractional units and the
/// [`Symbol`] giving the precision and code.
///
/// The string form is fixed-point with exactly `decimals` fractional digits,
/// eg. `"1.2345 EOS"` for amount 12345 with symbol `4,EOS`.
#[derive(PartialEq, Eq, Debug, Copy, Clone, Hash)]
pub struct Asset {
    amount: i64,
    symbol: Symbol,
}

impl Asset {
    const MAX_AMOUNT: i64 = (1 << 62) - 1;

    /// Build an asset, checking that the amount is within the chain's range.
    pub fn new(amount: i64, symbol: Symbol) -> Result<Asset, InvalidAsset> {
        let result = Asset { amount, symbol };
        result.check_valid()?;
        Ok(result)
    }

    fn is_amount_within_range(&self) -> bool {
        -Self::MAX_AMOUNT <= self.amount && self.amount <= Self::MAX_AMOUNT
    }

    pub fn is_valid(&self) -> bool {
        self.is_amount_within_range() && self.symbol.is_valid()
    }

    pub fn check_valid(&self) -> Result<(), InvalidAsset> {
        ensure!(self.is_amount_within_range(), AmountOutOfRangeSnafu);
        // no need to check the symbol, it has been successfully constructed
        Ok(())
    }

    pub fn amount(&self) -> i64 { self.amount }
    pub fn symbol(&self) -> Symbol { self.symbol }
    pub fn symbol_name(&self) -> String { self.symbol.name() }
    pub fn decimals(&self) -> u8 { self.symbol.decimals() }
    pub fn precision(&self) -> i64 { self.symbol.precision() }

    pub fn from_str(s: &str) -> Result<Self, InvalidAsset> {
        let s = s.trim();

        // find space in order to split amount and symbol
        let space_pos = s.find(' ').context(MissingSpaceSnafu)?;

        let amount_str = &s[..space_pos];
        let symbol_str = s[space_pos + 1..].trim();

        // the number of digits after the decimal point gives the precision
        let dot_pos = amount_str.find('.');
        let precision = match dot_pos {
            Some(dot_pos) => {
                // if a decimal point is used, a decimal fraction must follow
                ensure!(dot_pos != amount_str.len() - 1, MissingDecimalSnafu);
                amount_str.len() - dot_pos - 1
            },
            None => 0,
        };

        let symbol = Symbol::from_precision_and_code(precision as u8, symbol_str)
            .context(InvalidSymbolSnafu)?;

        let amount: i64 = match dot_pos {
            None => amount_str.parse().context(ParseAmountSnafu)?,
            Some(dot_pos) => {
                let int_part: i64 = amount_str[..dot_pos].parse().context(ParseAmountSnafu)?;
                let mut frac_part: i64 = amount_str[dot_pos + 1..].parse().context(ParseAmountSnafu)?;
                if amount_str.starts_with('-') { frac_part = -frac_part; }
                int_part
                    .checked_mul(symbol.precision())
                    .context(AmountOverflowSnafu { amount: amount_str })?
                    .checked_add(frac_part)
                    .context(AmountOverflowSnafu { amount: amount_str })?
            },
        };

        let result = Self { amount, symbol };
        result.check_valid()?;
        Ok(result)
    }
}


impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount < 0 { "-" } else { "" };
        let abs_amount = self.amount.unsigned_abs() as i64;
        let mut result = (abs_amount / self.precision()).to_string();
        if self.decimals() != 0 {
            let frac = abs_amount % self.precision();
            result.push('.');
            // (precision + frac) gives the right number of leading zeros
            result.push_str(&(self.precision() + frac).to_string()[1..]);
        }

        write!(f, "{}{} {}", sign, result, self.symbol_name())
    }
}


impl Serialize for Asset {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Asset {
    fn deserialize<D>(deserializer: D) -> Result<Asset, D::Error>
    where
        D: Deserializer<'de>,
    {
        let repr: String = String::deserialize(deserializer)?;
        Asset::from_str(&repr).map_err(|e| de::Error::custom(e.to_string()))
    }
}

impl FromStr for Asset {
    type Err = InvalidAsset;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Asset::from_str(s)
    }
}


// -----------------------------------------------------------------------------
//     ExtendedAsset
// -----------------------------------------------------------------------------

/// An [`Asset`] together with the account managing the token contract.
#[derive(PartialEq, Eq, Debug, Copy, Clone, Hash, Serialize, Deserialize)]
pub struct ExtendedAsset {
    pub quantity: Asset,
    pub contract: Name,
}


// =============================================================================
//
//     Unittests
//
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_assets() {
        let reprs = [
            "99 WAXIBULGLOUBI",  // symbol code too long
            "99.2A3 WAX",        // cannot parse amount
            "1WAX",
            "1 1 WAX",
            "WAX",
            &format!("{} WAX", i128::pow(2, 64)),
            "4611686018427387904 WAX",   // 2^62, just over the max amount
            "-4611686018427387904 WAX",
            "1 WAXXXXXX",
            "99 ",
            "99",
            "99. WAX",
            "99.",
        ];

        for r in reprs {
            assert!(Asset::from_str(r).is_err(), r#"asset "{r}" should fail parsing"#);
        }
    }

    #[test]
    fn amount_range() {
        // 2^62 - 1 is the largest representable amount
        assert!(Asset::from_str("4611686018427387903 WAX").is_ok());
        assert!(Asset::from_str("-4611686018427387903 WAX").is_ok());

        let symbol: Symbol = "0,WAX".parse().unwrap();
        assert!(Asset::new(1, symbol).is_ok());
        assert!(matches!(Asset::new(1 << 62, symbol),
                         Err(InvalidAsset::AmountOutOfRange { .. })));
    }

    #[test]
    fn fixed_point_formatting() {
        assert_eq!(Asset::from_str("1.2345 EOS").unwrap().to_string(), "1.2345 EOS");
        assert_eq!(Asset::from_str("0.0001 SYS").unwrap().amount(), 1);
        assert_eq!(Asset::from_str("-0.0001 SYS").unwrap().amount(), -1);
        assert_eq!(Asset::from_str("-0.0001 SYS").unwrap().to_string(), "-0.0001 SYS");
        assert_eq!(Asset::new(10000, "4,CUR".parse().unwrap()).unwrap().to_string(), "1.0000 CUR");
        assert_eq!(Asset::from_str("99 WAX").unwrap().to_string(), "99 WAX");
    }

    #[test]
    fn serialize_json() {
        let obj = Asset::from_str("1.2345 FOO").unwrap();
        let json = r#""1.2345 FOO""#;

        assert_eq!(obj.amount(), 12345);
        assert_eq!(obj.decimals(), 4);
        assert_eq!(obj.precision(), 10000);

        assert_eq!(serde_json::from_str::<Asset>(json).unwrap(), obj);
        assert_eq!(serde_json::to_string(&obj).unwrap(), json);
    }
}
