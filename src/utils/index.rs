use crate::chain::DecodeError;
use crate::chain::abi::parse_uint256;

/// Number of decimal places of the native coin.
pub const ETHER_DECIMALS: u32 = 18;

/// Format an integer amount (decimal string in base units) with `decimals` fractional digits.
///
/// Trailing fractional zeros are trimmed, so `1500000000000000000` with 18 decimals renders
/// as `1.5` and `1000000000000000000` as `1`.
pub fn format_token_amount(amount: &str, decimals: u32) -> Result<String, DecodeError> {
	parse_uint256(amount)?;

	let digits = amount.trim_start_matches('0');
	let decimals = decimals as usize;
	let padded = format!("{:0>width$}", digits, width = decimals + 1);
	let (whole, fraction) = padded.split_at(padded.len() - decimals);
	let fraction = fraction.trim_end_matches('0');

	if fraction.is_empty() {
		Ok(whole.to_string())
	} else {
		Ok(format!("{}.{}", whole, fraction))
	}
}

/// Parse a human-entered amount such as `1.25` into base units with `decimals` places.
pub fn parse_token_amount(input: &str, decimals: u32) -> Result<String, DecodeError> {
	let input = input.trim();
	let (whole, fraction) = match input.split_once('.') {
		Some((whole, fraction)) => (whole, fraction),
		None => (input, ""),
	};

	if whole.is_empty() && fraction.is_empty() {
		return Err(DecodeError::InvalidNumber(input.to_string()));
	}
	if fraction.len() > decimals as usize {
		return Err(DecodeError::OutOfRange(format!(
			"{} has more than {} decimal places",
			input, decimals
		)));
	}
	if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
		return Err(DecodeError::InvalidNumber(input.to_string()));
	}

	let combined = format!("{}{:0<width$}", whole, fraction, width = decimals as usize);
	let trimmed = combined.trim_start_matches('0');
	let base_units = if trimmed.is_empty() { "0" } else { trimmed };

	parse_uint256(base_units)?;
	Ok(base_units.to_string())
}

pub fn format_ether(wei: &str) -> Result<String, DecodeError> {
	format_token_amount(wei, ETHER_DECIMALS)
}

pub fn parse_ether(ether: &str) -> Result<String, DecodeError> {
	parse_token_amount(ether, ETHER_DECIMALS)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn formats_wei_as_ether() {
		assert_eq!(format_ether("1500000000000000000").unwrap(), "1.5");
		assert_eq!(format_ether("1000000000000000000").unwrap(), "1");
		assert_eq!(format_ether("1").unwrap(), "0.000000000000000001");
		assert_eq!(format_ether("0").unwrap(), "0");
		assert!(format_ether("-1").is_err());
	}

	#[test]
	fn parses_ether_into_wei() {
		assert_eq!(parse_ether("1.5").unwrap(), "1500000000000000000");
		assert_eq!(parse_ether("0.000000000000000001").unwrap(), "1");
		assert_eq!(parse_ether(".5").unwrap(), "500000000000000000");
		assert_eq!(parse_ether("0").unwrap(), "0");
		assert!(parse_ether("0.0000000000000000001").is_err());
		assert!(parse_ether("1e18").is_err());
		assert!(parse_ether("").is_err());
	}

	#[test]
	fn respects_custom_decimals() {
		assert_eq!(format_token_amount("1234567", 6).unwrap(), "1.234567");
		assert_eq!(parse_token_amount("2.5", 6).unwrap(), "2500000");
	}
}
