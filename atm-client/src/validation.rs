use crate::blockchain::{Address, Amount};
use crate::errors::{AtmError, AtmResult};
use regex::Regex;

/// Longest amount or address text accepted from the user.
const MAX_INPUT_LENGTH: usize = 100;

/// Input validation for text typed into the ATM front end
#[derive(Debug, Clone)]
pub struct InputValidator {
    // Compiled regex patterns for performance
    address_pattern: Regex,
    amount_pattern: Regex,
}

impl InputValidator {
    pub fn new() -> AtmResult<Self> {
        let address_pattern = Regex::new(r"^0[xX][a-fA-F0-9]{40}$")
            .map_err(|e| AtmError::ValidationError(format!("Invalid address regex: {}", e)))?;

        let amount_pattern = Regex::new(r"^(\d+(\.\d{0,18})?|\.\d{1,18})$")
            .map_err(|e| AtmError::ValidationError(format!("Invalid amount regex: {}", e)))?;

        Ok(InputValidator {
            address_pattern,
            amount_pattern,
        })
    }

    /// Validate an ether amount string
    pub fn validate_amount(&self, amount: &str) -> AtmResult<()> {
        self.check_length(amount)?;

        if amount.trim().is_empty() {
            return Err(AtmError::InvalidAmount(
                "Amount cannot be empty".to_string(),
            ));
        }

        if amount.trim_start().starts_with('-') {
            return Err(AtmError::InvalidAmount(
                "Amount cannot be negative".to_string(),
            ));
        }

        if !self.amount_pattern.is_match(amount.trim()) {
            return Err(AtmError::InvalidAmount(
                "Amount format is invalid".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate and convert amount text into wei.
    pub fn parse_amount(&self, amount: &str) -> AtmResult<Amount> {
        self.validate_amount(amount)?;
        Amount::from_string(amount)
    }

    /// Validate and parse an address string.
    ///
    /// All-lowercase and all-uppercase hex is accepted as is. Mixed case must
    /// carry a valid EIP-55 checksum.
    pub fn parse_address(&self, address: &str) -> AtmResult<Address> {
        let address = address.trim();
        self.check_length(address)?;

        if address.is_empty() {
            return Err(AtmError::ValidationError(
                "Address cannot be empty".to_string(),
            ));
        }

        if !self.address_pattern.is_match(address) {
            return Err(AtmError::InvalidAddress(
                "Address format is invalid".to_string(),
            ));
        }

        let digits = &address[2..];
        let mixed_case = digits.bytes().any(|b| b.is_ascii_lowercase())
            && digits.bytes().any(|b| b.is_ascii_uppercase());
        if mixed_case {
            let prefixed = format!("0x{}", digits);
            return Address::parse_checksummed(&prefixed, None).map_err(|_| {
                AtmError::InvalidAddress("Address checksum does not match".to_string())
            });
        }

        digits
            .parse::<Address>()
            .map_err(|e| AtmError::InvalidAddress(format!("Address format is invalid: {}", e)))
    }

    fn check_length(&self, input: &str) -> AtmResult<()> {
        if input.len() > MAX_INPUT_LENGTH {
            return Err(AtmError::ValidationError("Input too long".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_accepted() {
        let validator = InputValidator::new().unwrap();
        assert_eq!(validator.parse_amount("1.0").unwrap().as_string(), "1");
        assert_eq!(validator.parse_amount(" 0.25 ").unwrap().as_string(), "0.25");
        assert_eq!(validator.parse_amount(".5").unwrap().as_string(), "0.5");
    }

    #[test]
    fn amounts_rejected() {
        let validator = InputValidator::new().unwrap();
        let oversized = "9".repeat(150);
        for input in ["", "abc", "-1", "1,5", "1e3", "0x10", oversized.as_str()] {
            assert!(validator.parse_amount(input).is_err(), "input {:?}", input);
        }
        assert!(matches!(
            validator.validate_amount("-2"),
            Err(AtmError::InvalidAmount(msg)) if msg.contains("negative")
        ));
    }

    #[test]
    fn addresses_validated() {
        let validator = InputValidator::new().unwrap();
        let address = validator
            .parse_address(" 0x5fbdb2315678afecb367f032d93f642f64180aa3 ")
            .unwrap();
        assert_eq!(
            address.to_string(),
            "0x5FbDB2315678afecb367f032d93F642f64180aa3"
        );
        assert_eq!(
            validator
                .parse_address("0X5FBDB2315678AFECB367F032D93F642F64180AA3")
                .unwrap(),
            address
        );
        assert_eq!(
            validator
                .parse_address("0x5FbDB2315678afecb367f032d93F642f64180aa3")
                .unwrap(),
            address
        );
        assert!(matches!(
            validator.parse_address("0x1234"),
            Err(AtmError::InvalidAddress(_))
        ));
        assert!(validator.parse_address("").is_err());
    }

    #[test]
    fn mixed_case_address_needs_valid_checksum() {
        let validator = InputValidator::new().unwrap();
        assert!(matches!(
            validator.parse_address("0x5fbDB2315678afecb367f032d93F642f64180aa3"),
            Err(AtmError::InvalidAddress(msg)) if msg.contains("checksum")
        ));
    }
}
