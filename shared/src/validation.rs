//! Validation utilities for the warehouse inventory service

use rust_decimal::Decimal;

/// Largest value a NUMERIC(12,2) column can hold
pub fn max_money() -> Decimal {
    Decimal::new(999_999_999_999, 2)
}

// ============================================================================
// Stock Movement Validations
// ============================================================================

/// Validate a movement quantity (whole units, strictly positive)
pub fn validate_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be greater than 0");
    }
    Ok(())
}

/// Validate a money amount against the NUMERIC(12,2) columns
pub fn validate_money(amount: Decimal) -> Result<(), &'static str> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err("Amount cannot be negative");
    }
    if amount.normalize().scale() > 2 {
        return Err("Amount can have at most 2 decimal places");
    }
    if amount > max_money() {
        return Err("Amount is too large");
    }
    Ok(())
}

/// Validate a document reference such as a PO or delivery note number
pub fn validate_document_number(document_number: &str) -> Result<(), &'static str> {
    if document_number.chars().count() > 100 {
        return Err("Document number must be at most 100 characters");
    }
    Ok(())
}

// ============================================================================
// Master Data Validations
// ============================================================================

/// Validate SKU code format (1-50 characters of letters, digits, `-`, `_` or `.`)
pub fn validate_sku_code(code: &str) -> Result<(), &'static str> {
    if code.is_empty() {
        return Err("SKU code is required");
    }
    if code.chars().count() > 50 {
        return Err("SKU code must be at most 50 characters");
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err("SKU code may only contain letters, digits, '-', '_' and '.'");
    }
    Ok(())
}

/// Validate a required display name with a maximum length
pub fn validate_name(name: &str, max_len: usize) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        return Err("Name is required");
    }
    if name.chars().count() > max_len {
        return Err("Name is too long");
    }
    Ok(())
}

/// Validate an optional free-text field against a maximum length
pub fn validate_max_len(value: &str, max_len: usize) -> Result<(), &'static str> {
    if value.chars().count() > max_len {
        return Err("Value is too long");
    }
    Ok(())
}

/// Validate phone number format
/// Accepts digits with optional leading `+`, spaces and dashes, up to 20 characters
pub fn validate_phone(phone: &str) -> Result<(), &'static str> {
    if phone.len() > 20 {
        return Err("Phone number must be at most 20 characters");
    }
    let body = phone.strip_prefix('+').unwrap_or(phone);
    if !body.chars().all(|c| c.is_ascii_digit() || c == ' ' || c == '-') {
        return Err("Invalid phone number format");
    }
    let digits = body.chars().filter(|c| c.is_ascii_digit()).count();
    if digits < 6 {
        return Err("Invalid phone number format");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(i32::MAX).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-5).is_err());
    }

    #[test]
    fn test_validate_money() {
        assert!(validate_money(dec("0")).is_ok());
        assert!(validate_money(dec("12.50")).is_ok());
        assert!(validate_money(dec("12.500")).is_ok()); // trailing zero only
        assert!(validate_money(dec("9999999999.99")).is_ok());
        assert!(validate_money(dec("-0.01")).is_err());
        assert!(validate_money(dec("1.005")).is_err());
        assert!(validate_money(dec("10000000000.00")).is_err());
    }

    #[test]
    fn test_validate_document_number() {
        assert!(validate_document_number("PO-2024-0001").is_ok());
        assert!(validate_document_number(&"X".repeat(100)).is_ok());
        assert!(validate_document_number(&"X".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_sku_code() {
        assert!(validate_sku_code("BOLT-M8").is_ok());
        assert!(validate_sku_code("A1_b2.c3").is_ok());
        assert!(validate_sku_code("").is_err());
        assert!(validate_sku_code("has space").is_err());
        assert!(validate_sku_code(&"A".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Hex bolt", 255).is_ok());
        assert!(validate_name("   ", 255).is_err());
        assert!(validate_name("abcdef", 5).is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("+62 812-3456-7890").is_ok());
        assert!(validate_phone("0812345678").is_ok());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("call me").is_err());
        assert!(validate_phone("+1234567890123456789012").is_err());
    }
}
