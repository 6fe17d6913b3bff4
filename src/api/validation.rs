//! Field-level payload validation.
//!
//! Handlers deserialize request bodies into permissive structs holding raw
//! JSON values per field, then run these checks to accumulate every problem
//! into one [`FieldErrors`] map. A field that fails any check yields `None`
//! so callers can tell "absent" and "rejected" apart from "accepted".

use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

use super::error::FieldErrors;

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const NOT_A_STRING: &str = "Not a valid string.";
pub const NOT_A_BOOLEAN: &str = "Must be a valid boolean.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const NOT_A_NUMBER: &str = "A valid number is required.";
pub const NOT_AN_INTEGER: &str = "A valid integer is required.";
pub const EMAIL_TAKEN: &str = "Email already exists.";

pub const EMAIL_MAX_LENGTH: usize = 254;
pub const NAME_MAX_LENGTH: usize = 50;
pub const PASSWORD_MAX_LENGTH: usize = 128;

/// Price columns hold 12 significant digits, two of them after the point.
pub const PRICE_MAX_DIGITS: u32 = 12;
pub const PRICE_DECIMAL_PLACES: u32 = 2;

const QUANTITY_MIN: i64 = 1;
const QUANTITY_MAX: i64 = i32::MAX as i64;

fn max_length_message(limit: usize) -> String {
    format!("Ensure this field has no more than {limit} characters.")
}

fn max_digits_message(limit: u32) -> String {
    format!("Ensure that there are no more than {limit} digits in total.")
}

fn max_decimals_message(limit: u32) -> String {
    format!("Ensure that there are no more than {limit} decimal places.")
}

fn min_value_message(limit: i64) -> String {
    format!("Ensure this value is greater than or equal to {limit}.")
}

fn max_value_message(limit: i64) -> String {
    format!("Ensure this value is less than or equal to {limit}.")
}

/// A text field. Missing or `null` is an error only when `required`; a
/// present value must be a string that is non-blank after trimming and
/// within `max_length` characters when a limit is given.
pub fn string_field(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&Value>,
    required: bool,
    max_length: Option<usize>,
) -> Option<String> {
    let value = match value {
        None | Some(Value::Null) => {
            if required {
                errors.add(field, REQUIRED);
            }
            return None;
        }
        Some(value) => value,
    };

    let Value::String(raw) = value else {
        errors.add(field, NOT_A_STRING);
        return None;
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        errors.add(field, BLANK);
        return None;
    }

    if let Some(limit) = max_length
        && trimmed.chars().count() > limit
    {
        errors.add(field, max_length_message(limit));
        return None;
    }

    Some(trimmed.to_string())
}

/// A boolean field. Only JSON `true`/`false` are accepted; the stringly
/// coercions some clients hope for ("1", "yes") are deliberately not.
pub fn bool_field(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&Value>,
    required: bool,
) -> Option<bool> {
    match value {
        None | Some(Value::Null) => {
            if required {
                errors.add(field, REQUIRED);
            }
            None
        }
        Some(Value::Bool(flag)) => Some(*flag),
        Some(_) => {
            errors.add(field, NOT_A_BOOLEAN);
            None
        }
    }
}

/// An email field: string checks plus a shape check on the address itself.
pub fn email_field(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&Value>,
    required: bool,
) -> Option<String> {
    let email = string_field(errors, field, value, required, Some(EMAIL_MAX_LENGTH))?;
    if !is_valid_email(&email) {
        errors.add(field, INVALID_EMAIL);
        return None;
    }
    Some(email)
}

/// Shape check only: one `@`, a non-empty local part, a dotted domain and
/// no whitespace anywhere. Deliverability is not our problem.
#[must_use]
pub fn is_valid_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty() && !tld.is_empty()
}

/// A fixed-point money field. Accepts a JSON string or number, enforces the
/// digit budget, and normalizes the result to exactly two decimal places so
/// every stored and rendered price reads like "2500.00".
pub fn price_field(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&Value>,
    required: bool,
) -> Option<Decimal> {
    let raw = match value {
        None | Some(Value::Null) => {
            if required {
                errors.add(field, REQUIRED);
            }
            return None;
        }
        Some(Value::String(raw)) => raw.trim().to_string(),
        Some(Value::Number(number)) => number.to_string(),
        Some(_) => {
            errors.add(field, NOT_A_NUMBER);
            return None;
        }
    };

    let Ok(price) = Decimal::from_str(&raw) else {
        errors.add(field, NOT_A_NUMBER);
        return None;
    };

    if price.scale() > PRICE_DECIMAL_PLACES {
        errors.add(field, max_decimals_message(PRICE_DECIMAL_PLACES));
        return None;
    }

    // The budget counts every significant digit, integer and fractional
    // alike, with the fractional side padded to the declared scale.
    let digits = digit_count(&price).max(price.scale());
    if digits > PRICE_MAX_DIGITS {
        errors.add(field, max_digits_message(PRICE_MAX_DIGITS));
        return None;
    }

    let mut price = price;
    price.rescale(PRICE_DECIMAL_PLACES);
    Some(price)
}

fn digit_count(value: &Decimal) -> u32 {
    let mut mantissa = value.mantissa().unsigned_abs();
    let mut count = 1;
    while mantissa >= 10 {
        mantissa /= 10;
        count += 1;
    }
    count
}

/// A stock-count field: integral JSON numbers or integer strings, at least
/// one and within the signed 32-bit column.
pub fn quantity_field(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&Value>,
    required: bool,
) -> Option<i32> {
    let quantity = match value {
        None | Some(Value::Null) => {
            if required {
                errors.add(field, REQUIRED);
            }
            return None;
        }
        Some(Value::Number(number)) => {
            if let Some(quantity) = number.as_i64() {
                quantity
            } else {
                errors.add(field, NOT_AN_INTEGER);
                return None;
            }
        }
        Some(Value::String(raw)) => {
            if let Ok(quantity) = raw.trim().parse::<i64>() {
                quantity
            } else {
                errors.add(field, NOT_AN_INTEGER);
                return None;
            }
        }
        Some(_) => {
            errors.add(field, NOT_AN_INTEGER);
            return None;
        }
    };

    if quantity < QUANTITY_MIN {
        errors.add(field, min_value_message(QUANTITY_MIN));
        return None;
    }
    if quantity > QUANTITY_MAX {
        errors.add(field, max_value_message(QUANTITY_MAX));
        return None;
    }

    // In range for the column after the bound checks above.
    i32::try_from(quantity).ok()
}
