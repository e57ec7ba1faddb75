//! Field-level validation rules shared by the entity constructors.
//!
//! National identity numbers carry a trailing check digit computed with the
//! weighted modulo-11 scheme: the body digits are read from least significant
//! upwards, multiplied by weights cycling 2..=7, summed, and the check digit is
//! `11 - (sum mod 11)` with 11 written as `0` and 10 written as `k`.

use once_cell::sync::Lazy;
use regex::Regex;

/// One or more digits followed by a single digit or `k`/`K`.
static NATIONAL_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+[0-9kK]$").expect("valid national id pattern"));

/// Eight-digit fixed line number.
static LANDLINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{8}$").expect("valid landline pattern"));

/// Nine-digit mobile number starting with 9.
static MOBILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^9[0-9]{8}$").expect("valid mobile pattern"));

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[_a-z0-9-]+(\.[_a-z0-9-]+)*@[a-z0-9-]+(\.[a-z0-9-]+)*(\.[a-z]{2,4})$")
        .expect("valid email pattern")
});

/// Check a national identity number against its trailing check digit.
///
/// Returns `false` for anything not shaped like digits plus a final digit or
/// `k` (case-insensitive), and for well-shaped ids whose declared check digit
/// differs from the recomputed one. The empty string is never valid.
pub fn is_valid_id(id: &str) -> bool {
    if !NATIONAL_ID.is_match(id) {
        return false;
    }

    // The pattern guarantees ASCII, so byte slicing is safe.
    let (body, declared) = id.split_at(id.len() - 1);
    match check_digit(body) {
        Some(expected) => declared.eq_ignore_ascii_case(&expected.to_string()),
        None => false,
    }
}

/// Compute the check digit for the digits of `body`.
///
/// Returns `None` if `body` is empty or contains a non-digit.
pub fn check_digit(body: &str) -> Option<char> {
    if body.is_empty() {
        return None;
    }

    let mut sum: u32 = 0;
    for (position, c) in body.chars().rev().enumerate() {
        let digit = c.to_digit(10)?;
        let weight = 2 + (position % 6) as u32;
        sum = (sum + digit * weight) % 11;
    }

    Some(match 11 - sum {
        11 => '0',
        10 => 'k',
        n => char::from_digit(n, 10)?,
    })
}

/// Fixed line phone rule, checked on the decimal rendering of the number.
pub fn is_valid_landline(number: u32) -> bool {
    LANDLINE.is_match(&number.to_string())
}

/// Mobile phone rule, checked on the decimal rendering of the number.
pub fn is_valid_mobile(number: u32) -> bool {
    MOBILE.is_match(&number.to_string())
}

/// Lower-case e-mail address rule.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_valid_ids() {
        for id in [
            "152532873",
            "21195194k",
            "21195194K",
            "121244071",
            "198127949",
            "202294316",
        ] {
            assert!(is_valid_id(id), "{} should be valid", id);
        }
    }

    #[test]
    fn test_known_invalid_ids() {
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("1525a2873"));
        assert!(!is_valid_id("15253287k"));
        assert!(!is_valid_id("15253287K"));
        assert!(!is_valid_id("15253287-"));
        assert!(!is_valid_id("3"));
        assert!(!is_valid_id("15.253.287-3"));
    }

    #[test]
    fn test_check_digit_wraps_to_zero_and_k() {
        assert_eq!(check_digit("15253287"), Some('3'));
        assert_eq!(check_digit("21195194"), Some('k'));
        // 6 * 2 = 12, 12 mod 11 = 1, 11 - 1 = 10
        assert_eq!(check_digit("6"), Some('k'));
        // 11 - 0 = 11
        assert_eq!(check_digit("0"), Some('0'));
        assert_eq!(check_digit(""), None);
        assert_eq!(check_digit("12a"), None);
    }

    #[test]
    fn test_phone_rules() {
        assert!(is_valid_landline(55221234));
        assert!(!is_valid_landline(5522123));
        assert!(!is_valid_landline(552212345));

        assert!(is_valid_mobile(912345678));
        assert!(!is_valid_mobile(812345678));
        assert!(!is_valid_mobile(91234567));
    }

    #[test]
    fn test_email_rule() {
        assert!(is_valid_email("andrea.contreras@gmail.com"));
        assert!(is_valid_email("blopez@hotmail.com"));
        assert!(is_valid_email("vet_01@clinica.ucn.cl"));
        assert!(!is_valid_email("Andrea@gmail.com"));
        assert!(!is_valid_email("andrea.gmail.com"));
        assert!(!is_valid_email("andrea@gmail"));
        assert!(!is_valid_email(""));
    }

    proptest! {
        #[test]
        fn prop_computed_digit_always_validates(body in "[1-9][0-9]{0,11}") {
            let digit = check_digit(&body).unwrap();
            let id = format!("{}{}", body, digit);
            prop_assert!(is_valid_id(&id));
            prop_assert!(is_valid_id(&id.to_uppercase()));
        }

        #[test]
        fn prop_any_other_digit_is_rejected(body in "[1-9][0-9]{0,11}", declared in "[0-9k]") {
            let expected = check_digit(&body).unwrap();
            let id = format!("{}{}", body, declared);
            prop_assert_eq!(is_valid_id(&id), declared == expected.to_string());
        }
    }
}
