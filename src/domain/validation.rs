//! Client-side field validators.
//!
//! Every function here is pure and total: no I/O, no clock reads except the
//! explicit `today` helpers. Uniqueness checks (usernames) belong to the
//! boundary and are not attempted here.

use std::fmt;

use thiserror::Error;
use time::{Date, OffsetDateTime};

pub const ADULT_AGE: i32 = 18;
pub const MIN_USERNAME_CHARS: usize = 3;
pub const MAX_USERNAME_CHARS: usize = 20;
pub const MIN_PASSWORD_CHARS: usize = 8;
pub const MIN_PHONE_CHARS: usize = 10;
pub const PASSWORD_SYMBOLS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Current calendar day in UTC.
pub fn today_utc() -> Date {
    OffsetDateTime::now_utc().date()
}

/// Whole years between `date_of_birth` and `today`.
///
/// The birthday itself counts: someone born on 2006-06-15 is 18 on 2024-06-15.
pub fn age_on(date_of_birth: Date, today: Date) -> i32 {
    let mut age = today.year() - date_of_birth.year();
    let (today_md, birth_md) = (
        (u8::from(today.month()), today.day()),
        (u8::from(date_of_birth.month()), date_of_birth.day()),
    );
    if today_md < birth_md {
        age -= 1;
    }
    age
}

pub fn is_over_18_on(date_of_birth: Date, today: Date) -> bool {
    age_on(date_of_birth, today) >= ADULT_AGE
}

pub fn is_over_18(date_of_birth: Date) -> bool {
    is_over_18_on(date_of_birth, today_utc())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UsernameError {
    #[error("Username must be at least 3 characters")]
    TooShort,
    #[error("Username must be at most 20 characters")]
    TooLong,
    #[error("Username can only contain letters, numbers, and underscores")]
    InvalidCharacters,
}

/// Check length (3..=20) and charset (`[A-Za-z0-9_]`), reporting the first failure.
pub fn validate_username(username: &str) -> Result<(), UsernameError> {
    let length = username.chars().count();
    if length < MIN_USERNAME_CHARS {
        return Err(UsernameError::TooShort);
    }
    if length > MAX_USERNAME_CHARS {
        return Err(UsernameError::TooLong);
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(UsernameError::InvalidCharacters);
    }
    Ok(())
}

/// Best-effort `local@domain.tld` shape check.
pub fn validate_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(index, c)| c == '.' && index > 0 && index + 1 < domain.len())
}

/// Phone numbers are optional; when given they must have at least 10 characters.
pub fn validate_phone(phone: &str) -> bool {
    phone.trim().chars().count() >= MIN_PHONE_CHARS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PasswordRule {
    MinLength,
    Digit,
    Symbol,
}

impl PasswordRule {
    pub fn message(self) -> &'static str {
        match self {
            PasswordRule::MinLength => "At least 8 characters",
            PasswordRule::Digit => "At least 1 number",
            PasswordRule::Symbol => "At least 1 special character",
        }
    }
}

impl fmt::Display for PasswordRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Every unmet password rule, in rule order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PasswordCheck {
    pub errors: Vec<PasswordRule>,
}

impl PasswordCheck {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

pub fn validate_password(password: &str) -> PasswordCheck {
    let mut errors = Vec::new();

    if password.chars().count() < MIN_PASSWORD_CHARS {
        errors.push(PasswordRule::MinLength);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push(PasswordRule::Digit);
    }
    if !password.chars().any(|c| PASSWORD_SYMBOLS.contains(c)) {
        errors.push(PasswordRule::Symbol);
    }

    PasswordCheck { errors }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    #[test]
    fn birthday_today_counts_as_turned() {
        let born = date!(2006 - 06 - 15);
        assert!(!is_over_18_on(born, date!(2024 - 06 - 14)));
        assert!(is_over_18_on(born, date!(2024 - 06 - 15)));
        assert_eq!(age_on(born, date!(2024 - 06 - 15)), 18);
    }

    #[test]
    fn earlier_month_does_not_count() {
        let born = date!(2000 - 12 - 01);
        assert_eq!(age_on(born, date!(2018 - 11 - 30)), 17);
        assert_eq!(age_on(born, date!(2018 - 12 - 01)), 18);
        assert_eq!(age_on(born, date!(2019 - 01 - 01)), 18);
    }

    #[test]
    fn leap_day_birthday_turns_on_march_first() {
        let born = date!(2004 - 02 - 29);
        assert_eq!(age_on(born, date!(2022 - 02 - 28)), 17);
        assert_eq!(age_on(born, date!(2022 - 03 - 01)), 18);
    }

    #[test]
    fn username_rules() {
        assert_eq!(validate_username("ab"), Err(UsernameError::TooShort));
        assert_eq!(validate_username("cool_user_1"), Ok(()));
        assert_eq!(
            validate_username("bad name!"),
            Err(UsernameError::InvalidCharacters)
        );
        assert_eq!(
            validate_username("a_very_long_username_x"),
            Err(UsernameError::TooLong)
        );
        assert_eq!(validate_username("abc"), Ok(()));
        assert_eq!(validate_username(&"a".repeat(20)), Ok(()));
    }

    #[test]
    fn email_shape() {
        assert!(validate_email("slap@feel.fun"));
        assert!(validate_email("a.b@c.d.e"));
        assert!(!validate_email("no-at-sign.com"));
        assert!(!validate_email("@feel.fun"));
        assert!(!validate_email("slap@feelfun"));
        assert!(!validate_email("slap@.fun"));
        assert!(!validate_email("slap@feel."));
        assert!(!validate_email("sl ap@feel.fun"));
        assert!(!validate_email("a@b@c.d"));
    }

    #[test]
    fn password_reports_every_unmet_rule() {
        assert_eq!(
            validate_password("abc").errors,
            vec![
                PasswordRule::MinLength,
                PasswordRule::Digit,
                PasswordRule::Symbol
            ]
        );
        assert_eq!(
            validate_password("abcdefg1").errors,
            vec![PasswordRule::Symbol]
        );
        assert!(validate_password("abcdefg1!").is_valid());
    }

    #[test]
    fn phone_needs_ten_characters() {
        assert!(!validate_phone("555-1234"));
        assert!(validate_phone("555-123-4567"));
    }
}
