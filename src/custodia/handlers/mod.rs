pub mod health;
pub use self::health::health;

pub mod user_login;
pub use self::user_login::login;

pub mod user_password;
pub use self::user_password::change_password;

pub mod user_register;
pub use self::user_register::register;

pub const PASSWORD_MIN_CHARS: usize = 6;
pub const PASSWORD_MAX_CHARS: usize = 32;

use regex::Regex;

/// Normalize an email for lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Length bounds for new passwords, counted in characters.
pub fn valid_password(password: &str) -> bool {
    (PASSWORD_MIN_CHARS..=PASSWORD_MAX_CHARS).contains(&password.chars().count())
}
