//! One-time passcodes

use rand::Rng;

use crate::mailer::Email;

/// Generate a 6-digit numeric code
pub fn generate_otp() -> String {
    rand::rng().random_range(100_000..=999_999u32).to_string()
}

/// Why a code was requested. Only changes the email wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpPurpose {
    Signup,
    Login,
}

impl OtpPurpose {
    fn label(self) -> &'static str {
        match self {
            OtpPurpose::Signup => "signup",
            OtpPurpose::Login => "login",
        }
    }

    /// Build the email carrying `otp`
    pub fn email(self, to: &str, otp: &str, lifetime_secs: u64) -> Email {
        let subject = match self {
            OtpPurpose::Signup => "Your OTP for Signup",
            OtpPurpose::Login => "Your OTP for Login",
        };
        Email {
            to: to.to_string(),
            subject: subject.to_string(),
            body: format!(
                "Your OTP for {} is {}. It is valid for {} minutes.",
                self.label(),
                otp,
                lifetime_secs / 60
            ),
        }
    }
}

impl std::fmt::Display for OtpPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
