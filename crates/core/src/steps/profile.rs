//! Profile step: identity and contact details.

use std::sync::LazyLock;

use chrono::Datelike;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{collect_derive_errors, sorted, FieldError, StepValidator, ValidationContext};
use crate::types::Date;

/// Minimum age, in whole years, for a worker to onboard.
pub const MIN_WORKER_AGE: i32 = 18;

/// E.164: a `+`, then 1-14 digits, the first of which is non-zero.
static E164_PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[1-9][0-9]{0,13}$").expect("valid regex"));

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, validator::Validate)]
#[serde(default)]
pub struct ProfileData {
    #[validate(length(min = 2, message = "Full name must be at least 2 characters"))]
    pub full_name: String,
    pub date_of_birth: Option<Date>,
    pub gender: Option<String>,
    pub phone: String,
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    /// Storage key of the uploaded photo; never a public URL.
    pub profile_photo_key: Option<String>,
}

/// Age in whole years on `today`, counting a birthday only once it has
/// passed in the current year.
pub fn age_on(date_of_birth: Date, today: Date) -> i32 {
    let mut age = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age
}

/// Whether `phone` is an E.164 number.
pub fn is_e164(phone: &str) -> bool {
    E164_PHONE.is_match(phone)
}

impl StepValidator for ProfileData {
    fn validate(&self, ctx: &ValidationContext) -> Vec<FieldError> {
        let mut errors = Vec::new();
        collect_derive_errors("", validator::Validate::validate(self), &mut errors);

        // The derive counts raw characters; surrounding whitespace does not
        // make a name.
        if self.full_name.trim().chars().count() < 2
            && !errors.iter().any(|e| e.field == "full_name")
        {
            errors.push(FieldError::new(
                "full_name",
                "Full name must be at least 2 characters",
            ));
        }

        match self.date_of_birth {
            None => errors.push(FieldError::new("date_of_birth", "Date of birth is required")),
            Some(dob) if age_on(dob, ctx.today) < MIN_WORKER_AGE => errors.push(FieldError::new(
                "date_of_birth",
                format!("Worker must be at least {MIN_WORKER_AGE} years old"),
            )),
            Some(_) => {}
        }

        if !is_e164(&self.phone) {
            errors.push(FieldError::new(
                "phone",
                "Phone must be in international format, e.g. +14155552671",
            ));
        }

        sorted(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::fixtures::{ctx, profile, today};

    fn fields(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn complete_profile_is_valid() {
        assert!(profile().is_valid(&ctx()));
    }

    #[test]
    fn short_name_is_rejected() {
        let mut p = profile();
        p.full_name = "J".into();
        assert_eq!(fields(&p.validate(&ctx())), vec!["full_name"]);
    }

    #[test]
    fn whitespace_padded_single_letter_is_rejected() {
        let mut p = profile();
        p.full_name = " J ".into();
        assert_eq!(fields(&p.validate(&ctx())), vec!["full_name"]);
    }

    #[test]
    fn missing_date_of_birth_is_rejected() {
        let mut p = profile();
        p.date_of_birth = None;
        assert_eq!(fields(&p.validate(&ctx())), vec!["date_of_birth"]);
    }

    #[test]
    fn under_eighteen_is_rejected() {
        let mut p = profile();
        p.date_of_birth = Date::from_ymd_opt(2010, 1, 1);
        assert_eq!(fields(&p.validate(&ctx())), vec!["date_of_birth"]);
    }

    #[test]
    fn age_counts_the_birthday_only_once_passed() {
        let dob = Date::from_ymd_opt(2008, 6, 16).unwrap();
        assert_eq!(age_on(dob, today()), 17);
        let dob = Date::from_ymd_opt(2008, 6, 15).unwrap();
        assert_eq!(age_on(dob, today()), 18);
    }

    #[test]
    fn phone_must_be_e164() {
        assert!(is_e164("+14155552671"));
        assert!(is_e164("+1"));
        assert!(is_e164("+12345678901234"));
        assert!(!is_e164("+123456789012345"));
        assert!(!is_e164("+0123"));
        assert!(!is_e164("14155552671"));
        assert!(!is_e164("+1 415 555 2671"));
        assert!(!is_e164(""));
    }

    #[test]
    fn bad_email_is_rejected() {
        let mut p = profile();
        p.email = "not-an-email".into();
        assert_eq!(fields(&p.validate(&ctx())), vec!["email"]);
    }

    #[test]
    fn empty_profile_reports_every_field() {
        let errors = ProfileData::default().validate(&ctx());
        let f = fields(&errors);
        for field in ["date_of_birth", "email", "full_name", "phone"] {
            assert!(f.contains(&field), "missing {field} in {f:?}");
        }
    }
}
