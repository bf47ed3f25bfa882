//! Preferences step: destination, wage expectations, and availability.

use serde::{Deserialize, Serialize};

use super::{sorted, FieldError, StepValidator, ValidationContext};
use crate::types::Date;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferencesData {
    pub preferred_countries: Vec<String>,
    pub expected_wage_currency: String,
    pub expected_wage_amount: f64,
    /// Free-form contract length option chosen in the form (e.g. `"24_months"`).
    pub contract_length: Option<String>,
    pub availability_date: Option<Date>,
}

impl StepValidator for PreferencesData {
    fn validate(&self, ctx: &ValidationContext) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if !self
            .preferred_countries
            .iter()
            .any(|c| !c.trim().is_empty())
        {
            errors.push(FieldError::new(
                "preferred_countries",
                "Select at least one country",
            ));
        }
        if self.expected_wage_currency.trim().is_empty() {
            errors.push(FieldError::new(
                "expected_wage_currency",
                "Currency is required",
            ));
        }
        // `!(x > 0)` also rejects NaN.
        if !(self.expected_wage_amount > 0.0) {
            errors.push(FieldError::new(
                "expected_wage_amount",
                "Expected wage must be greater than zero",
            ));
        }
        if self
            .contract_length
            .as_deref()
            .map_or(true, |c| c.trim().is_empty())
        {
            errors.push(FieldError::new(
                "contract_length",
                "Select a contract length",
            ));
        }
        match self.availability_date {
            None => errors.push(FieldError::new(
                "availability_date",
                "Availability date is required",
            )),
            Some(date) if date < ctx.today => errors.push(FieldError::new(
                "availability_date",
                "Availability date cannot be in the past",
            )),
            Some(_) => {}
        }

        sorted(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::fixtures::{ctx, today};

    fn prefs() -> PreferencesData {
        PreferencesData {
            preferred_countries: vec!["AE".into(), "QA".into()],
            expected_wage_currency: "AED".into(),
            expected_wage_amount: 2500.0,
            contract_length: Some("24_months".into()),
            availability_date: Some(today()),
        }
    }

    #[test]
    fn availability_today_is_valid() {
        assert!(prefs().is_valid(&ctx()));
    }

    #[test]
    fn availability_yesterday_is_invalid() {
        let mut p = prefs();
        p.availability_date = today().pred_opt();
        let errors = p.validate(&ctx());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "availability_date");
    }

    #[test]
    fn wage_must_be_positive() {
        let mut p = prefs();
        p.expected_wage_amount = 0.0;
        assert!(!p.is_valid(&ctx()));
        p.expected_wage_amount = f64::NAN;
        assert!(!p.is_valid(&ctx()));
        p.expected_wage_amount = 0.01;
        assert!(p.is_valid(&ctx()));
    }

    #[test]
    fn needs_country_currency_and_contract() {
        let mut p = prefs();
        p.preferred_countries = vec!["  ".into()];
        p.expected_wage_currency.clear();
        p.contract_length = None;
        let fields: Vec<_> = p.validate(&ctx()).into_iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["contract_length", "expected_wage_currency", "preferred_countries"]
        );
    }
}
