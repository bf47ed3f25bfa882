//! Work history step. An empty history is acceptable; entries that exist
//! must be complete.

use serde::{Deserialize, Serialize};

use super::{sorted, FieldError, StepValidator, ValidationContext};
use crate::types::Date;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkHistoryEntry {
    pub company_name: String,
    pub role: String,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub is_current: bool,
    pub responsibilities: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkHistoryData {
    #[serde(default)]
    pub entries: Vec<WorkHistoryEntry>,
}

impl WorkHistoryEntry {
    fn collect_errors(&self, index: usize, out: &mut Vec<FieldError>) {
        let prefix = format!("entries[{index}].");
        if self.company_name.trim().is_empty() {
            out.push(FieldError::new(
                format!("{prefix}company_name"),
                "Company is required",
            ));
        }
        if self.role.trim().is_empty() {
            out.push(FieldError::new(format!("{prefix}role"), "Role is required"));
        }
        if self.start_date.is_none() {
            out.push(FieldError::new(
                format!("{prefix}start_date"),
                "Start date is required",
            ));
        }
        // End date only matters for jobs the worker has left.
        if !self.is_current && self.end_date.is_none() {
            out.push(FieldError::new(
                format!("{prefix}end_date"),
                "End date is required unless this is your current job",
            ));
        }
        if let (false, Some(start), Some(end)) = (self.is_current, self.start_date, self.end_date) {
            if end < start {
                out.push(FieldError::new(
                    format!("{prefix}end_date"),
                    "End date cannot be before the start date",
                ));
            }
        }
    }
}

impl StepValidator for WorkHistoryData {
    fn validate(&self, _ctx: &ValidationContext) -> Vec<FieldError> {
        let mut errors = Vec::new();
        for (i, entry) in self.entries.iter().enumerate() {
            entry.collect_errors(i, &mut errors);
        }
        sorted(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::fixtures::ctx;

    fn entry(is_current: bool, end_date: Option<Date>) -> WorkHistoryEntry {
        WorkHistoryEntry {
            company_name: "Gulf Builders".into(),
            role: "Mason".into(),
            start_date: Date::from_ymd_opt(2019, 4, 1),
            end_date,
            is_current,
            responsibilities: None,
        }
    }

    #[test]
    fn empty_history_never_blocks() {
        assert!(WorkHistoryData::default().is_valid(&ctx()));
    }

    #[test]
    fn current_job_needs_no_end_date() {
        let data = WorkHistoryData {
            entries: vec![entry(true, None)],
        };
        assert!(data.is_valid(&ctx()));
    }

    #[test]
    fn past_job_needs_an_end_date() {
        let data = WorkHistoryData {
            entries: vec![entry(false, None)],
        };
        let errors = data.validate(&ctx());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "entries[0].end_date");

        let data = WorkHistoryData {
            entries: vec![entry(false, Date::from_ymd_opt(2022, 1, 31))],
        };
        assert!(data.is_valid(&ctx()));
    }

    #[test]
    fn end_date_before_start_is_rejected() {
        let data = WorkHistoryData {
            entries: vec![entry(false, Date::from_ymd_opt(2018, 12, 31))],
        };
        let errors = data.validate(&ctx());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "entries[0].end_date");

        // Same-day start and end is a valid (short) job.
        let data = WorkHistoryData {
            entries: vec![entry(false, Date::from_ymd_opt(2019, 4, 1))],
        };
        assert!(data.is_valid(&ctx()));
    }

    #[test]
    fn blank_entry_reports_each_required_field() {
        let data = WorkHistoryData {
            entries: vec![WorkHistoryEntry::default()],
        };
        let fields: Vec<_> = data
            .validate(&ctx())
            .into_iter()
            .map(|e| e.field)
            .collect();
        assert_eq!(
            fields,
            vec![
                "entries[0].company_name",
                "entries[0].end_date",
                "entries[0].role",
                "entries[0].start_date",
            ]
        );
    }
}
