//! Time-off request payload
//!
//! The chat integration collects these values from a submitted dialog and
//! hands them to the filler; the filler itself matches any field name.

use crate::pdf::ValueMap;

/// Field names on the time-off request form
pub const EMPLOYEE_NAME: &str = "employee_name";
pub const EMPLOYEE_SIGNATURE: &str = "employee_signature";
pub const REQUESTED_DATES: &str = "requested_dates";
pub const MANAGER_NAME: &str = "manager_name";
pub const MANAGER_APPROVAL: &str = "manager_approval";

/// Values submitted for one time-off request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeOffRequest {
    pub employee_name: Option<String>,
    /// Free text acting as a signature (e.g. `~~Dolores`)
    pub employee_signature: Option<String>,
    /// Requested dates as entered (e.g. `August 17th - September 10th`)
    pub requested_dates: Option<String>,
    pub manager_name: Option<String>,
    pub manager_approval: Option<String>,
}

impl TimeOffRequest {
    /// Map the request onto the form's field names
    pub fn to_value_map(&self) -> ValueMap {
        [
            (EMPLOYEE_NAME, &self.employee_name),
            (EMPLOYEE_SIGNATURE, &self.employee_signature),
            (REQUESTED_DATES, &self.requested_dates),
            (MANAGER_NAME, &self.manager_name),
            (MANAGER_APPROVAL, &self.manager_approval),
        ]
        .into_iter()
        .map(|(name, value)| (name, value.clone()))
        .collect()
    }

    /// Filename for uploading the finished form
    pub fn upload_filename(&self) -> String {
        match self.employee_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => format!("Time off request for {}.pdf", name),
            _ => "Time off request.pdf".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_value_map_uses_form_field_names() {
        let request = TimeOffRequest {
            employee_name: Some("Christopher Dignam".to_string()),
            employee_signature: Some("~~Chris".to_string()),
            requested_dates: Some("2019-07-23".to_string()),
            manager_name: Some("Brad".to_string()),
            manager_approval: Some("**Brad".to_string()),
        };
        let values = request.to_value_map();

        assert_eq!(values.len(), 5);
        assert_eq!(values.display_value(EMPLOYEE_NAME), Some("Christopher Dignam"));
        assert_eq!(values.display_value(EMPLOYEE_SIGNATURE), Some("~~Chris"));
        assert_eq!(values.display_value(REQUESTED_DATES), Some("2019-07-23"));
        assert_eq!(values.display_value(MANAGER_NAME), Some("Brad"));
        assert_eq!(values.display_value(MANAGER_APPROVAL), Some("**Brad"));
    }

    #[test]
    fn test_missing_values_are_not_displayed() {
        let request = TimeOffRequest {
            employee_name: Some("Dolores Abernathy".to_string()),
            ..Default::default()
        };
        let values = request.to_value_map();
        assert_eq!(values.display_value(MANAGER_NAME), None);
    }

    #[test]
    fn test_upload_filename() {
        let request = TimeOffRequest {
            employee_name: Some("Dolores Abernathy".to_string()),
            ..Default::default()
        };
        assert_eq!(request.upload_filename(), "Time off request for Dolores Abernathy.pdf");
        assert_eq!(TimeOffRequest::default().upload_filename(), "Time off request.pdf");
    }
}
