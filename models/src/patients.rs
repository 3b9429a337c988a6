use chrono::{Local, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::FieldError;
use crate::{validation, Entity};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    #[serde(default)]
    pub id: u64,
    pub full_name: String,
    pub birth_date: NaiveDate,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Default for Patient {
    fn default() -> Self {
        let today = Local::now().date_naive();
        Self {
            id: 0,
            full_name: String::new(),
            // form skeleton default: an adult patient
            birth_date: today.checked_sub_months(Months::new(216)).unwrap_or(today),
            phone: None,
            email: None,
        }
    }
}

impl Entity for Patient {
    const TREE: &'static str = "patients";
    const NAME: &'static str = "patient";

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        validation::required(&mut errors, "full_name", &self.full_name, 100);
        validation::phone(&mut errors, "phone", &self.phone, 30);
        validation::email(&mut errors, "email", &self.email, 120);
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_accept_a_valid_patient() {
        let patient = Patient {
            full_name: "Titus Marin".to_string(),
            birth_date: NaiveDate::from_ymd_opt(2006, 1, 4).expect("valid date"),
            phone: Some("0722 000 111".to_string()),
            email: Some("titus@example.com".to_string()),
            ..Default::default()
        };
        assert!(patient.validate().is_ok());
    }

    #[test]
    fn should_require_full_name() {
        let errors = Patient::default().validate().unwrap_err();
        assert_eq!(errors[0].field, "full_name");
    }

    #[test]
    fn should_reject_malformed_contact_details() {
        let patient = Patient {
            full_name: "Maria Dumitru".to_string(),
            phone: Some("none".to_string()),
            email: Some("maria".to_string()),
            ..Default::default()
        };
        let errors = patient.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
