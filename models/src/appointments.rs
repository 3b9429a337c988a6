use chrono::{Days, Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::errors::FieldError;
use crate::{validation, Doctor, Entity, Patient, Review, Treatment};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub patient_id: u64,
    #[serde(default)]
    pub doctor_id: u64,
    #[serde(default)]
    pub treatment_id: u64,
    #[serde(default = "default_date")]
    pub date: NaiveDate,
    #[serde(default = "default_time")]
    pub time: NaiveTime,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

fn default_date() -> NaiveDate {
    let today = Local::now().date_naive();
    today.checked_add_days(Days::new(1)).unwrap_or(today)
}

fn default_time() -> NaiveTime {
    NaiveTime::from_hms_opt(10, 0, 0).expect("valid time")
}

impl Default for Appointment {
    fn default() -> Self {
        Self {
            id: 0,
            patient_id: 0,
            doctor_id: 0,
            treatment_id: 0,
            date: default_date(),
            time: default_time(),
            notes: None,
            completed: false,
        }
    }
}

impl Entity for Appointment {
    const TREE: &'static str = "appointments";
    const NAME: &'static str = "appointment";

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        validation::reference(&mut errors, "patient_id", self.patient_id);
        validation::reference(&mut errors, "doctor_id", self.doctor_id);
        validation::reference(&mut errors, "treatment_id", self.treatment_id);
        validation::optional(&mut errors, "notes", &self.notes, 500);
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// An appointment with its related rows resolved for display.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentDetail {
    pub appointment: Appointment,
    pub patient: Patient,
    pub doctor: Doctor,
    pub treatment: Treatment,
    pub review: Option<Review>,
}
