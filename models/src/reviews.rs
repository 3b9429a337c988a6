use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::FieldError;
use crate::{validation, AppointmentDetail, Entity};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub appointment_id: u64,
    #[serde(default = "default_rating")]
    pub rating: i32,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn default_rating() -> i32 {
    5
}

impl Default for Review {
    fn default() -> Self {
        Self {
            id: 0,
            appointment_id: 0,
            rating: default_rating(),
            notes: None,
            created_at: Utc::now(),
        }
    }
}

impl Entity for Review {
    const TREE: &'static str = "reviews";
    const NAME: &'static str = "review";

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        validation::reference(&mut errors, "appointment_id", self.appointment_id);
        validation::range_i32(&mut errors, "rating", self.rating, 1, 5);
        validation::optional(&mut errors, "notes", &self.notes, 800);
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// A review with its owning appointment resolved for display.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewDetail {
    pub review: Review,
    pub appointment: AppointmentDetail,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_to_a_five_star_rating() {
        assert_eq!(Review::default().rating, 5);
    }

    #[test]
    fn should_require_an_appointment() {
        let errors = Review::default().validate().unwrap_err();
        assert_eq!(errors[0].field, "appointment_id");
    }

    #[test]
    fn should_reject_rating_out_of_range() {
        for rating in [0, 6] {
            let review = Review {
                appointment_id: 1,
                rating,
                ..Default::default()
            };
            let errors = review.validate().unwrap_err();
            assert_eq!(errors[0].field, "rating");
        }
    }

    #[test]
    fn should_accept_every_rating_in_range() {
        for rating in 1..=5 {
            let review = Review {
                appointment_id: 1,
                rating,
                ..Default::default()
            };
            assert!(review.validate().is_ok());
        }
    }

    #[test]
    fn should_reject_overlong_notes() {
        let review = Review {
            appointment_id: 1,
            notes: Some("x".repeat(801)),
            ..Default::default()
        };
        assert!(review.validate().is_err());
    }
}
