use serde::{Deserialize, Serialize};

use crate::errors::FieldError;
use crate::{validation, Entity};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    #[serde(default)]
    pub id: u64,
    pub full_name: String,
    pub specialty: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Entity for Doctor {
    const TREE: &'static str = "doctors";
    const NAME: &'static str = "doctor";

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        validation::required(&mut errors, "full_name", &self.full_name, 100);
        validation::required(&mut errors, "specialty", &self.specialty, 80);
        validation::phone(&mut errors, "phone", &self.phone, 30);
        validation::email(&mut errors, "email", &self.email, 120);
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}
