use serde::{Deserialize, Serialize};

use crate::errors::FieldError;
use crate::{validation, Entity};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Treatment {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default = "default_duration")]
    pub duration_minutes: i32,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_duration() -> i32 {
    30
}

impl Default for Treatment {
    fn default() -> Self {
        Self {
            id: 0,
            name: String::new(),
            price: 0.0,
            duration_minutes: default_duration(),
            description: None,
        }
    }
}

impl Entity for Treatment {
    const TREE: &'static str = "treatments";
    const NAME: &'static str = "treatment";

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        validation::required(&mut errors, "name", &self.name, 120);
        validation::range_f64(&mut errors, "price", self.price, 0.0, 100_000.0);
        validation::range_i32(&mut errors, "duration_minutes", self.duration_minutes, 5, 600);
        validation::optional(&mut errors, "description", &self.description, 400);
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}
