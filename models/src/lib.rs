pub mod appointments;
pub mod doctors;
pub mod errors;
pub mod patients;
pub mod reviews;
pub mod treatments;
pub mod validation;

pub use appointments::{Appointment, AppointmentDetail};
pub use doctors::Doctor;
pub use errors::{ClinicError, ClinicResult, FieldError};
pub use patients::Patient;
pub use reviews::{Review, ReviewDetail};
pub use treatments::Treatment;

use serde::{de::DeserializeOwned, Serialize};

/// A persisted clinic record. Implementations tie a struct to its storage
/// tree and expose the surrogate key the store assigns at creation.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Name of the tree holding this entity's rows.
    const TREE: &'static str;
    /// Lowercase display name used in errors and logs.
    const NAME: &'static str;

    fn id(&self) -> u64;
    fn set_id(&mut self, id: u64);

    /// Checks the field constraints, collecting every violation.
    fn validate(&self) -> Result<(), Vec<FieldError>>;
}
