pub mod accounts;
pub mod clinic_store;
pub mod collection;

pub use accounts::{Account, AccountStorage, SledAccountStorage};
pub use clinic_store::ClinicStore;
pub use collection::{Collection, Stored};
