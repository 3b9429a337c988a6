// rest_api/src/seed.rs

use anyhow::Result;
use chrono::{Days, Local, NaiveDate, NaiveTime};
use tracing::info;

use models::{Appointment, Doctor, Patient, Treatment};
use storage::{Account, AccountStorage, ClinicStore};

const ADMIN_USERNAME: &str = "admin@clinic.local";
const ADMIN_PASSWORD: &str = "Admin123!";

/// Seeds the identity store and demo domain data on first start.
pub async fn run(store: &ClinicStore, accounts: &dyn AccountStorage) -> Result<()> {
    if accounts.get_account(ADMIN_USERNAME).await?.is_none() {
        let account = Account {
            username: ADMIN_USERNAME.to_string(),
            password_hash: security::hash_password(ADMIN_PASSWORD)?,
            roles: vec!["Admin".to_string()],
        };
        accounts.put_account(&account).await?;
        info!("seeded default admin account");
    }

    if store.doctors.list().await?.is_empty() {
        store
            .doctors
            .insert(Doctor {
                full_name: "Dr. Alexandra Popescu".to_string(),
                specialty: "Dental surgery".to_string(),
                phone: Some("0719 890 068".to_string()),
                email: Some("alexandra@clinic.local".to_string()),
                ..Default::default()
            })
            .await?;
        store
            .doctors
            .insert(Doctor {
                full_name: "Dr. Cristian Ionescu".to_string(),
                specialty: "Orthodontics".to_string(),
                phone: Some("0790 678 971".to_string()),
                email: Some("cristian@clinic.local".to_string()),
                ..Default::default()
            })
            .await?;
    }

    if store.patients.list().await?.is_empty() {
        store
            .patients
            .insert(Patient {
                full_name: "Titus Marin".to_string(),
                birth_date: NaiveDate::from_ymd_opt(2006, 1, 4).expect("valid date"),
                phone: Some("0722 000 111".to_string()),
                email: Some("titus@example.com".to_string()),
                ..Default::default()
            })
            .await?;
        store
            .patients
            .insert(Patient {
                full_name: "Maria Dumitru".to_string(),
                birth_date: NaiveDate::from_ymd_opt(1998, 10, 12).expect("valid date"),
                phone: Some("0733 222 333".to_string()),
                email: Some("maria@example.com".to_string()),
                ..Default::default()
            })
            .await?;
    }

    if store.treatments.list().await?.is_empty() {
        store
            .treatments
            .insert(Treatment {
                name: "Consultation".to_string(),
                price: 100.0,
                duration_minutes: 30,
                description: Some("Initial consultation.".to_string()),
                ..Default::default()
            })
            .await?;
        store
            .treatments
            .insert(Treatment {
                name: "Scaling".to_string(),
                price: 250.0,
                duration_minutes: 45,
                description: Some("Professional cleaning.".to_string()),
                ..Default::default()
            })
            .await?;
        store
            .treatments
            .insert(Treatment {
                name: "Filling".to_string(),
                price: 350.0,
                duration_minutes: 60,
                description: Some("Cavity treatment.".to_string()),
                ..Default::default()
            })
            .await?;
    }

    if store.appointments.list().await?.is_empty() {
        let patients = store.patients.list().await?;
        let doctors = store.doctors.list().await?;
        let treatments = store.treatments.list().await?;

        if let (Some(patient), Some(doctor), Some(treatment)) =
            (patients.first(), doctors.first(), treatments.first())
        {
            let today = Local::now().date_naive();
            store
                .insert_appointment(Appointment {
                    patient_id: patient.record.id,
                    doctor_id: doctor.record.id,
                    treatment_id: treatment.record.id,
                    date: today.checked_add_days(Days::new(2)).unwrap_or(today),
                    time: NaiveTime::from_hms_opt(10, 0, 0).expect("valid time"),
                    notes: Some("Demo booking".to_string()),
                    ..Default::default()
                })
                .await?;
            info!("seeded demo appointment");
        }
    }

    Ok(())
}
