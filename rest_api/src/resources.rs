// rest_api/src/resources.rs

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use models::errors::{ClinicError, ClinicResult};
use models::{Appointment, AppointmentDetail, Doctor, Patient, Review, ReviewDetail, Treatment};
use storage::{ClinicStore, Stored};

use crate::crud::CrudResource;

/// id + display-label pair for a relationship picker.
#[derive(Debug, Serialize)]
pub struct RefItem {
    pub id: u64,
    pub label: String,
}

pub struct Doctors;
pub struct Patients;
pub struct Treatments;
pub struct Appointments;
pub struct Reviews;

#[async_trait]
impl CrudResource for Doctors {
    type Entity = Doctor;
    type View = Doctor;

    const LIST_PATH: &'static str = "/api/v1/doctors";

    async fn list(store: &ClinicStore) -> ClinicResult<Vec<Doctor>> {
        Ok(store.doctors.list().await?.into_iter().map(|s| s.record).collect())
    }

    async fn find(store: &ClinicStore, id: u64) -> ClinicResult<Option<Doctor>> {
        Ok(store.doctors.get(id).await?.map(|s| s.record))
    }

    async fn fetch(store: &ClinicStore, id: u64) -> ClinicResult<Option<Stored<Doctor>>> {
        store.doctors.get(id).await
    }

    async fn insert(store: &ClinicStore, record: Doctor) -> ClinicResult<Doctor> {
        store.doctors.insert(record).await
    }

    async fn update(store: &ClinicStore, expected_version: u64, record: Doctor) -> ClinicResult<()> {
        store.doctors.update(expected_version, record).await.map(|_| ())
    }

    async fn delete(store: &ClinicStore, id: u64) -> ClinicResult<bool> {
        store.delete_doctor(id).await
    }
}

#[async_trait]
impl CrudResource for Patients {
    type Entity = Patient;
    type View = Patient;

    const LIST_PATH: &'static str = "/api/v1/patients";

    async fn list(store: &ClinicStore) -> ClinicResult<Vec<Patient>> {
        Ok(store.patients.list().await?.into_iter().map(|s| s.record).collect())
    }

    async fn find(store: &ClinicStore, id: u64) -> ClinicResult<Option<Patient>> {
        Ok(store.patients.get(id).await?.map(|s| s.record))
    }

    async fn fetch(store: &ClinicStore, id: u64) -> ClinicResult<Option<Stored<Patient>>> {
        store.patients.get(id).await
    }

    async fn insert(store: &ClinicStore, record: Patient) -> ClinicResult<Patient> {
        store.patients.insert(record).await
    }

    async fn update(store: &ClinicStore, expected_version: u64, record: Patient) -> ClinicResult<()> {
        store.patients.update(expected_version, record).await.map(|_| ())
    }

    async fn delete(store: &ClinicStore, id: u64) -> ClinicResult<bool> {
        store.delete_patient(id).await
    }
}

#[async_trait]
impl CrudResource for Treatments {
    type Entity = Treatment;
    type View = Treatment;

    const LIST_PATH: &'static str = "/api/v1/treatments";

    async fn list(store: &ClinicStore) -> ClinicResult<Vec<Treatment>> {
        Ok(store.treatments.list().await?.into_iter().map(|s| s.record).collect())
    }

    async fn find(store: &ClinicStore, id: u64) -> ClinicResult<Option<Treatment>> {
        Ok(store.treatments.get(id).await?.map(|s| s.record))
    }

    async fn fetch(store: &ClinicStore, id: u64) -> ClinicResult<Option<Stored<Treatment>>> {
        store.treatments.get(id).await
    }

    async fn insert(store: &ClinicStore, record: Treatment) -> ClinicResult<Treatment> {
        store.treatments.insert(record).await
    }

    async fn update(store: &ClinicStore, expected_version: u64, record: Treatment) -> ClinicResult<()> {
        store.treatments.update(expected_version, record).await.map(|_| ())
    }

    async fn delete(store: &ClinicStore, id: u64) -> ClinicResult<bool> {
        store.delete_treatment(id).await
    }
}

#[async_trait]
impl CrudResource for Appointments {
    type Entity = Appointment;
    type View = AppointmentDetail;

    const LIST_PATH: &'static str = "/api/v1/appointments";

    async fn list(store: &ClinicStore) -> ClinicResult<Vec<AppointmentDetail>> {
        // two-phase on purpose: the store hands the rows back unordered
        // and cannot sort on the time-of-day column itself
        let rows = store.list_appointment_details().await?;
        Ok(order_by_schedule(rows))
    }

    async fn find(store: &ClinicStore, id: u64) -> ClinicResult<Option<AppointmentDetail>> {
        store.appointment_detail(id).await
    }

    async fn fetch(store: &ClinicStore, id: u64) -> ClinicResult<Option<Stored<Appointment>>> {
        store.appointments.get(id).await
    }

    async fn insert(store: &ClinicStore, record: Appointment) -> ClinicResult<Appointment> {
        store.insert_appointment(record).await
    }

    async fn update(store: &ClinicStore, expected_version: u64, record: Appointment) -> ClinicResult<()> {
        store.update_appointment(expected_version, record).await.map(|_| ())
    }

    async fn delete(store: &ClinicStore, id: u64) -> ClinicResult<bool> {
        store.delete_appointment(id).await
    }

    async fn reference_lists(store: &ClinicStore) -> ClinicResult<Value> {
        let mut patients: Vec<RefItem> = store
            .patients
            .list()
            .await?
            .into_iter()
            .map(|s| RefItem { id: s.record.id, label: s.record.full_name })
            .collect();
        patients.sort_by(|a, b| a.label.cmp(&b.label));

        let mut doctors: Vec<RefItem> = store
            .doctors
            .list()
            .await?
            .into_iter()
            .map(|s| RefItem { id: s.record.id, label: s.record.full_name })
            .collect();
        doctors.sort_by(|a, b| a.label.cmp(&b.label));

        let mut treatments: Vec<RefItem> = store
            .treatments
            .list()
            .await?
            .into_iter()
            .map(|s| RefItem { id: s.record.id, label: s.record.name })
            .collect();
        treatments.sort_by(|a, b| a.label.cmp(&b.label));

        Ok(json!({
            "patients": patients,
            "doctors": doctors,
            "treatments": treatments,
        }))
    }
}

#[async_trait]
impl CrudResource for Reviews {
    type Entity = Review;
    type View = ReviewDetail;

    const LIST_PATH: &'static str = "/api/v1/reviews";

    async fn list(store: &ClinicStore) -> ClinicResult<Vec<ReviewDetail>> {
        let mut rows = store.list_review_details().await?;
        rows.sort_by(|a, b| b.review.created_at.cmp(&a.review.created_at));
        Ok(rows)
    }

    async fn find(store: &ClinicStore, id: u64) -> ClinicResult<Option<ReviewDetail>> {
        store.review_detail(id).await
    }

    async fn fetch(store: &ClinicStore, id: u64) -> ClinicResult<Option<Stored<Review>>> {
        store.reviews.get(id).await
    }

    async fn insert(store: &ClinicStore, record: Review) -> ClinicResult<Review> {
        store.insert_review(record).await
    }

    async fn update(store: &ClinicStore, expected_version: u64, record: Review) -> ClinicResult<()> {
        store.update_review(expected_version, record).await.map(|_| ())
    }

    async fn delete(store: &ClinicStore, id: u64) -> ClinicResult<bool> {
        store.delete_review(id).await
    }

    async fn reference_lists(store: &ClinicStore) -> ClinicResult<Value> {
        let rows = order_by_schedule(store.list_appointment_details().await?);
        let appointments: Vec<RefItem> = rows
            .into_iter()
            .map(|row| RefItem {
                id: row.appointment.id,
                label: format!(
                    "{} {} - {} / {} / {}",
                    row.appointment.date.format("%Y-%m-%d"),
                    row.appointment.time.format("%H:%M"),
                    row.patient.full_name,
                    row.doctor.full_name,
                    row.treatment.name
                ),
            })
            .collect();
        Ok(json!({ "appointments": appointments }))
    }

    /// Fast-path duplicate check; the index reservation in the store is
    /// the safety net under concurrent identical submissions.
    async fn before_create(store: &ClinicStore, record: &Review) -> ClinicResult<()> {
        if store.review_exists_for(record.appointment_id).await? {
            return Err(ClinicError::invalid(
                "appointment_id",
                "this appointment already has a review",
            ));
        }
        Ok(())
    }

    /// A new review marks its appointment completed.
    async fn after_create(store: &ClinicStore, created: &Review) -> ClinicResult<()> {
        store.mark_appointment_completed(created.appointment_id).await
    }
}

/// Schedule order: descending date, then ascending time of day.
pub fn order_by_schedule(mut rows: Vec<AppointmentDetail>) -> Vec<AppointmentDetail> {
    rows.sort_by(|a, b| {
        b.appointment
            .date
            .cmp(&a.appointment.date)
            .then(a.appointment.time.cmp(&b.appointment.time))
    });
    rows
}
