// storage/src/clinic_store.rs

use std::path::Path;

use chrono::Utc;
use sled::{Db, Tree};
use tracing::{debug, info};

use models::errors::{ClinicError, ClinicResult, FieldError};
use models::{
    Appointment, AppointmentDetail, Doctor, Entity, Patient, Review, ReviewDetail, Treatment,
};

use crate::collection::{Collection, Stored};

/// The clinic's persistence gateway: typed collections for the five
/// entities plus the cross-entity rules the schema demands (restrict and
/// cascade deletes, foreign-key existence on appointment writes, and the
/// one-review-per-appointment index).
pub struct ClinicStore {
    db: Db,
    pub doctors: Collection<Doctor>,
    pub patients: Collection<Patient>,
    pub treatments: Collection<Treatment>,
    pub appointments: Collection<Appointment>,
    pub reviews: Collection<Review>,
    review_index: Tree,
}

impl ClinicStore {
    pub fn open(path: impl AsRef<Path>) -> ClinicResult<Self> {
        let db = sled::Config::new().path(path).open()?;
        Self::with_db(db)
    }

    /// A store backed by a temporary sled database, dropped on close.
    pub fn temporary() -> ClinicResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::with_db(db)
    }

    fn with_db(db: Db) -> ClinicResult<Self> {
        Ok(Self {
            doctors: Collection::open(&db)?,
            patients: Collection::open(&db)?,
            treatments: Collection::open(&db)?,
            appointments: Collection::open(&db)?,
            reviews: Collection::open(&db)?,
            review_index: db.open_tree("reviews_by_appointment")?,
            db,
        })
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Persists a new appointment after checking that all three referenced
    /// rows exist.
    pub async fn insert_appointment(&self, appointment: Appointment) -> ClinicResult<Appointment> {
        self.check_appointment_refs(&appointment).await?;
        self.appointments.insert(appointment).await
    }

    pub async fn update_appointment(
        &self,
        expected_version: u64,
        appointment: Appointment,
    ) -> ClinicResult<Stored<Appointment>> {
        self.check_appointment_refs(&appointment).await?;
        self.appointments.update(expected_version, appointment).await
    }

    async fn check_appointment_refs(&self, appointment: &Appointment) -> ClinicResult<()> {
        let mut errors = Vec::new();
        if !self.patients.contains(appointment.patient_id).await? {
            errors.push(FieldError::new("patient_id", "unknown patient"));
        }
        if !self.doctors.contains(appointment.doctor_id).await? {
            errors.push(FieldError::new("doctor_id", "unknown doctor"));
        }
        if !self.treatments.contains(appointment.treatment_id).await? {
            errors.push(FieldError::new("treatment_id", "unknown treatment"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ClinicError::Validation(errors))
        }
    }

    /// Removes a doctor unless an appointment still references them.
    pub async fn delete_doctor(&self, id: u64) -> ClinicResult<bool> {
        self.ensure_unreferenced(Doctor::NAME, id, |a| a.doctor_id == id)
            .await?;
        self.doctors.remove(id).await
    }

    /// Removes a patient unless an appointment still references them.
    pub async fn delete_patient(&self, id: u64) -> ClinicResult<bool> {
        self.ensure_unreferenced(Patient::NAME, id, |a| a.patient_id == id)
            .await?;
        self.patients.remove(id).await
    }

    /// Removes a treatment unless an appointment still references it.
    pub async fn delete_treatment(&self, id: u64) -> ClinicResult<bool> {
        self.ensure_unreferenced(Treatment::NAME, id, |a| a.treatment_id == id)
            .await?;
        self.treatments.remove(id).await
    }

    async fn ensure_unreferenced(
        &self,
        entity: &'static str,
        id: u64,
        references: impl Fn(&Appointment) -> bool,
    ) -> ClinicResult<()> {
        for stored in self.appointments.list().await? {
            if references(&stored.record) {
                debug!("refusing to delete {entity} {id}: appointment {} references it", stored.record.id);
                return Err(ClinicError::Referenced { entity, id });
            }
        }
        Ok(())
    }

    /// Removes an appointment together with its review, if one exists.
    pub async fn delete_appointment(&self, id: u64) -> ClinicResult<bool> {
        let key = id.to_be_bytes();
        if let Some(bytes) = self.review_index.get(key)? {
            let review_id = decode_id(&bytes)?;
            self.reviews.remove(review_id).await?;
            self.review_index.remove(key)?;
            info!("cascaded delete of review {review_id} with appointment {id}");
        }
        self.appointments.remove(id).await
    }

    pub async fn review_exists_for(&self, appointment_id: u64) -> ClinicResult<bool> {
        Ok(self.review_index.contains_key(appointment_id.to_be_bytes())?)
    }

    /// Persists a new review, stamping its creation time. The index
    /// reservation is the unique constraint: under concurrent identical
    /// submissions only one compare-and-swap wins.
    pub async fn insert_review(&self, mut review: Review) -> ClinicResult<Review> {
        if !self.appointments.contains(review.appointment_id).await? {
            return Err(ClinicError::invalid("appointment_id", "unknown appointment"));
        }
        review.created_at = Utc::now();
        let id = self.db.generate_id()? + 1;
        review.id = id;

        let appointment_key = review.appointment_id.to_be_bytes();
        let reserved = self.review_index.compare_and_swap(
            appointment_key,
            None as Option<&[u8]>,
            Some(&id.to_be_bytes()[..]),
        )?;
        if reserved.is_err() {
            return Err(ClinicError::invalid(
                "appointment_id",
                "this appointment already has a review",
            ));
        }

        match self.reviews.write_new(review).await {
            Ok(review) => Ok(review),
            Err(err) => {
                // release the reservation so a later submission can succeed
                let _ = self.review_index.compare_and_swap(
                    appointment_key,
                    Some(&id.to_be_bytes()[..]),
                    None as Option<&[u8]>,
                );
                Err(err)
            }
        }
    }

    /// Replaces a review, keeping the appointment index in step when the
    /// review is pointed at a different appointment.
    pub async fn update_review(
        &self,
        expected_version: u64,
        review: Review,
    ) -> ClinicResult<Stored<Review>> {
        if !self.appointments.contains(review.appointment_id).await? {
            return Err(ClinicError::invalid("appointment_id", "unknown appointment"));
        }
        let current = self
            .reviews
            .get(review.id)
            .await?
            .ok_or(ClinicError::Conflict)?;

        if current.record.appointment_id == review.appointment_id {
            return self.reviews.update(expected_version, review).await;
        }

        let new_key = review.appointment_id.to_be_bytes();
        let old_key = current.record.appointment_id.to_be_bytes();
        let id_bytes = review.id.to_be_bytes();
        let reserved = self.review_index.compare_and_swap(
            new_key,
            None as Option<&[u8]>,
            Some(&id_bytes[..]),
        )?;
        if reserved.is_err() {
            return Err(ClinicError::invalid(
                "appointment_id",
                "this appointment already has a review",
            ));
        }
        match self.reviews.update(expected_version, review).await {
            Ok(updated) => {
                self.review_index.remove(old_key)?;
                Ok(updated)
            }
            Err(err) => {
                let _ = self.review_index.compare_and_swap(
                    new_key,
                    Some(&id_bytes[..]),
                    None as Option<&[u8]>,
                );
                Err(err)
            }
        }
    }

    /// Removes a review and its index entry; an absent row is not an error.
    pub async fn delete_review(&self, id: u64) -> ClinicResult<bool> {
        match self.reviews.get(id).await? {
            Some(stored) => {
                self.reviews.remove(id).await?;
                self.review_index
                    .remove(stored.record.appointment_id.to_be_bytes())?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Follow-up write after a successful review creation: flips the
    /// parent appointment's completed flag when it is still false.
    pub async fn mark_appointment_completed(&self, appointment_id: u64) -> ClinicResult<()> {
        if let Some(stored) = self.appointments.get(appointment_id).await? {
            if !stored.record.completed {
                let mut record = stored.record;
                record.completed = true;
                self.appointments.update(stored.version, record).await?;
                info!("appointment {appointment_id} marked completed");
            }
        }
        Ok(())
    }

    /// One appointment with its patient, doctor, treatment, and review
    /// resolved.
    pub async fn appointment_detail(&self, id: u64) -> ClinicResult<Option<AppointmentDetail>> {
        match self.appointments.get(id).await? {
            Some(stored) => Ok(Some(self.resolve_appointment(stored.record).await?)),
            None => Ok(None),
        }
    }

    /// Every appointment with relationships resolved, in key order.
    /// Callers needing the schedule order sort the result themselves; the
    /// store cannot order by the time-of-day column.
    pub async fn list_appointment_details(&self) -> ClinicResult<Vec<AppointmentDetail>> {
        let mut rows = Vec::new();
        for stored in self.appointments.list().await? {
            rows.push(self.resolve_appointment(stored.record).await?);
        }
        Ok(rows)
    }

    async fn resolve_appointment(&self, appointment: Appointment) -> ClinicResult<AppointmentDetail> {
        let patient = self
            .patients
            .get(appointment.patient_id)
            .await?
            .ok_or_else(|| dangling(Patient::NAME, appointment.patient_id))?
            .record;
        let doctor = self
            .doctors
            .get(appointment.doctor_id)
            .await?
            .ok_or_else(|| dangling(Doctor::NAME, appointment.doctor_id))?
            .record;
        let treatment = self
            .treatments
            .get(appointment.treatment_id)
            .await?
            .ok_or_else(|| dangling(Treatment::NAME, appointment.treatment_id))?
            .record;
        let review = match self.review_index.get(appointment.id.to_be_bytes())? {
            Some(bytes) => self
                .reviews
                .get(decode_id(&bytes)?)
                .await?
                .map(|s| s.record),
            None => None,
        };
        Ok(AppointmentDetail {
            appointment,
            patient,
            doctor,
            treatment,
            review,
        })
    }

    pub async fn review_detail(&self, id: u64) -> ClinicResult<Option<ReviewDetail>> {
        match self.reviews.get(id).await? {
            Some(stored) => {
                let appointment = self
                    .appointment_detail(stored.record.appointment_id)
                    .await?
                    .ok_or_else(|| dangling(Appointment::NAME, stored.record.appointment_id))?;
                Ok(Some(ReviewDetail {
                    review: stored.record,
                    appointment,
                }))
            }
            None => Ok(None),
        }
    }

    pub async fn list_review_details(&self) -> ClinicResult<Vec<ReviewDetail>> {
        let mut rows = Vec::new();
        for stored in self.reviews.list().await? {
            let appointment = self
                .appointment_detail(stored.record.appointment_id)
                .await?
                .ok_or_else(|| dangling(Appointment::NAME, stored.record.appointment_id))?;
            rows.push(ReviewDetail {
                review: stored.record,
                appointment,
            });
        }
        Ok(rows)
    }
}

fn dangling(entity: &'static str, id: u64) -> ClinicError {
    ClinicError::NotFound(entity, id)
}

fn decode_id(bytes: &[u8]) -> ClinicResult<u64> {
    let bytes: [u8; 8] = bytes
        .try_into()
        .map_err(|_| ClinicError::Storage("malformed id in review index".to_string()))?;
    Ok(u64::from_be_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn doctor() -> Doctor {
        Doctor {
            full_name: "Dr. Ana Pop".to_string(),
            specialty: "Orthodontics".to_string(),
            ..Default::default()
        }
    }

    fn patient() -> Patient {
        Patient {
            full_name: "Ion Vasile".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1990, 5, 1).expect("valid date"),
            ..Default::default()
        }
    }

    fn treatment() -> Treatment {
        Treatment {
            name: "Consultation".to_string(),
            price: 100.0,
            ..Default::default()
        }
    }

    async fn seeded_appointment(store: &ClinicStore) -> Appointment {
        let d = store.doctors.insert(doctor()).await.expect("insert doctor");
        let p = store.patients.insert(patient()).await.expect("insert patient");
        let t = store
            .treatments
            .insert(treatment())
            .await
            .expect("insert treatment");
        store
            .insert_appointment(Appointment {
                patient_id: p.id,
                doctor_id: d.id,
                treatment_id: t.id,
                date: NaiveDate::from_ymd_opt(2024, 1, 2).expect("valid date"),
                time: NaiveTime::from_hms_opt(9, 0, 0).expect("valid time"),
                ..Default::default()
            })
            .await
            .expect("insert appointment")
    }

    #[tokio::test]
    async fn should_reject_appointment_with_unknown_references() {
        let store = ClinicStore::temporary().expect("open store");
        let err = store
            .insert_appointment(Appointment {
                patient_id: 7,
                doctor_id: 8,
                treatment_id: 9,
                ..Default::default()
            })
            .await
            .unwrap_err();
        match err {
            ClinicError::Validation(errors) => assert_eq!(errors.len(), 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn should_restrict_deleting_a_referenced_doctor() {
        let store = ClinicStore::temporary().expect("open store");
        let appointment = seeded_appointment(&store).await;

        let err = store.delete_doctor(appointment.doctor_id).await.unwrap_err();
        assert!(matches!(err, ClinicError::Referenced { entity: "doctor", .. }));

        // nothing was removed
        assert!(store
            .doctors
            .contains(appointment.doctor_id)
            .await
            .expect("contains"));
        assert!(store
            .appointments
            .contains(appointment.id)
            .await
            .expect("contains"));
    }

    #[tokio::test]
    async fn should_delete_an_unreferenced_doctor() {
        let store = ClinicStore::temporary().expect("open store");
        let created = store.doctors.insert(doctor()).await.expect("insert");
        assert!(store.delete_doctor(created.id).await.expect("delete"));
        assert!(store.doctors.get(created.id).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn should_release_restriction_once_the_appointment_is_gone() {
        let store = ClinicStore::temporary().expect("open store");
        let appointment = seeded_appointment(&store).await;

        let patient_err = store.delete_patient(appointment.patient_id).await.unwrap_err();
        assert!(matches!(patient_err, ClinicError::Referenced { entity: "patient", .. }));
        let treatment_err = store.delete_treatment(appointment.treatment_id).await.unwrap_err();
        assert!(matches!(treatment_err, ClinicError::Referenced { entity: "treatment", .. }));

        store
            .delete_appointment(appointment.id)
            .await
            .expect("delete appointment");
        assert!(store
            .delete_patient(appointment.patient_id)
            .await
            .expect("delete patient"));
        assert!(store
            .delete_treatment(appointment.treatment_id)
            .await
            .expect("delete treatment"));
    }

    #[tokio::test]
    async fn should_flip_completed_flag_after_first_review() {
        let store = ClinicStore::temporary().expect("open store");
        let appointment = seeded_appointment(&store).await;
        assert!(!appointment.completed);

        let review = store
            .insert_review(Review {
                appointment_id: appointment.id,
                rating: 4,
                ..Default::default()
            })
            .await
            .expect("insert review");
        store
            .mark_appointment_completed(review.appointment_id)
            .await
            .expect("mark completed");

        let detail = store
            .appointment_detail(appointment.id)
            .await
            .expect("detail")
            .expect("present");
        assert!(detail.appointment.completed);
        assert_eq!(detail.review.map(|r| r.id), Some(review.id));
    }

    #[tokio::test]
    async fn should_reject_second_review_for_same_appointment() {
        let store = ClinicStore::temporary().expect("open store");
        let appointment = seeded_appointment(&store).await;

        let first = store
            .insert_review(Review {
                appointment_id: appointment.id,
                ..Default::default()
            })
            .await
            .expect("first review");
        store
            .mark_appointment_completed(appointment.id)
            .await
            .expect("mark completed");

        let err = store
            .insert_review(Review {
                appointment_id: appointment.id,
                rating: 1,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::Validation(_)));

        // the existing review and the completed flag are untouched
        let detail = store
            .appointment_detail(appointment.id)
            .await
            .expect("detail")
            .expect("present");
        assert_eq!(detail.review.map(|r| r.id), Some(first.id));
        assert!(detail.appointment.completed);
    }

    #[tokio::test]
    async fn should_cascade_review_delete_with_appointment() {
        let store = ClinicStore::temporary().expect("open store");
        let appointment = seeded_appointment(&store).await;
        let review = store
            .insert_review(Review {
                appointment_id: appointment.id,
                ..Default::default()
            })
            .await
            .expect("insert review");

        assert!(store.delete_appointment(appointment.id).await.expect("delete"));
        assert!(store.reviews.get(review.id).await.expect("get").is_none());
        assert!(!store
            .review_exists_for(appointment.id)
            .await
            .expect("exists"));
    }

    #[tokio::test]
    async fn should_free_the_appointment_for_review_after_delete() {
        let store = ClinicStore::temporary().expect("open store");
        let appointment = seeded_appointment(&store).await;
        let review = store
            .insert_review(Review {
                appointment_id: appointment.id,
                ..Default::default()
            })
            .await
            .expect("insert review");

        assert!(store.delete_review(review.id).await.expect("delete"));
        assert!(store
            .insert_review(Review {
                appointment_id: appointment.id,
                ..Default::default()
            })
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn should_move_the_index_when_review_changes_appointment() {
        let store = ClinicStore::temporary().expect("open store");
        let first = seeded_appointment(&store).await;
        let second = store
            .insert_appointment(Appointment {
                date: NaiveDate::from_ymd_opt(2024, 2, 1).expect("valid date"),
                ..first.clone()
            })
            .await
            .expect("second appointment");

        let review = store
            .insert_review(Review {
                appointment_id: first.id,
                ..Default::default()
            })
            .await
            .expect("insert review");

        let moved = Review {
            appointment_id: second.id,
            ..review.clone()
        };
        store.update_review(1, moved).await.expect("update review");

        assert!(!store.review_exists_for(first.id).await.expect("exists"));
        assert!(store.review_exists_for(second.id).await.expect("exists"));
    }

    #[tokio::test]
    async fn should_resolve_relationships_on_detail_reads() {
        let store = ClinicStore::temporary().expect("open store");
        let appointment = seeded_appointment(&store).await;

        let detail = store
            .appointment_detail(appointment.id)
            .await
            .expect("detail")
            .expect("present");
        assert_eq!(detail.doctor.full_name, "Dr. Ana Pop");
        assert_eq!(detail.patient.full_name, "Ion Vasile");
        assert_eq!(detail.treatment.name, "Consultation");
        assert!(detail.review.is_none());
    }
}
