// rest_api/src/crud.rs
//
// The entity CRUD protocol: one generic handler set, instantiated per
// entity type through the `CrudResource` trait. Doctors, patients, and
// treatments use the default hooks; appointments and reviews override
// the extension points they need.

use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use models::errors::{ClinicError, ClinicResult, FieldError};
use models::Entity;
use storage::{ClinicStore, Stored};

use crate::{ApiError, AppState};

/// One entity screen's binding into the generic protocol.
#[async_trait]
pub trait CrudResource: Send + Sync + 'static {
    type Entity: Entity + Default;
    type View: Serialize + Send;

    /// Path the protocol redirects to after a successful write.
    const LIST_PATH: &'static str;

    /// All rows with relationships resolved, in display order.
    async fn list(store: &ClinicStore) -> ClinicResult<Vec<Self::View>>;

    /// One row with relationships resolved.
    async fn find(store: &ClinicStore, id: u64) -> ClinicResult<Option<Self::View>>;

    /// The raw row together with its version, as edit forms need it.
    async fn fetch(store: &ClinicStore, id: u64) -> ClinicResult<Option<Stored<Self::Entity>>>;

    async fn insert(store: &ClinicStore, record: Self::Entity) -> ClinicResult<Self::Entity>;

    async fn update(store: &ClinicStore, expected_version: u64, record: Self::Entity) -> ClinicResult<()>;

    /// Removes the row, enforcing the referential rules. Returns whether
    /// a row was actually removed.
    async fn delete(store: &ClinicStore, id: u64) -> ClinicResult<bool>;

    /// id + display-label data for the form's relationship pickers.
    async fn reference_lists(_store: &ClinicStore) -> ClinicResult<Value> {
        Ok(Value::Null)
    }

    /// Entity-specific check ran after field validation, before the write.
    async fn before_create(_store: &ClinicStore, _record: &Self::Entity) -> ClinicResult<()> {
        Ok(())
    }

    /// Entity-specific follow-up ran after a successful create.
    async fn after_create(_store: &ClinicStore, _created: &Self::Entity) -> ClinicResult<()> {
        Ok(())
    }
}

/// A create/edit submission: the entity fields plus, on edits, the
/// version the row carried when the form was loaded.
#[derive(Debug, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: DeserializeOwned"))]
pub struct SubmitForm<T> {
    #[serde(default)]
    pub version: u64,
    #[serde(flatten)]
    pub record: T,
}

/// Wires the protocol operations for one entity route group.
pub fn resource_router<R: CrudResource>() -> Router<AppState> {
    Router::new()
        .route("/", get(list::<R>).post(create::<R>))
        .route("/new", get(show_create_form::<R>))
        .route("/:id", get(details::<R>).post(update::<R>))
        .route("/:id/edit", get(show_edit_form::<R>))
        .route("/:id/delete", get(show_delete_confirmation::<R>).post(delete_confirmed::<R>))
}

async fn list<R: CrudResource>(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let items = R::list(&state.store).await?;
    Ok(Json(json!({ "items": items })))
}

async fn details<R: CrudResource>(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Value>, ApiError> {
    match R::find(&state.store, id).await? {
        Some(view) => Ok(Json(json!({ "record": view }))),
        None => Err(not_found::<R>(id)),
    }
}

async fn show_create_form<R: CrudResource>(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let reference = R::reference_lists(&state.store).await?;
    Ok(Json(json!({
        "record": R::Entity::default(),
        "reference": reference,
    })))
}

async fn create<R: CrudResource>(
    State(state): State<AppState>,
    Json(form): Json<SubmitForm<R::Entity>>,
) -> Result<Response, ApiError> {
    if let Err(errors) = form.record.validate() {
        return invalid_form::<R>(&state, errors, &form.record).await;
    }
    if let Err(err) = R::before_create(&state.store, &form.record).await {
        return reject_or_fail::<R>(&state, err, &form.record).await;
    }
    match R::insert(&state.store, form.record.clone()).await {
        Ok(created) => {
            R::after_create(&state.store, &created).await?;
            info!("created {} {}", R::Entity::NAME, created.id());
            Ok(redirect::<R>())
        }
        Err(err) => reject_or_fail::<R>(&state, err, &form.record).await,
    }
}

async fn show_edit_form<R: CrudResource>(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Value>, ApiError> {
    match R::fetch(&state.store, id).await? {
        Some(stored) => {
            let reference = R::reference_lists(&state.store).await?;
            Ok(Json(json!({
                "record": stored.record,
                "version": stored.version,
                "reference": reference,
            })))
        }
        None => Err(not_found::<R>(id)),
    }
}

async fn update<R: CrudResource>(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(form): Json<SubmitForm<R::Entity>>,
) -> Result<Response, ApiError> {
    if let Err(err) = ensure_matching_id(id, form.record.id()) {
        warn!("update for {} {} carried id {}", R::Entity::NAME, id, form.record.id());
        return Err(err.into());
    }
    if let Err(errors) = form.record.validate() {
        return invalid_form::<R>(&state, errors, &form.record).await;
    }
    match R::update(&state.store, form.version, form.record.clone()).await {
        Ok(()) => {
            info!("updated {} {}", R::Entity::NAME, id);
            Ok(redirect::<R>())
        }
        Err(ClinicError::Conflict) => {
            // the row may have been deleted since the form was loaded
            if R::fetch(&state.store, id).await?.is_none() {
                Err(not_found::<R>(id))
            } else {
                Err(ClinicError::Conflict.into())
            }
        }
        Err(err) => reject_or_fail::<R>(&state, err, &form.record).await,
    }
}

async fn show_delete_confirmation<R: CrudResource>(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Value>, ApiError> {
    match R::find(&state.store, id).await? {
        Some(view) => Ok(Json(json!({ "record": view }))),
        None => Err(not_found::<R>(id)),
    }
}

async fn delete_confirmed<R: CrudResource>(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Response, ApiError> {
    let removed = R::delete(&state.store, id).await?;
    if removed {
        info!("deleted {} {}", R::Entity::NAME, id);
    }
    // deleting an already-absent row is treated as satisfied
    Ok(redirect::<R>())
}

/// Response that keeps the caller on the form: errors attached, input
/// preserved, reference lists repopulated. Nothing was written.
async fn invalid_form<R: CrudResource>(
    state: &AppState,
    errors: Vec<FieldError>,
    record: &R::Entity,
) -> Result<Response, ApiError> {
    let reference = R::reference_lists(&state.store).await?;
    let body = Json(json!({
        "status": "validation_failed",
        "errors": errors,
        "record": record,
        "reference": reference,
    }));
    Ok((StatusCode::UNPROCESSABLE_ENTITY, body).into_response())
}

async fn reject_or_fail<R: CrudResource>(
    state: &AppState,
    err: ClinicError,
    record: &R::Entity,
) -> Result<Response, ApiError> {
    match err {
        ClinicError::Validation(errors) => invalid_form::<R>(state, errors, record).await,
        other => Err(other.into()),
    }
}

fn redirect<R: CrudResource>() -> Response {
    Json(json!({ "status": "success", "redirect": R::LIST_PATH })).into_response()
}

fn not_found<R: CrudResource>(id: u64) -> ApiError {
    ApiError::NotFound(format!("{} {} was not found", R::Entity::NAME, id))
}

/// An edit payload must address the same row as the path it was posted to.
fn ensure_matching_id(path_id: u64, payload_id: u64) -> ClinicResult<()> {
    if path_id == payload_id {
        Ok(())
    } else {
        Err(ClinicError::IdentityMismatch)
    }
}
