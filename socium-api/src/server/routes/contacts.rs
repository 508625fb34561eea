use crate::server::{Result, ServerError, ServerRouter, auth::AdminAccount, extract::Json};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use socium_common::model::{
    Id,
    contact::{ContactMarker, ContactMessage, CreateContact},
};
use socium_db::Gateway;
use socium_service::Service;
use std::sync::Arc;

pub fn routes<G: Gateway>() -> ServerRouter<G> {
    ServerRouter::new()
        .typed_post(create_contact::<G>)
        .typed_get(list_contacts::<G>)
        .typed_delete(delete_contact::<G>)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/contacts", rejection(ServerError))]
struct CreateContactPath();

async fn create_contact<G: Gateway>(
    CreateContactPath(): CreateContactPath,
    State(service): State<Arc<Service<G>>>,
    Json(create): Json<CreateContact>,
) -> Result<(StatusCode, Json<ContactMessage>)> {
    let contact = service.create_contact(create).await?;

    Ok((StatusCode::CREATED, Json(contact)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/admin/contacts", rejection(ServerError))]
struct ContactsPath();

async fn list_contacts<G: Gateway>(
    ContactsPath(): ContactsPath,
    State(service): State<Arc<Service<G>>>,
    _admin: AdminAccount,
) -> Result<Json<Vec<ContactMessage>>> {
    let contacts = service.list_contacts().await?;

    Ok(Json(contacts))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/admin/contacts/{id}", rejection(ServerError))]
struct ContactPath {
    id: Id<ContactMarker>,
}

async fn delete_contact<G: Gateway>(
    ContactPath { id }: ContactPath,
    State(service): State<Arc<Service<G>>>,
    _admin: AdminAccount,
) -> Result<StatusCode> {
    service.delete_contact(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
