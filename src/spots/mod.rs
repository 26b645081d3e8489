pub mod chat;
pub mod filter;
pub mod gate;
pub mod repo;

mod manage;
mod members;
mod msg;
mod view;
mod ws;

use axum::{routing::{get, post}, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(view::list))
        .route("/new", post(manage::create))
        .route("/{id}", get(view::detail))
        .route("/{id}/edit", post(manage::edit))
        .route("/{id}/delete", post(manage::delete))
        .route("/{id}/join", post(members::join))
        .route("/{id}/leave", post(members::leave))
        .route("/{id}/members", get(members::roster))
        .route("/{id}/messages", get(msg::history).post(msg::send))
        .route("/{id}/ws", get(ws::spot_ws))
}
