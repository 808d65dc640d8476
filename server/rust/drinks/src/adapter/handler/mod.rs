pub mod drink_handler;
pub mod error;
pub mod health;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use coffee_auth::{require_permission, AuthState, JwksVerifier};
use coffee_telemetry::Metrics;

use crate::domain::repository::DrinkRepository;
use crate::usecase::*;

#[derive(Clone)]
pub struct AppState {
    pub list_drinks_uc: Arc<ListDrinksUseCase>,
    pub create_drink_uc: Arc<CreateDrinkUseCase>,
    pub update_drink_uc: Arc<UpdateDrinkUseCase>,
    pub delete_drink_uc: Arc<DeleteDrinkUseCase>,
    pub drink_repo: Arc<dyn DrinkRepository>,
    pub auth: AuthState,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// リポジトリと検証器からユースケースを組み立てる。
    pub fn new(
        drink_repo: Arc<dyn DrinkRepository>,
        verifier: Arc<JwksVerifier>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            list_drinks_uc: Arc::new(ListDrinksUseCase::new(drink_repo.clone())),
            create_drink_uc: Arc::new(CreateDrinkUseCase::new(drink_repo.clone())),
            update_drink_uc: Arc::new(UpdateDrinkUseCase::new(drink_repo.clone())),
            delete_drink_uc: Arc::new(DeleteDrinkUseCase::new(drink_repo.clone())),
            drink_repo,
            auth: AuthState::new(verifier),
            metrics,
        }
    }
}

/// 同一パスでもメソッドごとに必要な権限が異なるため、
/// 権限チェックは MethodRouter 単位の route_layer で付与する。
pub fn router(state: AppState) -> Router {
    let auth = state.auth.clone();

    let drinks = get(drink_handler::list_drinks).merge(
        post(drink_handler::create_drink).route_layer(middleware::from_fn(require_permission(
            auth.clone(),
            "post:drinks",
        ))),
    );

    let drinks_detail = get(drink_handler::list_drinks_detail).route_layer(middleware::from_fn(
        require_permission(auth.clone(), "get:drinks-detail"),
    ));

    let drink_by_id = patch(drink_handler::update_drink)
        .route_layer(middleware::from_fn(require_permission(
            auth.clone(),
            "patch:drinks",
        )))
        .merge(
            delete(drink_handler::delete_drink).route_layer(middleware::from_fn(
                require_permission(auth, "delete:drinks"),
            )),
        );

    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/metrics", get(health::metrics))
        .route("/drinks", drinks)
        .route("/drinks-detail", drinks_detail)
        .route("/drinks/{id}", drink_by_id)
        .fallback(error::not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
