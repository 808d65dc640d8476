use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use coffee_auth::Claims;

use super::error::ApiError;
use super::AppState;
use crate::domain::entity::{DrinkChanges, Ingredient, NewDrink};

// --- Request DTOs ---

/// recipe は材料 1 件のオブジェクトでも配列でも受け付ける。
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RecipeInput {
    Many(Vec<Ingredient>),
    One(Ingredient),
}

impl From<RecipeInput> for Vec<Ingredient> {
    fn from(input: RecipeInput) -> Self {
        match input {
            RecipeInput::Many(list) => list,
            RecipeInput::One(single) => vec![single],
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateDrinkRequest {
    pub title: Option<String>,
    pub recipe: Option<RecipeInput>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDrinkRequest {
    pub title: Option<String>,
    pub recipe: Option<RecipeInput>,
}

// --- Handlers ---

/// GET /drinks
pub async fn list_drinks(State(state): State<AppState>) -> Result<Response, ApiError> {
    let drinks = state.list_drinks_uc.execute().await?;
    let views: Vec<_> = drinks.iter().map(|d| d.short()).collect();
    Ok(Json(serde_json::json!({"success": true, "drinks": views})).into_response())
}

/// GET /drinks-detail
pub async fn list_drinks_detail(
    Extension(_claims): Extension<Claims>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let drinks = state.list_drinks_uc.execute().await?;
    let views: Vec<_> = drinks.iter().map(|d| d.long()).collect();
    Ok(Json(serde_json::json!({"success": true, "drinks": views})).into_response())
}

/// POST /drinks
pub async fn create_drink(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    body: Result<Json<CreateDrinkRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = body?;
    let (Some(title), Some(recipe)) = (req.title, req.recipe) else {
        return Err(ApiError::unprocessable("title and recipe are required"));
    };

    let input = NewDrink {
        title,
        recipe: recipe.into(),
    };
    let drink = state.create_drink_uc.execute(&input).await?;

    tracing::debug!(drink_id = drink.id, sub = ?claims.sub, "create_drink");
    Ok(Json(serde_json::json!({"success": true, "drinks": [drink.long()]})).into_response())
}

/// PATCH /drinks/{id}
pub async fn update_drink(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateDrinkRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = id?;
    let Json(req) = body?;

    let changes = DrinkChanges {
        title: req.title,
        recipe: req.recipe.map(Into::into),
    };
    let drink = state.update_drink_uc.execute(id, &changes).await?;

    tracing::debug!(drink_id = id, sub = ?claims.sub, "update_drink");
    Ok(Json(serde_json::json!({"success": true, "drinks": [drink.long()]})).into_response())
}

/// DELETE /drinks/{id}
pub async fn delete_drink(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = id?;

    match state.delete_drink_uc.execute(id).await {
        Ok(()) => {
            tracing::debug!(drink_id = id, sub = ?claims.sub, "delete_drink");
            Ok(Json(serde_json::json!({"success": true, "delete": id})).into_response())
        }
        Err(crate::usecase::DeleteDrinkError::NotFound(_)) => Ok((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"success": false, "delete": id})),
        )
            .into_response()),
        Err(e) => Err(e.into()),
    }
}
