//! Sale endpoints.
//!
//! | Method | Path              | Operation |
//! |--------|-------------------|-----------|
//! | POST   | /api/sales        | post      |
//! | GET    | /api/sales        | list      |
//! | GET    | /api/sales/:id    | get       |
//! | PUT    | /api/sales/:id    | edit      |
//! | DELETE | /api/sales/:id    | void      |

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tracing::debug;

use till_core::{EditSaleRequest, SaleDetail, SaleFilter, SaleRequest};

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sales).post(post_sale))
        .route("/:id", get(get_sale).put(edit_sale).delete(void_sale))
}

async fn post_sale(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    body: Result<Json<SaleRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SaleDetail>)> {
    let Json(request) = body?;
    let sale = state.db.engine().post(&caller, &request).await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

async fn list_sales(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    filter: Result<Query<SaleFilter>, QueryRejection>,
) -> ApiResult<Json<Vec<SaleDetail>>> {
    let Query(filter) = filter?;
    debug!(user_id = caller.user_id, ?filter, "Listing sales");
    let sales = state.db.engine().list(&caller, &filter).await?;
    Ok(Json(sales))
}

async fn get_sale(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<SaleDetail>> {
    let Path(id) = id?;
    let sale = state.db.engine().get(&caller, id).await?;
    Ok(Json(sale))
}

async fn edit_sale(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<EditSaleRequest>, JsonRejection>,
) -> ApiResult<Json<SaleDetail>> {
    let Path(id) = id?;
    let Json(request) = body?;
    let sale = state.db.engine().edit(&caller, id, &request).await?;
    Ok(Json(sale))
}

async fn void_sale(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    state.db.engine().void(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
