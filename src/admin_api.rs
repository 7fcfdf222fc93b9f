//! Admin query API.
//!
//! Read-only routes over the transfers repository, for operators and
//! reconciliation tooling. The command path does not go through HTTP.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::transfers::adapters::{TransferSearchFilter, TransfersRepository};
use crate::transfers::state::TransferState;
use crate::transfers::types::Transfer;

/// Shared state for the admin routes.
pub struct AdminState {
    pub repository: Arc<dyn TransfersRepository>,
}

/// Error body returned by every failing route.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub msg: String,
}

impl ErrorBody {
    fn new(msg: impl Into<String>) -> Json<Self> {
        Json(Self {
            status: "error",
            msg: msg.into(),
        })
    }
}

/// Query parameters accepted by `GET /transfers`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferQueryParams {
    pub id: Option<String>,
    pub state: Option<String>,
    pub currency_code: Option<String>,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
}

impl TransferQueryParams {
    fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.state.is_none()
            && self.currency_code.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
    }

    /// Translate wire parameters into a repository filter.
    fn to_filter(&self) -> Result<TransferSearchFilter, String> {
        let state = match &self.state {
            Some(name) => Some(
                TransferState::from_name(name)
                    .ok_or_else(|| format!("unknown transfer state: {name}"))?,
            ),
            None => None,
        };

        Ok(TransferSearchFilter {
            id: self.id.clone(),
            state,
            currency_code: self.currency_code.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
        })
    }
}

/// Build the admin router.
pub fn admin_router(state: Arc<AdminState>) -> Router {
    Router::new()
        .route("/transfers", get(get_transfers))
        .route("/transfers/{id}", get(get_transfer_by_id))
        .with_state(state)
}

/// Serve the admin API until the listener fails.
pub async fn serve(state: Arc<AdminState>, host: &str, port: u16) -> anyhow::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "admin API listening");

    axum::serve(listener, admin_router(state)).await?;
    Ok(())
}

async fn get_transfer_by_id(
    State(state): State<Arc<AdminState>>,
    Path(id): Path<String>,
) -> Result<Json<Transfer>, (StatusCode, Json<ErrorBody>)> {
    debug!(transfer_id = %id, "fetching transfer by id");

    match state.repository.get_transfer_by_id(&id).await {
        Ok(Some(transfer)) => Ok(Json(transfer)),
        Ok(None) => Err((StatusCode::NOT_FOUND, ErrorBody::new("Transfer not found"))),
        Err(err) => {
            error!(transfer_id = %id, error = %err, "transfer query failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new(err.to_string()),
            ))
        }
    }
}

async fn get_transfers(
    State(state): State<Arc<AdminState>>,
    Query(params): Query<TransferQueryParams>,
) -> Result<Json<Vec<Transfer>>, (StatusCode, Json<ErrorBody>)> {
    debug!("fetching transfers");

    let result = if params.is_empty() {
        state.repository.get_transfers().await
    } else {
        let filter = params
            .to_filter()
            .map_err(|msg| (StatusCode::BAD_REQUEST, ErrorBody::new(msg)))?;
        state.repository.search_transfers(&filter).await
    };

    match result {
        Ok(transfers) => Ok(Json(transfers)),
        Err(err) => {
            error!(error = %err, "transfer search failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new(err.to_string()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_params_mean_full_listing() {
        assert!(TransferQueryParams::default().is_empty());

        let params = TransferQueryParams {
            currency_code: Some("USD".into()),
            ..Default::default()
        };
        assert!(!params.is_empty());
    }

    #[test]
    fn test_params_translate_to_filter() {
        let params = TransferQueryParams {
            id: Some("t1".into()),
            state: Some("COMMITTED".into()),
            currency_code: Some("USD".into()),
            start_date: Some(1),
            end_date: Some(2),
        };

        let filter = params.to_filter().unwrap();
        assert_eq!(filter.id.as_deref(), Some("t1"));
        assert_eq!(filter.state, Some(TransferState::Committed));
        assert_eq!(filter.currency_code.as_deref(), Some("USD"));
        assert_eq!(filter.start_date, Some(1));
        assert_eq!(filter.end_date, Some(2));
    }

    #[test]
    fn test_unknown_state_is_rejected() {
        let params = TransferQueryParams {
            state: Some("SETTLED".into()),
            ..Default::default()
        };

        assert!(params.to_filter().is_err());
    }
}
