//! Companion HTTP API: single-block lookup with receipts.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chain_state::{parse_hex_u64, Block, BlockId, ChainStateError, NodeClient, Receipt};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared node handle for route handlers.
pub type ApiState = Arc<dyn NodeClient>;

/// Query string of `GET /api/block`.
#[derive(Debug, Deserialize)]
pub struct BlockQuery {
    block: Option<String>,
}

/// A block with the receipts of its transactions.
#[derive(Debug, Serialize)]
pub struct BlockDetail {
    #[serde(flatten)]
    block: Block,
    receipts: Vec<Receipt>,
}

/// Body of every `/api/block` response.
#[derive(Debug, Serialize)]
pub struct BlockResponse {
    block: Option<BlockDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl BlockResponse {
    fn found(detail: BlockDetail) -> Json<Self> {
        Json(Self {
            block: Some(detail),
            error: None,
        })
    }

    fn empty() -> Json<Self> {
        Json(Self {
            block: None,
            error: None,
        })
    }

    fn failed(error: String) -> Json<Self> {
        Json(Self {
            block: None,
            error: Some(error),
        })
    }
}

/// Build the API router.
pub fn router(node: ApiState) -> Router {
    Router::new()
        .route("/api/block", get(get_block))
        .route("/health", get(health_check))
        .with_state(node)
}

/// Decimal or `0x`-prefixed block number.
fn parse_block_number(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw.starts_with("0x") {
        parse_hex_u64(raw).ok()
    } else {
        raw.parse().ok()
    }
}

/// Fetch a block and every receipt it references.
async fn load_block(
    node: &dyn NodeClient,
    number: u64,
) -> Result<Option<BlockDetail>, ChainStateError> {
    let Some(block) = node.get_block(BlockId::Number(number), false).await? else {
        return Ok(None);
    };

    let receipts = join_all(
        block
            .transactions
            .iter()
            .map(|tx| node.get_transaction_receipt(tx.hash())),
    )
    .await
    .into_iter()
    .filter_map(Result::transpose)
    .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(BlockDetail { block, receipts }))
}

/// `GET /api/block?block=<number>`
async fn get_block(
    State(node): State<ApiState>,
    Query(query): Query<BlockQuery>,
) -> impl IntoResponse {
    let Some(number) = query.block.as_deref().and_then(parse_block_number) else {
        return (StatusCode::BAD_REQUEST, BlockResponse::empty());
    };

    match load_block(node.as_ref(), number).await {
        Ok(Some(detail)) => (StatusCode::OK, BlockResponse::found(detail)),
        Ok(None) => (StatusCode::NOT_FOUND, BlockResponse::empty()),
        Err(e) => {
            tracing::warn!("Block {} lookup failed: {}", number, e);
            (StatusCode::BAD_GATEWAY, BlockResponse::failed(e.to_string()))
        }
    }
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "eth-dash",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
