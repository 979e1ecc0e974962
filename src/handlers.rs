// region:    --- Imports
use crate::account::model::User;
use crate::auction::model::{Auction, Bid};
use crate::auction::Refund;
use crate::commands::{
    CreateAuctionCommand, LoginCommand, PlaceBidCommand, RegisterCommand, WalletCommand,
};
use crate::error::MarketError;
use crate::market::Marketplace;
use crate::notification::Notification;
use crate::query::{AuctionFilter, MarketStats};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

// endregion: --- Imports

// region:    --- Router
pub fn router(market: Marketplace) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/auth/register", post(handle_register))
        .route("/auth/login", post(handle_login))
        .route("/auth/logout", post(handle_logout))
        .route("/me", get(handle_me))
        .route("/wallet/deposit", post(handle_deposit))
        .route("/wallet/withdraw", post(handle_withdraw))
        .route(
            "/auctions",
            get(handle_list_auctions).post(handle_create_auction),
        )
        .route("/auctions/categories", get(handle_categories))
        .route("/auctions/stats", get(handle_stats))
        .route(
            "/auctions/:id",
            get(handle_get_auction).delete(handle_delete_auction),
        )
        .route(
            "/auctions/:id/bids",
            get(handle_get_auction_bids).post(handle_place_bid),
        )
        .route("/maintenance/remove-ended", post(handle_remove_ended))
        .route("/notifications", get(handle_get_notifications))
        .route("/notifications/:id/read", post(handle_mark_read))
        .layer(cors)
        .with_state(market)
}
// endregion: --- Router

// region:    --- Error Mapping
impl IntoResponse for MarketError {
    fn into_response(self) -> Response {
        let status = match &self {
            MarketError::NotAuthenticated | MarketError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            MarketError::PermissionDenied => StatusCode::FORBIDDEN,
            MarketError::AuctionNotFound(_) | MarketError::UnknownAccount(_) => {
                StatusCode::NOT_FOUND
            }
            MarketError::AccountExists => StatusCode::CONFLICT,
            MarketError::Storage(e) => {
                error!("{:<12} --> storage failure: {}", "Handler", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            MarketError::AuctionNotActive(_)
            | MarketError::BidTooLow { .. }
            | MarketError::InsufficientBalance { .. }
            | MarketError::InvalidAmount
            | MarketError::InvalidAuction(_) => StatusCode::BAD_REQUEST,
        };

        (
            status,
            Json(json!({
                "error": self.to_string(),
                "code": self.code(),
            })),
        )
            .into_response()
    }
}
// endregion: --- Error Mapping

// region:    --- Account Handlers

/// Registration; the new account becomes the session user.
pub async fn handle_register(
    State(market): State<Marketplace>,
    Json(cmd): Json<RegisterCommand>,
) -> Result<impl IntoResponse, MarketError> {
    info!("{:<12} --> register {}", "Handler", cmd.username);
    let user = market
        .lock()
        .await
        .accounts_mut()
        .register(&cmd.username, &cmd.email, &cmd.password)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn handle_login(
    State(market): State<Marketplace>,
    Json(cmd): Json<LoginCommand>,
) -> Result<Json<User>, MarketError> {
    info!("{:<12} --> login {}", "Handler", cmd.username);
    let user = market
        .lock()
        .await
        .accounts_mut()
        .login(&cmd.username, &cmd.password)
        .await?;
    Ok(Json(user))
}

pub async fn handle_logout(State(market): State<Marketplace>) -> Result<StatusCode, MarketError> {
    market.lock().await.accounts_mut().logout().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn handle_me(State(market): State<Marketplace>) -> Result<Json<User>, MarketError> {
    let store = market.lock().await;
    Ok(Json(store.accounts().require_user()?.clone()))
}

pub async fn handle_deposit(
    State(market): State<Marketplace>,
    Json(cmd): Json<WalletCommand>,
) -> Result<Json<User>, MarketError> {
    Ok(Json(market.deposit(cmd.amount).await?))
}

pub async fn handle_withdraw(
    State(market): State<Marketplace>,
    Json(cmd): Json<WalletCommand>,
) -> Result<Json<User>, MarketError> {
    Ok(Json(market.withdraw(cmd.amount).await?))
}
// endregion: --- Account Handlers

// region:    --- Auction Handlers

/// Listing with optional `search`, `category` and `status` filters.
pub async fn handle_list_auctions(
    State(market): State<Marketplace>,
    Query(filter): Query<AuctionFilter>,
) -> Json<Vec<Auction>> {
    let store = market.lock().await;
    Json(store.search(&filter).into_iter().cloned().collect())
}

pub async fn handle_categories(State(market): State<Marketplace>) -> Json<Vec<String>> {
    Json(market.lock().await.categories())
}

pub async fn handle_stats(State(market): State<Marketplace>) -> Json<MarketStats> {
    Json(market.lock().await.stats())
}

/// Any logged-in user may list an item; the session user becomes its owner.
pub async fn handle_create_auction(
    State(market): State<Marketplace>,
    Json(cmd): Json<CreateAuctionCommand>,
) -> Result<impl IntoResponse, MarketError> {
    let mut store = market.lock().await;
    let owner = store.accounts().require_user()?.id.clone();
    let new = cmd.into_new_auction(&owner, store.now())?;
    let auction = store.create_auction(new).await?;
    Ok((StatusCode::CREATED, Json(auction)))
}

pub async fn handle_get_auction(
    State(market): State<Marketplace>,
    Path(auction_id): Path<String>,
) -> Result<Json<Auction>, MarketError> {
    let store = market.lock().await;
    store
        .auction(&auction_id)
        .cloned()
        .map(Json)
        .ok_or(MarketError::AuctionNotFound(auction_id))
}

#[derive(Serialize)]
pub struct DeleteAuctionResponse {
    pub refunds: Vec<Refund>,
}

pub async fn handle_delete_auction(
    State(market): State<Marketplace>,
    Path(auction_id): Path<String>,
) -> Result<Json<DeleteAuctionResponse>, MarketError> {
    info!("{:<12} --> delete auction {}", "Handler", auction_id);
    let refunds = market.lock().await.delete_auction(&auction_id).await?;
    Ok(Json(DeleteAuctionResponse { refunds }))
}

/// Bid history, most recent first.
pub async fn handle_get_auction_bids(
    State(market): State<Marketplace>,
    Path(auction_id): Path<String>,
) -> Result<Json<Vec<Bid>>, MarketError> {
    let store = market.lock().await;
    if store.auction(&auction_id).is_none() {
        return Err(MarketError::AuctionNotFound(auction_id));
    }
    Ok(Json(store.auction_bids(&auction_id)))
}

pub async fn handle_place_bid(
    State(market): State<Marketplace>,
    Path(auction_id): Path<String>,
    Json(cmd): Json<PlaceBidCommand>,
) -> Result<impl IntoResponse, MarketError> {
    info!(
        "{:<12} --> bid {} on auction {}",
        "Handler", cmd.amount, auction_id
    );
    let bid = market
        .lock()
        .await
        .place_bid(&auction_id, cmd.amount)
        .await?;
    Ok((StatusCode::CREATED, Json(bid)))
}

#[derive(Serialize)]
pub struct RemoveEndedResponse {
    pub removed: Vec<String>,
}

pub async fn handle_remove_ended(
    State(market): State<Marketplace>,
) -> Result<Json<RemoveEndedResponse>, MarketError> {
    let mut store = market.lock().await;
    store.accounts().require_user()?;
    let removed = store.remove_ended_auctions().await?;
    Ok(Json(RemoveEndedResponse { removed }))
}
// endregion: --- Auction Handlers

// region:    --- Notification Handlers

/// The session user's notifications.
pub async fn handle_get_notifications(
    State(market): State<Marketplace>,
) -> Result<Json<Vec<Notification>>, MarketError> {
    let store = market.lock().await;
    store.accounts().require_user()?;
    Ok(Json(
        store.current_notifications().into_iter().cloned().collect(),
    ))
}

/// Only the recipient may flip the flag. Unknown ids are a no-op.
pub async fn handle_mark_read(
    State(market): State<Marketplace>,
    Path(notification_id): Path<String>,
) -> Result<StatusCode, MarketError> {
    let mut store = market.lock().await;
    let user_id = store.accounts().require_user()?.id.clone();
    let recipient = store
        .notifications()
        .iter()
        .find(|n| n.id == notification_id)
        .map(|n| n.user_id.as_str());
    if recipient.is_some_and(|recipient| recipient != user_id) {
        return Err(MarketError::PermissionDenied);
    }
    store.mark_notification_read(&notification_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
// endregion: --- Notification Handlers
