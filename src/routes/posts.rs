use actix_web::HttpResponse;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::extractors::SanitizedJson;
use crate::validators::{validate_post_content, validate_wallet_address};

#[derive(Deserialize)]
pub struct CreatePost {
    content: String,
    wallet_address: Option<String>,
}

#[derive(Serialize)]
struct PostResponse {
    id: String,
    content: String,
    wallet_address: Option<String>,
    created_at: String,
}

/// Accepts a post whose text fields were HTML-escaped during extraction
pub async fn create_post(post: SanitizedJson<CreatePost>) -> Result<HttpResponse, AppError> {
    let CreatePost {
        content,
        wallet_address,
    } = post.into_inner();

    validate_post_content(&content)?;
    let wallet_address = wallet_address
        .as_deref()
        .map(validate_wallet_address)
        .transpose()?;

    let id = Uuid::new_v4().to_string();
    tracing::info!(post_id = %id, has_wallet = wallet_address.is_some(), "Post accepted");

    Ok(HttpResponse::Created().json(PostResponse {
        id,
        content,
        wallet_address,
        created_at: Utc::now().to_rfc3339(),
    }))
}
