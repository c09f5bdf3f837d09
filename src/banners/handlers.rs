use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    routing::get,
    Router,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{CreateBanner, UpdateBanner},
    repo::{Banner, BannerChanges, NewBanner},
};
use crate::{
    auth::extractors::{Admin, Authorized},
    error::ApiError,
    images::services::{read_form, remove_image, store_image, MAX_UPLOAD_BYTES},
    response::{parse_id, Envelope, PageQuery, Paginated, Pagination},
    state::AppState,
};

const IMAGE_FIELD: &str = "image";
const NOT_FOUND: &str = "Banner not found";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/banners", get(list_banners).post(create_banner))
        .route(
            "/banners/:id",
            get(get_banner).put(update_banner).delete(delete_banner),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024))
}

#[instrument(skip(state))]
pub async fn list_banners(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> Result<Paginated<Banner>, ApiError> {
    let (banners, total) = state.banners.list(q.search(), q.limit(), q.offset()).await?;
    Ok(Paginated::ok(banners, Pagination::new(total, &q), "Success get all banners"))
}

#[instrument(skip(state))]
pub async fn get_banner(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Envelope<Banner>, ApiError> {
    let id = parse_id(&id, NOT_FOUND)?;
    let banner = state
        .banners
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;
    Ok(Envelope::ok(banner, "Success get banner"))
}

#[instrument(skip_all)]
pub async fn create_banner(
    State(state): State<AppState>,
    Authorized { user, .. }: Authorized<Admin>,
    mp: Multipart,
) -> Result<Envelope<Banner>, ApiError> {
    let mut form = read_form(mp, IMAGE_FIELD).await?;
    let item = form
        .file
        .take()
        .ok_or_else(|| ApiError::bad_request("Banner image must be uploaded."))?;
    let input = CreateBanner::from_form(&form)?;

    let image = store_image(&state, item).await?;
    let banner = match state
        .banners
        .create(NewBanner {
            title: input.title,
            image: image.clone(),
            is_show: input.is_show,
        })
        .await
    {
        Ok(b) => b,
        Err(e) => {
            remove_image(&state, &image).await;
            return Err(e.into());
        }
    };

    info!(banner_id = %banner.id, admin_id = %user.id, "banner created");
    Ok(Envelope::ok(banner, "Banner created"))
}

#[instrument(skip_all)]
pub async fn update_banner(
    State(state): State<AppState>,
    Authorized { user, .. }: Authorized<Admin>,
    Path(id): Path<String>,
    mp: Multipart,
) -> Result<Envelope<Banner>, ApiError> {
    let id = parse_id(&id, NOT_FOUND)?;
    let existing = state
        .banners
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

    let mut form = read_form(mp, IMAGE_FIELD).await?;
    let input = UpdateBanner::from_form(&form)?;

    let new_image = match form.file.take() {
        Some(item) => Some(store_image(&state, item).await?),
        None => None,
    };

    let result = state
        .banners
        .update(
            id,
            BannerChanges {
                title: input.title,
                image: new_image.clone(),
                is_show: input.is_show,
            },
        )
        .await;

    let updated = match result {
        Ok(Some(b)) => b,
        other => {
            if let Some(url) = &new_image {
                remove_image(&state, url).await;
            }
            return Err(match other {
                Err(e) => e.into(),
                _ => ApiError::not_found(NOT_FOUND),
            });
        }
    };

    if new_image.is_some() {
        remove_image(&state, &existing.image).await;
    }

    info!(banner_id = %updated.id, admin_id = %user.id, "banner updated");
    Ok(Envelope::ok(updated, "Banner updated"))
}

#[instrument(skip_all)]
pub async fn delete_banner(
    State(state): State<AppState>,
    Authorized { user, .. }: Authorized<Admin>,
    Path(id): Path<String>,
) -> Result<Envelope<()>, ApiError> {
    let id = parse_id(&id, NOT_FOUND)?;
    let banner = state
        .banners
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

    remove_image(&state, &banner.image).await;

    if !state.banners.delete(id).await? {
        warn!(banner_id = %id, "banner vanished before delete");
        return Err(ApiError::not_found(NOT_FOUND));
    }

    info!(banner_id = %id, admin_id = %user.id, "banner deleted");
    Ok(Envelope::ok((), "Banner deleted"))
}
