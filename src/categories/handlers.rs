use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    routing::get,
    Router,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{CreateCategory, UpdateCategory},
    repo::{Category, CategoryChanges, NewCategory},
};
use crate::{
    auth::extractors::{Admin, Authorized},
    error::ApiError,
    images::services::{read_form, remove_image, store_image, MAX_UPLOAD_BYTES},
    response::{parse_id, Envelope, PageQuery, Paginated, Pagination},
    state::AppState,
};

const ICON_FIELD: &str = "icon";
const NOT_FOUND: &str = "Category not found";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024))
}

#[instrument(skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> Result<Paginated<Category>, ApiError> {
    let (categories, total) = state
        .categories
        .list(q.search(), q.limit(), q.offset())
        .await?;
    Ok(Paginated::ok(
        categories,
        Pagination::new(total, &q),
        "Success get all categories",
    ))
}

#[instrument(skip(state))]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Envelope<Category>, ApiError> {
    let id = parse_id(&id, NOT_FOUND)?;
    let category = state
        .categories
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;
    Ok(Envelope::ok(category, "Success get category"))
}

#[instrument(skip_all)]
pub async fn create_category(
    State(state): State<AppState>,
    Authorized { user, .. }: Authorized<Admin>,
    mp: Multipart,
) -> Result<Envelope<Category>, ApiError> {
    let mut form = read_form(mp, ICON_FIELD).await?;
    let item = form
        .file
        .take()
        .ok_or_else(|| ApiError::bad_request("Category icon must be uploaded."))?;
    let input = CreateCategory::from_form(&form)?;

    let icon = store_image(&state, item).await?;
    let created = state
        .categories
        .create(NewCategory {
            name: input.name,
            slug: input.slug,
            description: input.description,
            icon: icon.clone(),
        })
        .await;

    let category = match created {
        Ok(c) => c,
        Err(e) => {
            remove_image(&state, &icon).await;
            return Err(e.into());
        }
    };

    info!(category_id = %category.id, slug = %category.slug, admin_id = %user.id, "category created");
    Ok(Envelope::ok(category, "Category created"))
}

#[instrument(skip_all)]
pub async fn update_category(
    State(state): State<AppState>,
    Authorized { user, .. }: Authorized<Admin>,
    Path(id): Path<String>,
    mp: Multipart,
) -> Result<Envelope<Category>, ApiError> {
    let id = parse_id(&id, NOT_FOUND)?;
    let existing = state
        .categories
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

    let mut form = read_form(mp, ICON_FIELD).await?;
    let input = UpdateCategory::from_form(&form)?;

    let new_icon = match form.file.take() {
        Some(item) => Some(store_image(&state, item).await?),
        None => None,
    };

    let result = state
        .categories
        .update(
            id,
            CategoryChanges {
                name: input.name,
                slug: input.slug,
                description: input.description,
                icon: new_icon.clone(),
            },
        )
        .await;

    let updated = match result {
        Ok(Some(c)) => c,
        other => {
            if let Some(url) = &new_icon {
                remove_image(&state, url).await;
            }
            return Err(match other {
                Err(e) => e.into(),
                _ => ApiError::not_found(NOT_FOUND),
            });
        }
    };

    if new_icon.is_some() {
        remove_image(&state, &existing.icon).await;
    }

    info!(category_id = %updated.id, admin_id = %user.id, "category updated");
    Ok(Envelope::ok(updated, "Category updated"))
}

#[instrument(skip_all)]
pub async fn delete_category(
    State(state): State<AppState>,
    Authorized { user, .. }: Authorized<Admin>,
    Path(id): Path<String>,
) -> Result<Envelope<()>, ApiError> {
    let id = parse_id(&id, NOT_FOUND)?;
    let category = state
        .categories
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

    remove_image(&state, &category.icon).await;

    if !state.categories.delete(id).await? {
        warn!(category_id = %id, "category vanished before delete");
        return Err(ApiError::not_found(NOT_FOUND));
    }

    info!(category_id = %id, admin_id = %user.id, "category deleted");
    Ok(Envelope::ok((), "Category deleted"))
}
