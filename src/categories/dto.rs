use crate::{error::ApiError, images::services::UploadForm};

/// Lowercase, runs of anything outside `[a-z0-9]` collapse to one `-`, no
/// leading or trailing dashes.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn non_empty(form: &UploadForm, field: &str, message: &str) -> Result<Option<String>, ApiError> {
    match form.text(field) {
        Some(v) if v.is_empty() => Err(ApiError::validation(field, message)),
        other => Ok(other),
    }
}

const NAME_REQUIRED: &str = "Category name is required";
const DESCRIPTION_REQUIRED: &str = "Description is required";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCategory {
    pub name: String,
    pub slug: String,
    pub description: String,
}

impl CreateCategory {
    pub fn from_form(form: &UploadForm) -> Result<Self, ApiError> {
        let name = non_empty(form, "name", NAME_REQUIRED)?
            .ok_or_else(|| ApiError::validation("name", NAME_REQUIRED))?;
        let description = non_empty(form, "description", DESCRIPTION_REQUIRED)?
            .ok_or_else(|| ApiError::validation("description", DESCRIPTION_REQUIRED))?;
        let slug = slugify(&name);
        if slug.is_empty() {
            return Err(ApiError::validation("name", "Category name must contain letters or digits"));
        }
        Ok(Self { name, slug, description })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateCategory {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
}

impl UpdateCategory {
    pub fn from_form(form: &UploadForm) -> Result<Self, ApiError> {
        let name = non_empty(form, "name", NAME_REQUIRED)?;
        let description = non_empty(form, "description", DESCRIPTION_REQUIRED)?;
        let slug = match &name {
            Some(n) => {
                let slug = slugify(n);
                if slug.is_empty() {
                    return Err(ApiError::validation("name", "Category name must contain letters or digits"));
                }
                Some(slug)
            }
            None => None,
        };
        Ok(Self { name, slug, description })
    }
}
