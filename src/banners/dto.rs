use crate::{error::ApiError, images::services::UploadForm};

/// Form booleans arrive as text.
fn parse_flag(field: &str, raw: &str) -> Result<bool, ApiError> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ApiError::validation(field, format!("{field} must be true or false"))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateBanner {
    pub title: String,
    pub is_show: bool,
}

impl CreateBanner {
    pub fn from_form(form: &UploadForm) -> Result<Self, ApiError> {
        let title = form
            .text("title")
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::validation("title", "Banner title is required"))?;
        let is_show = form
            .text("isShow")
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::validation("isShow", "Display status is required"))?;
        Ok(Self {
            title,
            is_show: parse_flag("isShow", &is_show)?,
        })
    }
}

/// Fields absent from the form keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateBanner {
    pub title: Option<String>,
    pub is_show: Option<bool>,
}

impl UpdateBanner {
    pub fn from_form(form: &UploadForm) -> Result<Self, ApiError> {
        let title = match form.text("title") {
            Some(t) if t.is_empty() => {
                return Err(ApiError::validation("title", "Banner title is required"))
            }
            other => other,
        };
        let is_show = form
            .text("isShow")
            .map(|v| parse_flag("isShow", &v))
            .transpose()?;
        Ok(Self { title, is_show })
    }
}
