use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::error::ApiError;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^\w+([\.-]?\w+)*@\w+([\.-]?\w+)*(\.\w{2,3})+$").unwrap();
    static ref PHONE_RE: Regex = Regex::new(r"^(\+62|62|0)[0-9]{9,12}$").unwrap();
}

const MAX_USERNAME_LEN: usize = 50;
const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub(crate) fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

/// Returns the trimmed value or a "required" validation error for `field`.
fn required(field: &str, value: Option<String>) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::validation(field, format!("{field} is required")))
}

/// Strength rules for a new password. Checked on registration and on
/// password change.
fn check_new_password(field: &str, password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(field, "password must be at least 6 characters"));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(ApiError::validation(field, "Contains at least one uppercase letter"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ApiError::validation(field, "Contains at least one number"));
    }
    Ok(())
}

/// Request body for user registration.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

/// A registration that passed validation. Email is trimmed and lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

impl RegisterRequest {
    /// Checks fields in order and reports the first failure.
    pub fn validate(self) -> Result<Registration, ApiError> {
        let full_name = required("fullName", self.full_name)?;

        let username = required("username", self.username)?;
        if username.chars().count() > MAX_USERNAME_LEN {
            return Err(ApiError::validation(
                "username",
                "Username must not be longer than 50 characters",
            ));
        }

        let email = required("email", self.email)?.to_lowercase();
        if !is_valid_email(&email) {
            return Err(ApiError::validation("email", "Invalid email format"));
        }

        // passwords are not trimmed
        let password = self
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ApiError::validation("password", "password is required"))?;
        check_new_password("password", &password)?;

        let confirm = self
            .confirm_password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ApiError::validation("confirmPassword", "Password confirmation is required"))?;
        if confirm != password {
            return Err(ApiError::validation("confirmPassword", "Password confirmation does not match"));
        }

        let phone = required("phone", self.phone)?;
        if !is_valid_phone(&phone) {
            return Err(ApiError::validation("phone", "Invalid phone number format"));
        }

        Ok(Registration {
            full_name,
            username,
            email,
            phone,
            password,
        })
    }
}

/// Request body for login.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub identifier: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub identifier: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(self) -> Result<Credentials, ApiError> {
        let identifier = required("identifier", self.identifier)?;
        let password = self
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ApiError::validation("password", "Password is required"))?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::validation("password", "Password must be at least 6 characters"));
        }
        Ok(Credentials { identifier, password })
    }
}

/// Request body for `PUT /auth/me`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub profile_picture: Option<String>,
}

impl UpdateProfileRequest {
    pub fn validate(self) -> Result<super::repo_types::ProfileChanges, ApiError> {
        let full_name = match self.full_name {
            Some(v) => Some(required("fullName", Some(v))?),
            None => None,
        };
        let phone = match self.phone {
            Some(v) => {
                let v = v.trim().to_string();
                if !is_valid_phone(&v) {
                    return Err(ApiError::validation("phone", "Invalid phone number format"));
                }
                Some(v)
            }
            None => None,
        };
        let profile_picture = match self.profile_picture {
            Some(v) => Some(required("profilePicture", Some(v))?),
            None => None,
        };
        Ok(super::repo_types::ProfileChanges {
            full_name,
            phone,
            profile_picture,
        })
    }
}

/// Request body for `PUT /auth/password`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
    pub confirm_password: Option<String>,
}

#[derive(Debug)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

impl ChangePasswordRequest {
    pub fn validate(self) -> Result<PasswordChange, ApiError> {
        let current_password = self
            .current_password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ApiError::validation("currentPassword", "Current password is required"))?;
        let new_password = self
            .new_password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ApiError::validation("newPassword", "New password is required"))?;
        check_new_password("newPassword", &new_password)?;
        if self.confirm_password.as_deref() != Some(new_password.as_str()) {
            return Err(ApiError::validation("confirmPassword", "Password confirmation does not match"));
        }
        Ok(PasswordChange {
            current_password,
            new_password,
        })
    }
}
