use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::auth::dto::{LoginRequest, RegisterRequest, TokenResponse};
use crate::auth::password;
use crate::error::ApiError;
use crate::state::AppState;
use crate::users::dto::{PublicUser, StatusMessage, UserUpdate};
use crate::users::repo_types::{NewUser, User};

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn check_full_name(name: &str) -> Result<(), ApiError> {
    let len = name.chars().count();
    if !(3..=100).contains(&len) {
        return Err(ApiError::Validation(
            "full name must be between 3 and 100 characters".into(),
        ));
    }
    Ok(())
}

pub async fn register(state: &AppState, mut req: RegisterRequest) -> Result<PublicUser, ApiError> {
    req.email = req.email.trim().to_lowercase();

    if !is_valid_email(&req.email) {
        warn!(email = %req.email, "invalid email");
        return Err(ApiError::Validation("invalid email address".into()));
    }
    check_full_name(&req.full_name)?;
    if let Err(reason) = password::check_strength(&req.password) {
        warn!("weak password rejected");
        return Err(ApiError::WeakPassword(reason.into()));
    }

    if User::find_by_email(&state.db, &req.email).await?.is_some() {
        warn!(email = %req.email, "email already registered");
        return Err(ApiError::DuplicateEmail);
    }

    let password_hash = password::hash_password(&req.password)?;
    let user = User::create(
        &state.db,
        &NewUser {
            email: req.email,
            full_name: req.full_name,
            password_hash,
            department: req.department,
            title: req.title,
            active: req.active,
        },
    )
    .await?;

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok(user.into())
}

pub async fn authenticate(state: &AppState, req: LoginRequest) -> Result<TokenResponse, ApiError> {
    let email = req.email.trim().to_lowercase();

    // Unknown email and wrong password are indistinguishable to the caller.
    let Some(user) = User::find_by_email(&state.db, &email).await? else {
        warn!(email = %email, "login with unknown email");
        return Err(ApiError::InvalidCredentials);
    };
    if !password::verify_password(&req.password, &user.password_hash) {
        warn!(user_id = user.id, "login with invalid password");
        return Err(ApiError::InvalidCredentials);
    }
    if !user.active {
        warn!(user_id = user.id, "login on inactive account");
        return Err(ApiError::InactiveAccount);
    }

    let access_token = state.jwt.sign(&user.email)?;
    info!(user_id = user.id, "user logged in");
    Ok(TokenResponse {
        access_token,
        token_type: "bearer".into(),
    })
}

pub async fn get_current_user(state: &AppState, email: &str) -> Result<PublicUser, ApiError> {
    let user = User::find_by_email(&state.db, email)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(user.into())
}

/// Department is the query filter; the active flag refines the result set in
/// memory. Without a department, `active=true` uses the active-only query and
/// `active=false` fetches everything before refining.
pub async fn list_users(
    state: &AppState,
    department: Option<String>,
    active: Option<bool>,
) -> Result<Vec<PublicUser>, ApiError> {
    let users = match (&department, active) {
        (Some(dept), _) => {
            let rows = User::list_by_department(&state.db, dept).await?;
            refine_by_active(rows, active)
        }
        (None, Some(true)) => User::list_active(&state.db).await?,
        (None, Some(false)) => {
            let rows = User::list_all(&state.db).await?;
            refine_by_active(rows, active)
        }
        (None, None) => User::list_all(&state.db).await?,
    };
    Ok(users.into_iter().map(PublicUser::from).collect())
}

fn refine_by_active(mut rows: Vec<User>, active: Option<bool>) -> Vec<User> {
    if let Some(flag) = active {
        rows.retain(|u| u.active == flag);
    }
    rows
}

pub async fn get_user(state: &AppState, id: i64) -> Result<PublicUser, ApiError> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(user.into())
}

pub async fn update_user(
    state: &AppState,
    id: i64,
    patch: UserUpdate,
) -> Result<PublicUser, ApiError> {
    if let Some(name) = &patch.full_name {
        check_full_name(name)?;
    }
    let user = User::update(&state.db, id, &patch)
        .await?
        .ok_or(ApiError::NotFound)?;
    info!(user_id = user.id, "user updated");
    Ok(user.into())
}

pub async fn deactivate_user(state: &AppState, id: i64) -> Result<StatusMessage, ApiError> {
    if !User::soft_delete(&state.db, id).await? {
        return Err(ApiError::NotFound);
    }
    info!(user_id = id, "user deactivated");
    Ok(StatusMessage {
        message: "user deactivated".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn user(id: i64, active: bool) -> User {
        User {
            id,
            email: format!("u{id}@x.com"),
            full_name: "Test User".into(),
            password_hash: "hash".into(),
            department: None,
            title: None,
            active,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.example.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@x.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn full_name_bounds() {
        assert!(check_full_name("Ana").is_ok());
        assert!(check_full_name("Al").is_err());
        assert!(check_full_name(&"x".repeat(100)).is_ok());
        assert!(check_full_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn refine_keeps_matching_rows_only() {
        let rows = vec![user(1, true), user(2, false), user(3, true)];
        let active = refine_by_active(rows, Some(true));
        assert_eq!(active.iter().map(|u| u.id).collect::<Vec<_>>(), [1, 3]);

        let rows = vec![user(1, true), user(2, false), user(3, true)];
        let inactive = refine_by_active(rows, Some(false));
        assert_eq!(inactive.iter().map(|u| u.id).collect::<Vec<_>>(), [2]);
    }

    #[test]
    fn refine_without_flag_is_identity() {
        let rows = vec![user(1, true), user(2, false)];
        let out = refine_by_active(rows, None);
        assert_eq!(out.len(), 2);
    }
}
