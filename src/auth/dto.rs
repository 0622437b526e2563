use serde::{Deserialize, Serialize};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub department: Option<String>,
    pub title: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response returned after a successful login.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_request_defaults_to_active() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"email":"a@x.com","full_name":"Ana Silva","password":"Abcdef12"}"#,
        )
        .expect("deserialize");
        assert!(req.active);
        assert!(req.department.is_none());
        assert!(req.title.is_none());
    }
}
