//! OAuth protocol constants
//!
//! Field names and fixed values of the installed-application flow.

// Default Google endpoints
pub const DEFAULT_AUTHORIZATION_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_USERINFO_URL: &str =
    "https://openidconnect.googleapis.com/v1/userinfo?access_token=";

// Loopback redirect
pub const LOOPBACK_ADDRESS_BASE: &str = "http://127.0.0.1:";
pub const DEFAULT_LOOPBACK_PATH: &str = "/google_oauth";
pub const DEFAULT_APPLICATION_NAME: &str = "the application";

// Request fields
pub const FIELD_CLIENT_ID: &str = "client_id";
pub const FIELD_CLIENT_SECRET: &str = "client_secret";
pub const FIELD_GRANT_TYPE: &str = "grant_type";
pub const FIELD_REFRESH_TOKEN: &str = "refresh_token";
pub const FIELD_CODE: &str = "code";
pub const FIELD_REDIRECT_URI: &str = "redirect_uri";
pub const FIELD_SCOPE: &str = "scope";
pub const FIELD_RESPONSE_TYPE: &str = "response_type";

pub const GRANT_TYPE_REFRESH_TOKEN: &str = "refresh_token";
pub const GRANT_TYPE_AUTHORIZATION_CODE: &str = "authorization_code";
pub const RESPONSE_TYPE_CODE: &str = "code";

// Response fields
pub const FIELD_ACCESS_TOKEN: &str = "access_token";
pub const FIELD_EXPIRES_IN: &str = "expires_in";
pub const FIELD_ERROR: &str = "error";
pub const FIELD_ERROR_DESCRIPTION: &str = "error_description";
pub const ERROR_INVALID_GRANT: &str = "invalid_grant";

// Content types
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_HTML: &str = "text/html";
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";

// HTTP client
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
