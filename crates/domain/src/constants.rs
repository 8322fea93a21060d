//! Protocol constants
//!
//! Centralized location for the header names, status codes, and defaults the
//! API client layer relies on.

// Transport
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_USER_AGENT: &str = "lugn-client/0.1";
pub const CONTENT_TYPE_JSON: &str = "application/json";

// Headers
pub const CSRF_HEADER: &str = "X-CSRFToken";
pub const RETRY_AFTER_HEADER: &str = "retry-after";
pub const BEARER_PREFIX: &str = "Bearer ";

// Retry policy
pub const MAX_RETRIES: u32 = 3;
pub const BASE_DELAY_MS: u64 = 1_000;
pub const RETRYABLE_STATUS_CODES: [u16; 6] = [408, 429, 500, 502, 503, 504];

// Classification
pub const TIMEOUT_STATUS_CODES: [u16; 2] = [408, 504];
pub const TRANSIENT_SERVER_STATUS_CODES: [u16; 3] = [500, 502, 503];
pub const DEFAULT_RATE_LIMIT_SECS: u64 = 60;

// CSRF
pub const CSRF_TTL_SECS: u64 = 3_600;
pub const DEFAULT_CSRF_PATH: &str = "/api/csrf-token/";

// Credential refresh
pub const DEFAULT_REFRESH_PATH: &str = "/api/auth/refresh/";
pub const DEFAULT_LOGOUT_PATH: &str = "/api/auth/logout/";

// Configuration
pub const ENV_API_BASE_URL: &str = "LUGN_API_BASE_URL";

// Telemetry event names
pub const EVENT_API_REQUEST: &str = "api_request";
pub const EVENT_API_ERROR: &str = "api_error";
pub const EVENT_API_RATE_LIMITED: &str = "api_rate_limited";
