pub mod audit;
pub mod blocklist;
pub mod configuration;
pub mod csrf;
pub mod error;
pub mod extractors;
pub mod input_sanitizer;
pub mod log_sanitizer;
pub mod logger;
pub mod middleware;
pub mod path_validator;
pub mod rate_limiter;
pub mod routes;
pub mod security;
pub mod startup;
pub mod telemetry;
pub mod url_validator;
pub mod validators;
pub mod xss;
