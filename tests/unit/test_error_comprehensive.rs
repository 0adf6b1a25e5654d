use migrator::core::error::AppError;
use migrator::core::types::{ErrorCategory, ErrorSeverity};

#[test]
fn test_error_creation_all_categories() {
    let categories = vec![
        ErrorCategory::ValidationError,
        ErrorCategory::NotFound,
        ErrorCategory::RemoteError,
        ErrorCategory::ActionNotAllowed,
        ErrorCategory::PersistenceError,
        ErrorCategory::SerializationError,
        ErrorCategory::ConfigurationError,
        ErrorCategory::IoError,
        ErrorCategory::InternalError,
    ];

    for category in categories {
        let error = AppError::new(category, "test message");
        assert_eq!(error.category, category);
        assert_eq!(error.message, "test message");
        assert!(error.context.is_empty());
        assert!(error.recovery_suggestions.is_empty());
        assert!(error.occurred_at <= chrono::Utc::now());
        assert!(error.source.is_none());
    }
}

#[test]
fn test_error_severity_mapping() {
    let test_cases = vec![
        (ErrorCategory::ValidationError, ErrorSeverity::Error),
        (ErrorCategory::NotFound, ErrorSeverity::Warning),
        (ErrorCategory::RemoteError, ErrorSeverity::Error),
        (ErrorCategory::ActionNotAllowed, ErrorSeverity::Warning),
        (ErrorCategory::PersistenceError, ErrorSeverity::Error),
        (ErrorCategory::ConfigurationError, ErrorSeverity::Error),
    ];

    for (category, expected_severity) in test_cases {
        let error = AppError::new(category, "test");
        assert_eq!(error.severity(), expected_severity);
    }
}

#[test]
fn test_only_persistence_errors_are_fatal() {
    assert!(!AppError::persistence("jobs.json is corrupt").is_recoverable());
    assert!(AppError::remote("connection refused").is_recoverable());
    assert!(AppError::not_allowed("job is migrating").is_recoverable());
    assert!(AppError::validation("empty label").is_recoverable());
}

#[test]
fn test_constructor_codes() {
    assert_eq!(AppError::validation("x").code, "VALIDATION");
    assert_eq!(AppError::not_allowed("x").code, "NOT_ALLOWED");
    assert_eq!(AppError::remote("x").code, "REMOTE");
    assert_eq!(AppError::persistence("x").code, "PERSISTENCE");

    let missing = AppError::not_found("job", "42");
    assert_eq!(missing.code, "NOT_FOUND");
    assert_eq!(missing.category, ErrorCategory::NotFound);
    assert_eq!(missing.message, "job '42' not found");
    assert_eq!(missing.context.get("context").map(String::as_str), Some("42"));
}

#[test]
fn test_remote_error_suggests_checking_service() {
    let error = AppError::remote("timed out");
    assert_eq!(error.recovery_suggestions.len(), 1);
    assert!(error.recovery_suggestions[0].contains("transformation service"));
}

#[test]
fn test_error_add_context() {
    let mut error = AppError::new(ErrorCategory::RemoteError, "abort failed");

    error.add_context("job_id", "17");
    error.add_context("action", "abort");

    assert_eq!(error.context.len(), 2);
    assert_eq!(error.context.get("job_id").map(String::as_str), Some("17"));
    assert_eq!(error.context.get("action").map(String::as_str), Some("abort"));
}

#[test]
fn test_error_display_includes_category_and_context() {
    let error = AppError::not_allowed("cannot abort job '3'").with_context("3");
    let rendered = error.to_string();
    assert!(rendered.contains("NOT_ALLOWED"));
    assert!(rendered.contains("ActionNotAllowed"));
    assert!(rendered.contains("cannot abort job '3'"));
    assert!(rendered.contains("Context"));
}

#[test]
fn test_error_with_source() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
    let error = AppError::with_source(ErrorCategory::PersistenceError, "save failed", Box::new(io));
    assert!(error.source.is_some());
    assert!(error.to_string().contains("Caused by: read-only"));
}

#[test]
fn test_error_conversions() {
    let io_error: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
    assert_eq!(io_error.category, ErrorCategory::IoError);
    assert_eq!(io_error.code, "IO_ERROR");

    let json_error: AppError = serde_json::from_str::<serde_json::Value>("{")
        .unwrap_err()
        .into();
    assert_eq!(json_error.category, ErrorCategory::SerializationError);

    let anyhow_error: AppError = anyhow::anyhow!("boom").into();
    assert_eq!(anyhow_error.category, ErrorCategory::InternalError);
    assert_eq!(anyhow_error.message, "boom");
}

#[test]
fn test_is_category() {
    let error = AppError::not_allowed("no");
    assert!(error.is_category(ErrorCategory::ActionNotAllowed));
    assert!(!error.is_category(ErrorCategory::ValidationError));
}
