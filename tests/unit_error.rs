/// Unit tests for DiError and DiResult types

use ferrous_container::{DiError, DiResult, DisposeError};
use std::error::Error;
use std::sync::Arc;

#[test]
fn test_error_display_missing_registration() {
    let error = DiError::MissingRegistration { service: "app::Repository", name: None };
    assert_eq!(
        error.to_string(),
        "Required dependency of type app::Repository could not be resolved."
    );
}

#[test]
fn test_error_display_missing_named_registration() {
    let error = DiError::MissingRegistration {
        service: "app::Repository",
        name: Some("readonly".to_string()),
    };
    assert_eq!(
        error.to_string(),
        "Required dependency of type app::Repository named 'readonly' could not be resolved."
    );
}

#[test]
fn test_error_display_type_mismatch() {
    let error = DiError::TypeMismatch("alloc::string::String");
    assert_eq!(error.to_string(), "Type mismatch for: alloc::string::String");
}

#[test]
fn test_error_display_circular() {
    let error = DiError::Circular(vec!["A", "B", "A"]);
    assert_eq!(error.to_string(), "Circular dependency: A -> B -> A");
}

#[test]
fn test_error_display_depth_exceeded() {
    assert_eq!(DiError::DepthExceeded(1024).to_string(), "Max depth 1024 exceeded");
}

#[test]
fn test_error_display_construction() {
    let error = DiError::Construction("app::Handler");
    assert_eq!(
        error.to_string(),
        "No public constructor found for autowired type app::Handler"
    );
}

#[test]
fn test_error_display_configuration() {
    let error = DiError::Configuration("bad reuse".to_string());
    assert_eq!(error.to_string(), "Configuration error: bad reuse");
}

#[test]
fn test_error_display_container_dropped() {
    let error = DiError::ContainerDropped("app::Session");
    assert_eq!(error.to_string(), "Container owning app::Session has been dropped");
}

#[derive(Debug)]
struct Io;

impl std::fmt::Display for Io {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("socket closed")
    }
}

impl Error for Io {}

#[test]
fn test_dispose_error_exposes_source() {
    let source: DisposeError = Arc::new(Io);
    let error = DiError::Dispose { service: "app::Pool", source };

    assert_eq!(error.to_string(), "Failed to dispose app::Pool: socket closed");
    assert_eq!(error.source().unwrap().to_string(), "socket closed");
}

#[test]
fn test_simple_errors_have_no_source() {
    assert!(DiError::TypeMismatch("x").source().is_none());
    assert!(DiError::Circular(vec![]).source().is_none());
}

#[test]
fn test_errors_are_cloneable() {
    let error = DiError::Circular(vec!["A", "B"]);
    let cloned = error.clone();
    assert_eq!(error.to_string(), cloned.to_string());
}

#[test]
fn test_di_result_with_question_mark() {
    fn inner() -> DiResult<u8> {
        Err(DiError::TypeMismatch("u8"))
    }
    fn outer() -> DiResult<u8> {
        let value = inner()?;
        Ok(value + 1)
    }
    assert!(matches!(outer(), Err(DiError::TypeMismatch("u8"))));
}
