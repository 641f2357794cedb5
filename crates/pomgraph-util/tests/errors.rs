use pomgraph_util::errors::PomgraphError;

#[test]
fn test_io_error_display() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
    let err = PomgraphError::from(io_err);
    assert!(err.to_string().contains("I/O error"), "got: {err}");
}

#[test]
fn test_xml_error_display() {
    let err = PomgraphError::Xml {
        origin: "pom.xml".to_string(),
        message: "unexpected end of file".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "Malformed XML in pom.xml: unexpected end of file"
    );
}

#[test]
fn test_config_error_display() {
    let err = PomgraphError::Config {
        message: "bad syntax".to_string(),
    };
    assert_eq!(err.to_string(), "Configuration error: bad syntax");
}

#[test]
fn test_resolution_error_display() {
    let err = PomgraphError::Resolution {
        message: "cycle".to_string(),
    };
    assert_eq!(err.to_string(), "Dependency resolution failed: cycle");
}

#[test]
fn test_network_error_display() {
    let err = PomgraphError::Network {
        message: "timeout".to_string(),
    };
    assert_eq!(err.to_string(), "Network error: timeout");
}

#[test]
fn test_generic_error_display() {
    let err = PomgraphError::Generic {
        message: "something broke".to_string(),
    };
    assert_eq!(err.to_string(), "something broke");
}

#[test]
fn test_io_error_from_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err: PomgraphError = io_err.into();
    assert!(matches!(err, PomgraphError::Io(_)));
}
