//! Assertion helpers for stubbed service calls.

/// Assert that a result is Ok and extract the value.
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
    ($expr:expr, $msg:literal) => {
        match $expr {
            Ok(value) => value,
            Err(e) => panic!("{}: {:?}", $msg, e),
        }
    };
}

/// Assert that a result is Err and extract the error.
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match $expr {
            Ok(value) => panic!("Expected Err, got Ok: {:?}", value),
            Err(e) => e,
        }
    };
    ($expr:expr, $msg:literal) => {
        match $expr {
            Ok(value) => panic!("{}: {:?}", $msg, value),
            Err(e) => e,
        }
    };
}

/// Assert that a result failed with a service error carrying `code`.
///
/// ```rust
/// use stubkit::assert_service_error;
/// use stubkit::HarnessError;
///
/// let result: Result<(), HarnessError> = Err(HarnessError::service("TestException", ""));
/// assert_service_error!(result, "TestException");
/// ```
#[macro_export]
macro_rules! assert_service_error {
    ($expr:expr, $code:expr) => {
        match $expr {
            Ok(value) => panic!(
                "Expected service error {}, got Ok: {:?}",
                $code, value
            ),
            Err(e) => assert!(
                e.is_service_error($code),
                "Expected service error {}, got: {}",
                $code,
                e
            ),
        }
    };
}

#[cfg(test)]
mod tests {
    use stubkit_util::{HarnessError, StubResult};

    #[test]
    fn test_assert_ok() {
        let result: StubResult<i32> = Ok(42);
        let value = assert_ok!(result);
        assert_eq!(value, 42);
    }

    #[test]
    #[should_panic(expected = "Expected Ok")]
    fn test_assert_ok_fails() {
        let result: StubResult<i32> = Err(HarnessError::Config("bad".into()));
        assert_ok!(result);
    }

    #[test]
    fn test_assert_err() {
        let result: StubResult<i32> = Err(HarnessError::Config("bad".into()));
        let err = assert_err!(result, "should fail");
        assert!(matches!(err, HarnessError::Config(_)));
    }

    #[test]
    #[should_panic(expected = "Expected Err")]
    fn test_assert_err_fails() {
        let result: StubResult<i32> = Ok(1);
        assert_err!(result);
    }

    #[test]
    fn test_assert_service_error() {
        let result: StubResult<()> = Err(HarnessError::service("NoSuchKey", "missing"));
        assert_service_error!(result, "NoSuchKey");
    }

    #[test]
    #[should_panic(expected = "Expected service error NoSuchKey")]
    fn test_assert_service_error_wrong_code() {
        let result: StubResult<()> = Err(HarnessError::service("AccessDenied", "no"));
        assert_service_error!(result, "NoSuchKey");
    }
}
