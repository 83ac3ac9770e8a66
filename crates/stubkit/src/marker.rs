//! Test markers and setup-time skip handling.

use crate::config::HarnessConfig;
use tracing::warn;

/// Reason reported when a `skip_if_real_aws` test is skipped.
pub const SKIP_IF_REAL_AWS_REASON: &str = "When run with actual AWS services instead of stub \
    functions, this test will fail because it uses test data. To run this test with AWS \
    services, you must first substitute actual data, such as user IDs, for test data.";

/// Markers a test can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    /// Run only when stubbed.
    SkipIfRealAws,
}

impl Marker {
    pub fn name(&self) -> &'static str {
        match self {
            Marker::SkipIfRealAws => "skip_if_real_aws",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Marker::SkipIfRealAws => "mark test to run only when stubbed.",
        }
    }
}

/// Whether a test should run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupOutcome {
    Run,
    Skip(String),
}

impl SetupOutcome {
    pub fn is_skip(&self) -> bool {
        matches!(self, SetupOutcome::Skip(_))
    }
}

/// Decide whether a test carrying `markers` runs under `config`.
pub fn runtest_setup(config: &HarnessConfig, markers: &[Marker]) -> SetupOutcome {
    if markers.contains(&Marker::SkipIfRealAws) && config.use_real_aws {
        warn!(
            marker = Marker::SkipIfRealAws.name(),
            description = Marker::SkipIfRealAws.description(),
            reason = SKIP_IF_REAL_AWS_REASON,
            "Skipping test"
        );
        SetupOutcome::Skip(SKIP_IF_REAL_AWS_REASON.to_string())
    } else {
        SetupOutcome::Run
    }
}

/// Return early from a test when it runs against real AWS.
///
/// ```rust,ignore
/// #[test]
/// fn test_uses_fake_user_ids() {
///     let scope = FixtureScope::from_env().unwrap();
///     stubkit::skip_if_real_aws!(scope.config());
///     // ...
/// }
/// ```
///
/// Functions that return a value pass it as the second argument.
#[macro_export]
macro_rules! skip_if_real_aws {
    ($config:expr) => {
        $crate::skip_if_real_aws!($config, ())
    };
    ($config:expr, $ret:expr) => {
        if $crate::marker::runtest_setup($config, &[$crate::marker::Marker::SkipIfRealAws])
            .is_skip()
        {
            return $ret;
        }
    };
}
