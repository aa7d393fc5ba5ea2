//! Kernel-internal test harness.
//!
//! No host `std`, so a test is just a plain function returning a
//! [`TestResult`]; suites are declared with [`test_suite!`] and run from a
//! debug shell command or a boot-time self-test pass (see `nanos-tests`).

/// Result of a single test execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TestResult {
    Pass,
    Fail,
}

impl TestResult {
    #[inline]
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// Metadata for a single registered test case.
pub struct TestCase {
    pub name: &'static str,
    pub func: fn() -> TestResult,
}

/// Aggregated results from running one suite.
#[derive(Clone, Copy, Debug, Default)]
pub struct SuiteResults {
    pub name: &'static str,
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
}

impl SuiteResults {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

pub fn run_suite(name: &'static str, tests: &[TestCase]) -> SuiteResults {
    let mut results = SuiteResults::new(name);
    results.total = tests.len() as u32;

    for test in tests {
        match (test.func)() {
            TestResult::Pass => results.passed += 1,
            TestResult::Fail => results.failed += 1,
        }
    }

    crate::klog_info!(
        "SUITE {}: {}/{} passed",
        name,
        results.passed,
        results.total
    );

    results
}

/// Return a passing test result.
#[macro_export]
macro_rules! pass {
    () => {
        $crate::testing::TestResult::Pass
    };
}

/// Return a failing test result, logging a reason first.
#[macro_export]
macro_rules! fail {
    () => {
        $crate::testing::TestResult::Fail
    };
    ($msg:expr) => {{
        $crate::klog_error!("TEST FAIL: {}", $msg);
        $crate::testing::TestResult::Fail
    }};
    ($fmt:expr, $($arg:tt)*) => {{
        $crate::klog_error!(concat!("TEST FAIL: ", $fmt), $($arg)*);
        $crate::testing::TestResult::Fail
    }};
}

/// Declare a test suite with automatic result collection.
///
/// ```ignore
/// test_suite!(scheduler_suite, [
///     test_create_task,
///     test_priority_dispatch,
/// ]);
/// ```
#[macro_export]
macro_rules! test_suite {
    ($name:ident, [$($test:ident),* $(,)?]) => {
        pub fn $name() -> $crate::testing::SuiteResults {
            let tests: &[$crate::testing::TestCase] = &[
                $(
                    $crate::testing::TestCase {
                        name: stringify!($test),
                        func: $test,
                    },
                )*
            ];
            $crate::testing::run_suite(stringify!($name), tests)
        }
    };
}
