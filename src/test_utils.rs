//! Shared knobs for the property-test suites.

/// Number of proptest cases to run, overridable through `PROPTEST_CASES`.
pub fn proptest_cases(default: u32) -> u32 {
    std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
