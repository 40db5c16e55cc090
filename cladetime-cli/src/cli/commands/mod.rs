pub mod assign;
pub mod tree;
pub mod urls;

use cladetime::DateWarning;

/// Surface date adjustments made while building a `CladeTime`
pub fn report_date_warnings(warnings: &[DateWarning]) {
    for warning in warnings {
        crate::cli::output::warning(&warning.to_string());
    }
}
