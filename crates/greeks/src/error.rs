//! Greeks kernel error types

use thiserror::Error;

/// Errors raised while building kernel inputs
///
/// Degenerate market parameters are not errors: the calculator answers them
/// with a zero result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GreeksError {
    /// Option type tag is neither call nor put
    #[error("Invalid option type: {0}. Must be one of: CE, PE, CALL, PUT")]
    InvalidOptionType(String),
}
