use std::fmt;

/// Length of an SQLSTATE code.
pub const SQLSTATE_SIZE: usize = 5;

/// Five character SQLSTATE classifying an [`crate::Error`]. The first two characters indicate the
/// class, the remaining three the subclass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct State(pub [u8; SQLSTATE_SIZE]);

impl State {
    /// General error. Used for invalid arguments, unknown parameter names and unset parameters.
    pub const GENERAL_ERROR: State = State(*b"S1000");
    /// Feature not supported.
    pub const FEATURE_NOT_SUPPORTED: State = State(*b"0A000");
    /// Attempt to assign to a column which is not updatable.
    pub const NOT_UPDATABLE: State = State(*b"0U000");
    /// Statement is closed.
    pub const STATEMENT_CLOSED: State = State(*b"07501");
    /// Large object wrapper, or stream over it, has been closed.
    pub const LOB_CLOSED: State = State(*b"0F503");
    /// Incompatible data type in conversion.
    pub const INCOMPATIBLE_CONVERSION: State = State(*b"42561");
    /// Numeric value out of range.
    pub const NUMERIC_OUT_OF_RANGE: State = State(*b"22003");
    /// Catch all for failures reported by the engine itself.
    pub const ENGINE_FAILURE: State = State(*b"HY000");

    /// View status code as string slice for displaying.
    pub fn as_str(&self) -> &str {
        // Only reachable with invalid UTF-8 assigned to the public field.
        std::str::from_utf8(&self.0).unwrap_or("?????")
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::State;

    #[test]
    fn display_state() {
        assert_eq!("07501", State::STATEMENT_CLOSED.to_string());
    }

    #[test]
    fn non_ascii_state_does_not_panic() {
        assert_eq!("?????", State([0xff; 5]).as_str());
    }
}
