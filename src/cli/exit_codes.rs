//! exit codes for acard commands
//!
//! these follow Unix conventions where 0 = success and non-zero = error
//! specific codes help scripts distinguish between failure types

/// command completed successfully
pub const SUCCESS: i32 = 0;

/// general or unknown error
pub const ERROR: i32 = 1;

/// invalid command-line arguments
pub const INVALID_ARGS: i32 = 2;

/// card configuration missing or invalid
pub const CONFIG_ERROR: i32 = 3;

/// state snapshot missing or invalid
pub const STATES_ERROR: i32 = 4;

/// a template failed to evaluate
pub const TEMPLATE_ERROR: i32 = 5;

/// a rule could not be matched
pub const RULE_ERROR: i32 = 6;

/// entity is not in the state snapshot
pub const ENTITY_NOT_FOUND: i32 = 7;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let codes = [
            SUCCESS,
            ERROR,
            INVALID_ARGS,
            CONFIG_ERROR,
            STATES_ERROR,
            TEMPLATE_ERROR,
            RULE_ERROR,
            ENTITY_NOT_FOUND,
        ];

        for (i, &code) in codes.iter().enumerate() {
            for (j, &other) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(code, other, "exit codes must be unique");
                }
            }
        }
    }

    #[test]
    fn test_success_is_zero() {
        assert_eq!(SUCCESS, 0);
    }
}
