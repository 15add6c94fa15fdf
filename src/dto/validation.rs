//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest accepted match, team, stage or court name.
pub const MAX_NAME_LEN: usize = 120;

/// Validates that a best-of count is odd and between 1 and 7.
///
/// # Examples
///
/// ```ignore
/// validate_best_of_sets(3) // Ok
/// validate_best_of_sets(4) // Err - even
/// validate_best_of_sets(9) // Err - too many sets
/// ```
pub fn validate_best_of_sets(best_of_sets: u8) -> Result<(), ValidationError> {
    if !(1..=7).contains(&best_of_sets) {
        let mut err = ValidationError::new("best_of_sets_range");
        err.message = Some(format!("best_of_sets must be between 1 and 7 (got {best_of_sets})").into());
        return Err(err);
    }

    if best_of_sets % 2 == 0 {
        let mut err = ValidationError::new("best_of_sets_parity");
        err.message = Some("best_of_sets must be odd so a majority exists".into());
        return Err(err);
    }

    Ok(())
}

/// Validates the tie-break target (1 to 99 points).
pub fn validate_tie_break_points(points: u16) -> Result<(), ValidationError> {
    if !(1..=99).contains(&points) {
        let mut err = ValidationError::new("tie_break_points_range");
        err.message = Some(format!("tie_break_points must be between 1 and 99 (got {points})").into());
        return Err(err);
    }
    Ok(())
}

/// Validates an optional free-text label against [`MAX_NAME_LEN`].
pub fn validate_label(value: &str) -> Result<(), ValidationError> {
    if value.chars().count() > MAX_NAME_LEN {
        let mut err = ValidationError::new("label_length");
        err.message = Some(format!("must be at most {MAX_NAME_LEN} characters").into());
        return Err(err);
    }
    Ok(())
}
