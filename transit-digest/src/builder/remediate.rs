//! Replacement of published line names with configured ones.

use tracing::info;

use super::error::BuildError;
use crate::domain::{Direction, Line, reverse_name};

/// Rename both directions of an agency line.
///
/// `expected` is the forward name; the backward line gets its reverse.
/// Fails unless both directions were found.
pub fn remediate_line_name(
    lines: &mut [Line],
    agency_id: &str,
    expected: &str,
) -> Result<(), BuildError> {
    let failure = |reason: String| BuildError::Remediation {
        agency_id: agency_id.to_string(),
        expected: expected.to_string(),
        reason,
    };
    let backward_name = reverse_name(expected).map_err(|e| failure(e.to_string()))?;

    let mut forward_done = false;
    let mut backward_done = false;
    for line in lines.iter_mut().filter(|l| l.agency_id == agency_id) {
        match line.direction {
            Direction::Forward => {
                line.name = expected.to_string();
                forward_done = true;
            }
            Direction::Backward => {
                line.name = backward_name.clone();
                backward_done = true;
            }
        }
    }

    match (forward_done, backward_done) {
        (true, true) => {
            info!(agency_id, name = expected, "line renamed");
            Ok(())
        }
        (false, _) => Err(failure("no forward line".to_string())),
        (_, false) => Err(failure("no backward line".to_string())),
    }
}
