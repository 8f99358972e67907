//! Domain error types.
//!
//! These errors describe line names and directions that cannot be
//! reconciled. They are distinct from I/O and fetch errors.

/// Domain-level errors raised while interpreting line names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Name or direction could not be split into exactly two segments
    #[error("name {name:?} or direction {direction:?} is not of the form \"origin - destination\"")]
    MalformedName { name: String, direction: String },

    /// Neither the origins nor the destinations line up, straight or crossed
    #[error(
        "direction {raw_origin},{raw_destination} does not match name {name_origin},{name_destination}"
    )]
    DirectionMismatch {
        name_origin: String,
        name_destination: String,
        raw_origin: String,
        raw_destination: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = DomainError::MalformedName {
            name: "ARANGOITI".into(),
            direction: "Arangoiti - Gran Via".into(),
        };
        assert_eq!(
            err.to_string(),
            "name \"ARANGOITI\" or direction \"Arangoiti - Gran Via\" is not of the form \"origin - destination\""
        );

        let err = DomainError::DirectionMismatch {
            name_origin: "ARANGOITI".into(),
            name_destination: "PLAZA BIRIBILA".into(),
            raw_origin: "ZAMAKOLA".into(),
            raw_destination: "AYALA".into(),
        };
        assert_eq!(
            err.to_string(),
            "direction ZAMAKOLA,AYALA does not match name ARANGOITI,PLAZA BIRIBILA"
        );
    }
}
