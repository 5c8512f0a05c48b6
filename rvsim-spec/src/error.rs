//! # Error Types for the ISA Layer

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum IsaError {
    /// No registered instruction matches the decoded key triple.
    #[error("Illegal instruction: {0:#010x}")]
    IllegalInstruction(u32),

    /// Register index outside 0-31. Unreachable from decoded fields;
    /// guards driver-supplied indices.
    #[error("Invalid register index: {0} (valid range: 0-31)")]
    InvalidRegister(u8),

    /// Entry point outside the program's code range.
    #[error("Entry point {entry:#010x} outside code range {base:#010x}..{end:#010x}")]
    EntryOutOfRange { entry: u32, base: u32, end: u32 },
}

pub type Result<T> = std::result::Result<T, IsaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_illegal_instruction_display() {
        let err = IsaError::IllegalInstruction(0xDEADBEEF);
        assert_eq!(err.to_string(), "Illegal instruction: 0xdeadbeef");
    }

    #[test]
    fn test_invalid_register_display() {
        let err = IsaError::InvalidRegister(40);
        assert_eq!(
            err.to_string(),
            "Invalid register index: 40 (valid range: 0-31)"
        );
    }
}
