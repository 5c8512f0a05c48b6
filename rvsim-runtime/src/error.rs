//! Runtime error types for the RV32 simulator

use rvsim_spec::IsaError;
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
    #[error("Spec error: {0}")]
    Spec(#[from] IsaError),

    #[error("Illegal instruction {word:#010x} at PC {pc:#010x}")]
    IllegalInstruction { word: u32, pc: u32 },

    #[error("Misaligned fetch: PC {pc:#010x}")]
    MisalignedFetch { pc: u32 },

    #[error("Misaligned access: address {address:#010x}, alignment {alignment}")]
    MisalignedAccess { address: u32, alignment: u32 },

    #[error("Write to protected code region: address {address:#010x}")]
    ProtectedWrite { address: u32 },

    #[error("Register index out of range: {index}")]
    RegisterOutOfRange { index: usize },

    #[error("Console input exhausted at PC {pc:#010x}")]
    InputExhausted { pc: u32 },

    #[error("Unknown environment call {code} at PC {pc:#010x}")]
    UnknownEnvCall { code: u32, pc: u32 },
}

pub type Result<T> = std::result::Result<T, SimError>;
