//! # RV32 Simulator Runtime
//!
//! Executes RV32I/M/F programs step by step with reversible history.
//!
//! ## Features
//!
//! - **Caller-driven execution**: `step()` / `run(predicate)`, no internal
//!   threads or timers
//! - **Backstep**: bounded undo log of reversible deltas, `undo()` is O(1)
//! - **Typed faults**: illegal instructions, misaligned accesses, and
//!   protected writes surface as [`SimError`] values
//! - **Self-modifying-code gate**: stores into the code region fault unless
//!   explicitly enabled
//! - **Console environment calls**: print/read integers and strings through
//!   a driver-owned queue
//!
//! ## Example
//!
//! ```rust
//! use rvsim_runtime::{Engine, EngineConfig};
//! use rvsim_spec::{encode, Program, Register};
//!
//! let program = Program::new(vec![
//!     encode::addi(Register::A0, Register::ZERO, 41),
//!     encode::addi(Register::A0, Register::A0, 1),
//!     encode::ebreak(),
//! ]);
//! let mut engine = Engine::new(&program, EngineConfig::default());
//! engine.run(|_| true).unwrap();
//! assert_eq!(engine.state().regs.read(Register::A0), 42);
//! engine.undo();
//! assert_eq!(engine.state().regs.read(Register::A0), 42);
//! engine.undo();
//! assert_eq!(engine.state().regs.read(Register::A0), 41);
//! ```

pub mod engine;
pub mod error;
pub mod execute;
pub mod history;
pub mod io;
pub mod memory;
pub mod registers;
pub mod state;

pub use engine::{Engine, EngineConfig};
pub use error::SimError;
pub use execute::Outcome;
pub use history::{Delta, History, HistoryEntry};
pub use io::Console;
pub use memory::{AccessWidth, Memory};
pub use registers::{FloatRegisterFile, RegisterFile};
pub use state::{ExecutionState, HaltReason, Status};

/// Simple execution helper
///
/// Runs a program with queued console inputs until it halts or retires
/// `max_steps` instructions, and returns the console output.
pub fn run_program(
    program: &rvsim_spec::Program,
    inputs: Vec<i32>,
    max_steps: u64,
) -> Result<String, SimError> {
    let mut engine = Engine::new(program, EngineConfig::default());
    for value in inputs {
        engine.console_mut().push_input(value);
    }
    engine.run(|state| state.steps < max_steps)?;
    Ok(engine.console_mut().take_output())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rvsim_spec::{encode, Program, Register};

    #[test]
    fn test_public_exports() {
        let _ = EngineConfig::default();
        let _ = Status::Ready;
        let _ = AccessWidth::Word;
        let _ = Console::new();
    }

    #[test]
    fn test_engine_config_default() {
        let config = EngineConfig::default();
        assert_eq!(config.max_history, 2000);
        assert!(!config.self_modify);
        assert!(!config.strict);
    }

    #[test]
    fn test_run_program_helper() {
        let program = Program::new(vec![
            encode::addi(Register::A1, Register::ZERO, 7),
            encode::addi(Register::A0, Register::ZERO, 1),
            encode::ecall(),
            encode::addi(Register::A0, Register::ZERO, 10),
            encode::ecall(),
        ]);
        let output = run_program(&program, vec![], 1_000).unwrap();
        assert_eq!(output, "7");
    }
}
