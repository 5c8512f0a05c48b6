//! # Execution Engine
//!
//! Drives fetch → decode → execute one step at a time, strictly at the
//! caller's request; the engine never owns a thread or a timer. Each
//! successful step pushes one [`HistoryEntry`](crate::history::HistoryEntry),
//! and `undo` pops and restores entries in LIFO order.

use crate::error::{Result, SimError};
use crate::execute::{execute, Outcome};
use crate::history::{History, HistoryEntry};
use crate::io::Console;
use crate::memory::AccessWidth;
use crate::state::{ExecutionState, Status};
use rvsim_spec::{Address, MachineWord, Program, Registry};

/// Engine configuration, supplied by the driver.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum backstep depth. Zero disables backstep entirely.
    pub max_history: usize,

    /// Permit stores into the loaded code region.
    pub self_modify: bool,

    /// Treat recoverable oddities (unknown environment calls) as hard
    /// faults instead of warnings.
    pub strict: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_history: 2000,
            self_modify: false,
            strict: false,
        }
    }
}

/// RV32 execution engine.
pub struct Engine {
    registry: Registry,
    state: ExecutionState,
    history: History,
    console: Console,
    config: EngineConfig,
}

impl Engine {
    /// Create an engine with the program loaded and ready at its entry point.
    pub fn new(program: &Program, config: EngineConfig) -> Self {
        let mut state = ExecutionState::new(program);
        state.memory.set_self_modify(config.self_modify);

        Self {
            registry: Registry::new(),
            state,
            history: History::with_depth(config.max_history),
            console: Console::new(),
            config,
        }
    }

    /// Execute the instruction at the current program counter.
    ///
    /// On a halted or faulted engine this is a no-op returning the current
    /// status. A decode failure or execution fault transitions to
    /// [`Status::Faulted`], mutates nothing else, and pushes no history.
    /// Exception: [`SimError::InputExhausted`] leaves the engine Ready,
    /// since a blocking console read simply waits for the driver to queue
    /// input and call `step` again.
    pub fn step(&mut self) -> Result<Status> {
        if self.state.status != Status::Ready {
            return Ok(self.state.status);
        }

        let pc = self.state.pc;
        if pc % 4 != 0 {
            self.state.fault();
            return Err(SimError::MisalignedFetch { pc });
        }

        let bits = match self.state.memory.read(pc, AccessWidth::Word) {
            Ok(bits) => bits,
            Err(err) => {
                self.state.fault();
                return Err(err);
            }
        };
        let word = MachineWord::new(bits);

        let def = match self.registry.decode(word) {
            Ok(def) => def,
            Err(_) => {
                self.state.fault();
                return Err(SimError::IllegalInstruction { word: bits, pc });
            }
        };

        tracing::trace!("[{:6}] PC={:#010x} {}", self.state.steps, pc, def.mnemonic);

        let mut entry = HistoryEntry::new(pc);
        match execute(def, word, &mut self.state, &mut self.console, &mut entry, self.config.strict)
        {
            Ok(outcome) => {
                self.history.push(entry);
                self.state.steps += 1;
                if let Outcome::Halt(reason) = outcome {
                    self.state.halt(reason);
                }
                Ok(self.state.status)
            }
            Err(err) => {
                // A blocking read against an empty input queue withdraws the
                // step instead of faulting: nothing was mutated, and the
                // driver can queue input and step again.
                if !matches!(err, SimError::InputExhausted { .. }) {
                    self.state.fault();
                }
                tracing::debug!("fault at PC={:#010x}: {}", pc, err);
                Err(err)
            }
        }
    }

    /// Step while `continue_predicate` holds and the engine stays ready.
    ///
    /// The predicate is checked before every step; timeouts, breakpoints and
    /// step budgets belong to the driver and arrive through it.
    pub fn run<F>(&mut self, mut continue_predicate: F) -> Result<Status>
    where
        F: FnMut(&ExecutionState) -> bool,
    {
        while self.state.is_ready() && continue_predicate(&self.state) {
            self.step()?;
        }
        Ok(self.state.status)
    }

    /// Undo the most recent step. Returns `false` on empty history; that
    /// is a no-op, never an error.
    pub fn undo(&mut self) -> bool {
        match self.history.pop() {
            Some(entry) => {
                entry.restore(&mut self.state);
                true
            }
            None => false,
        }
    }

    /// Undo up to `count` steps; returns how many were actually undone.
    pub fn undo_steps(&mut self, count: usize) -> usize {
        let mut undone = 0;
        while undone < count && self.undo() {
            undone += 1;
        }
        undone
    }

    /// Disassemble the word at `addr` (defaults to nothing being executed).
    pub fn disassemble_at(&self, addr: Address) -> Result<String> {
        let bits = self.state.memory.read(addr, AccessWidth::Word)?;
        let word = MachineWord::new(bits);
        let def = self
            .registry
            .decode(word)
            .map_err(|_| SimError::IllegalInstruction { word: bits, pc: addr })?;
        Ok(def.disassemble(word))
    }

    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    /// Exclusive access for driver-side inspection and mutation. The engine
    /// is single-writer: callers must not interleave this with `step`/`undo`
    /// from another context.
    pub fn state_mut(&mut self) -> &mut ExecutionState {
        &mut self.state
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut Console {
        &mut self.console
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}
