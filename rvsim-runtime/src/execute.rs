//! # Format Execution Skeletons
//!
//! One shared skeleton per [`Behavior`] family: extract operands for the
//! governing format, run the mnemonic hook, apply the post-effect (advance
//! the program counter by 4 unless the hook redirected control flow). Every
//! mutation flows through a recording helper so the [`HistoryEntry`] the
//! engine is assembling always mirrors exactly what forward execution
//! touched.
//!
//! Fault discipline: all faults are signaled before any state is mutated in
//! the current step, so a step that returns `Err` has changed nothing.

use crate::error::{Result, SimError};
use crate::history::HistoryEntry;
use crate::io::Console;
use crate::memory::AccessWidth;
use crate::state::{ExecutionState, HaltReason};
use rvsim_spec::instruction::{Behavior, InstructionDef, LoadWidth, StoreWidth};
use rvsim_spec::{Address, FloatRegister, MachineWord, Register};

/// What the executed instruction asks of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Halt(HaltReason),
}

/// Environment call codes (passed in a0).
const ENV_PRINT_INT: u32 = 1;
const ENV_PRINT_STRING: u32 = 4;
const ENV_READ_INT: u32 = 5;
const ENV_EXIT: u32 = 10;
const ENV_PRINT_HEX: u32 = 34;

/// Execute one decoded instruction against `state`.
pub(crate) fn execute(
    def: &'static InstructionDef,
    word: MachineWord,
    state: &mut ExecutionState,
    console: &mut Console,
    entry: &mut HistoryEntry,
    strict: bool,
) -> Result<Outcome> {
    match def.behavior {
        Behavior::IntOp(compute) => {
            let a = state.regs.read(word.rs1());
            let b = state.regs.read(word.rs2());
            write_int(state, entry, word.rd(), compute(a, b));
            advance(state);
        }
        Behavior::IntOpImm(compute) => {
            let a = state.regs.read(word.rs1());
            write_int(state, entry, word.rd(), compute(a, word.imm_i()));
            advance(state);
        }
        Behavior::Upper(compute) => {
            write_int(state, entry, word.rd(), compute(state.pc, word.imm_u()));
            advance(state);
        }
        Behavior::Branch(compare) => {
            let a = state.regs.read(word.rs1());
            let b = state.regs.read(word.rs2());
            if compare(a, b) {
                state.pc = state.pc.wrapping_add(word.imm_b() as u32);
            } else {
                advance(state);
            }
        }
        Behavior::Load(width) => {
            let addr = effective_address(state.regs.read(word.rs1()), word.imm_i());
            let value = load_value(state, addr, width)?;
            write_int(state, entry, word.rd(), value);
            advance(state);
        }
        Behavior::Store(width) => {
            let addr = effective_address(state.regs.read(word.rs1()), word.imm_s());
            let value = state.regs.read(word.rs2());
            let access = match width {
                StoreWidth::Byte => AccessWidth::Byte,
                StoreWidth::Half => AccessWidth::Half,
                StoreWidth::Word => AccessWidth::Word,
            };
            store_value(state, entry, addr, access, value)?;
            advance(state);
        }
        Behavior::Jal => {
            let link = state.pc.wrapping_add(4);
            write_int(state, entry, word.rd(), link);
            state.pc = state.pc.wrapping_add(word.imm_j() as u32);
        }
        Behavior::Jalr => {
            // Target is computed before the link write so rd == rs1 works.
            let target = effective_address(state.regs.read(word.rs1()), word.imm_i()) & !1;
            let link = state.pc.wrapping_add(4);
            write_int(state, entry, word.rd(), link);
            state.pc = target;
        }
        Behavior::Fence => {
            advance(state);
        }
        Behavior::System => {
            if word.imm_i() == 1 {
                tracing::debug!("ebreak at PC={:#010x}", state.pc);
                advance(state);
                return Ok(Outcome::Halt(HaltReason::Breakpoint));
            }
            return env_call(state, console, entry, strict);
        }
        Behavior::LoadFloat => {
            let addr = effective_address(state.regs.read(word.rs1()), word.imm_i());
            let bits = state.memory.read(addr, AccessWidth::Word)?;
            write_float(state, entry, word.frd(), bits);
            advance(state);
        }
        Behavior::StoreFloat => {
            let addr = effective_address(state.regs.read(word.rs1()), word.imm_s());
            let bits = state.fregs.read_bits(word.frs2());
            store_value(state, entry, addr, AccessWidth::Word, bits)?;
            advance(state);
        }
        Behavior::FloatOp(compute) => {
            let a = state.fregs.read(word.frs1());
            let b = state.fregs.read(word.frs2());
            write_float(state, entry, word.frd(), compute(a, b).to_bits());
            advance(state);
        }
        Behavior::FloatUnary(compute) => {
            let a = state.fregs.read(word.frs1());
            write_float(state, entry, word.frd(), compute(a).to_bits());
            advance(state);
        }
        Behavior::FloatBitOp(compute) => {
            let a = state.fregs.read_bits(word.frs1());
            let b = state.fregs.read_bits(word.frs2());
            write_float(state, entry, word.frd(), compute(a, b));
            advance(state);
        }
        Behavior::FloatCmp(compare) => {
            // Operands come from the float file; the 0/1 result lands in the
            // integer file.
            let a = state.fregs.read(word.frs1());
            let b = state.fregs.read(word.frs2());
            write_int(state, entry, word.rd(), compare(a, b) as u32);
            advance(state);
        }
        Behavior::FloatInspect(inspect) => {
            let bits = state.fregs.read_bits(word.frs1());
            write_int(state, entry, word.rd(), inspect(bits));
            advance(state);
        }
        Behavior::FloatToInt => {
            let value = state.fregs.read(word.frs1());
            let result = float_to_int(value, word.rs2_field() != 0);
            write_int(state, entry, word.rd(), result);
            advance(state);
        }
        Behavior::IntToFloat => {
            let a = state.regs.read(word.rs1());
            let value = if word.rs2_field() == 0 { a as i32 as f32 } else { a as f32 };
            write_float(state, entry, word.frd(), value.to_bits());
            advance(state);
        }
        Behavior::IntToFloatBits => {
            let bits = state.regs.read(word.rs1());
            write_float(state, entry, word.frd(), bits);
            advance(state);
        }
    }
    Ok(Outcome::Continue)
}

// ============================================================================
// Recording write helpers
// ============================================================================

#[inline]
fn write_int(state: &mut ExecutionState, entry: &mut HistoryEntry, rd: Register, value: u32) {
    entry.record_int(rd, state.regs.read(rd));
    state.regs.write(rd, value);
}

#[inline]
fn write_float(state: &mut ExecutionState, entry: &mut HistoryEntry, rd: FloatRegister, bits: u32) {
    entry.record_float(rd, state.fregs.read_bits(rd));
    state.fregs.write_bits(rd, bits);
}

/// Store with pre-image capture. The container word is read before the
/// write and recorded only once the write succeeds, so a faulting store
/// contributes no delta.
fn store_value(
    state: &mut ExecutionState,
    entry: &mut HistoryEntry,
    addr: Address,
    width: AccessWidth,
    value: u32,
) -> Result<()> {
    let (word_addr, old) = state.memory.backing_word(addr);
    state.memory.write(addr, width, value)?;
    entry.record_mem(word_addr, old);
    Ok(())
}

// ============================================================================
// Operand helpers
// ============================================================================

#[inline]
fn advance(state: &mut ExecutionState) {
    state.pc = state.pc.wrapping_add(4);
}

#[inline]
fn effective_address(base: u32, offset: i32) -> Address {
    base.wrapping_add(offset as u32)
}

fn load_value(state: &ExecutionState, addr: Address, width: LoadWidth) -> Result<u32> {
    let value = match width {
        LoadWidth::Byte => {
            let raw = state.memory.read(addr, AccessWidth::Byte)?;
            raw as u8 as i8 as i32 as u32
        }
        LoadWidth::ByteUnsigned => state.memory.read(addr, AccessWidth::Byte)?,
        LoadWidth::Half => {
            let raw = state.memory.read(addr, AccessWidth::Half)?;
            raw as u16 as i16 as i32 as u32
        }
        LoadWidth::HalfUnsigned => state.memory.read(addr, AccessWidth::Half)?,
        LoadWidth::Word => state.memory.read(addr, AccessWidth::Word)?,
    };
    Ok(value)
}

/// RISC-V float→integer conversion: truncate toward zero, saturate at the
/// integer bounds, and send NaN to the maximum integer.
fn float_to_int(value: f32, unsigned: bool) -> u32 {
    if unsigned {
        if value.is_nan() {
            u32::MAX
        } else {
            value as u32
        }
    } else if value.is_nan() {
        i32::MAX as u32
    } else {
        (value as i32) as u32
    }
}

// ============================================================================
// Environment calls
// ============================================================================

fn env_call(
    state: &mut ExecutionState,
    console: &mut Console,
    entry: &mut HistoryEntry,
    strict: bool,
) -> Result<Outcome> {
    let code = state.regs.read(Register::A0);
    match code {
        ENV_PRINT_INT => {
            console.print_int(state.regs.read(Register::A1) as i32);
        }
        ENV_PRINT_HEX => {
            console.print_hex(state.regs.read(Register::A1));
        }
        ENV_PRINT_STRING => {
            let text = read_c_string(state, state.regs.read(Register::A1))?;
            console.print_str(&text);
        }
        ENV_READ_INT => {
            let pc = state.pc;
            let value = console.read_int().ok_or(SimError::InputExhausted { pc })?;
            write_int(state, entry, Register::A0, value as u32);
        }
        ENV_EXIT => {
            let exit_code = state.regs.read(Register::A1) as i32;
            tracing::debug!("exit({}) at PC={:#010x}", exit_code, state.pc);
            advance(state);
            return Ok(Outcome::Halt(HaltReason::Exit(exit_code)));
        }
        _ if strict => {
            return Err(SimError::UnknownEnvCall { code, pc: state.pc });
        }
        _ => {
            tracing::warn!("ignoring unknown environment call {} at PC={:#010x}", code, state.pc);
        }
    }
    advance(state);
    Ok(Outcome::Continue)
}

/// Read a NUL-terminated string for the print-string call. Bounded so a
/// missing terminator cannot hang the step.
fn read_c_string(state: &ExecutionState, addr: Address) -> Result<String> {
    const MAX_LEN: u32 = 1 << 16;
    let mut bytes = Vec::new();
    for offset in 0..MAX_LEN {
        let byte = state.memory.read(addr.wrapping_add(offset), AccessWidth::Byte)?;
        if byte == 0 {
            break;
        }
        bytes.push(byte as u8);
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_to_int_saturation() {
        assert_eq!(float_to_int(3.9, false), 3);
        assert_eq!(float_to_int(-3.9, false), -3i32 as u32);
        assert_eq!(float_to_int(3.0e10, false), i32::MAX as u32);
        assert_eq!(float_to_int(-3.0e10, false), i32::MIN as u32);
        assert_eq!(float_to_int(f32::NAN, false), i32::MAX as u32);
        assert_eq!(float_to_int(-1.0, true), 0);
        assert_eq!(float_to_int(f32::NAN, true), u32::MAX);
        assert_eq!(float_to_int(1.0e10, true), u32::MAX);
    }

    #[test]
    fn test_effective_address_wraps() {
        assert_eq!(effective_address(0x0000_0000, -4), 0xFFFF_FFFC);
        assert_eq!(effective_address(0xFFFF_FFFC, 8), 0x0000_0004);
    }
}
