//! # Dispatch Registry
//!
//! Read-only lookup table from `(opcode, funct3, funct7)` keys to
//! [`InstructionDef`] entries, built once from [`INSTRUCTIONS`]. Two
//! descriptors claiming the same key is a table bug, asserted at build time;
//! a lookup miss at decode time is an [`IsaError::IllegalInstruction`].

use crate::error::IsaError;
use crate::instruction::{InstructionDef, INSTRUCTIONS};
use crate::word::MachineWord;
use std::collections::HashMap;

type Key = (u8, Option<u8>, Option<u8>);

/// Instruction dispatch table.
pub struct Registry {
    map: HashMap<Key, &'static InstructionDef>,
}

impl Registry {
    /// Build the table. Panics if two descriptors share a key; that is a
    /// defect in [`INSTRUCTIONS`], not a runtime condition.
    pub fn new() -> Self {
        let mut map: HashMap<Key, &'static InstructionDef> =
            HashMap::with_capacity(INSTRUCTIONS.len());
        for def in INSTRUCTIONS {
            if let Some(previous) = map.insert(def.key(), def) {
                panic!(
                    "instruction table collision: {} and {} both claim {:?}",
                    previous.mnemonic, def.mnemonic, def.key()
                );
            }
        }
        Registry { map }
    }

    /// Decode a fetched word to its descriptor.
    ///
    /// Keys are probed from most to least discriminated:
    /// `(opcode, funct3, funct7)`, `(opcode, funct3)`, `(opcode, funct7)`,
    /// `(opcode)`. The `(opcode, funct7)` shape serves the OP-FP arithmetic
    /// group, where funct3 holds a rounding mode rather than a discriminator.
    pub fn decode(&self, word: MachineWord) -> Result<&'static InstructionDef, IsaError> {
        let opcode = word.opcode();
        let funct3 = word.funct3();
        let funct7 = word.funct7();

        self.map
            .get(&(opcode, Some(funct3), Some(funct7)))
            .or_else(|| self.map.get(&(opcode, Some(funct3), None)))
            .or_else(|| self.map.get(&(opcode, None, Some(funct7))))
            .or_else(|| self.map.get(&(opcode, None, None)))
            .copied()
            .ok_or(IsaError::IllegalInstruction(word.bits()))
    }

    /// Number of registered descriptors.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Look up a descriptor by mnemonic. Linear; intended for tooling and
    /// usage display, not the decode path.
    pub fn find(&self, mnemonic: &str) -> Option<&'static InstructionDef> {
        INSTRUCTIONS.iter().find(|def| def.mnemonic == mnemonic)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").field("entries", &self.map.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode;
    use crate::register::{FloatRegister, Register};

    #[test]
    fn test_build_is_collision_free() {
        let registry = Registry::new();
        assert_eq!(registry.len(), INSTRUCTIONS.len());
    }

    #[test]
    fn test_decode_r_format() {
        let registry = Registry::new();
        let word = MachineWord::new(encode::add(Register::RA, Register::SP, Register::GP));
        assert_eq!(registry.decode(word).unwrap().mnemonic, "add");

        let word = MachineWord::new(encode::sub(Register::RA, Register::SP, Register::GP));
        assert_eq!(registry.decode(word).unwrap().mnemonic, "sub");

        let word = MachineWord::new(encode::mul(Register::RA, Register::SP, Register::GP));
        assert_eq!(registry.decode(word).unwrap().mnemonic, "mul");
    }

    #[test]
    fn test_decode_opcode_only_keys() {
        let registry = Registry::new();
        assert_eq!(
            registry.decode(MachineWord::new(encode::lui(Register::RA, 1))).unwrap().mnemonic,
            "lui"
        );
        assert_eq!(
            registry.decode(MachineWord::new(encode::jal(Register::RA, 8))).unwrap().mnemonic,
            "jal"
        );
    }

    #[test]
    fn test_decode_immediate_shift_uses_funct7() {
        let registry = Registry::new();
        let srli = MachineWord::new(encode::srli(Register::RA, Register::SP, 3));
        let srai = MachineWord::new(encode::srai(Register::RA, Register::SP, 3));
        assert_eq!(registry.decode(srli).unwrap().mnemonic, "srli");
        assert_eq!(registry.decode(srai).unwrap().mnemonic, "srai");
    }

    #[test]
    fn test_decode_fp_arithmetic_ignores_rounding_mode() {
        let registry = Registry::new();
        // fadd.s with a nonzero rm in the funct3 field still decodes.
        let word = MachineWord::new(crate::encode::encode_r(0x53, 1, 0b111, 2, 3, 0x00));
        assert_eq!(registry.decode(word).unwrap().mnemonic, "fadd.s");
    }

    #[test]
    fn test_decode_float_compare() {
        let registry = Registry::new();
        let f1 = FloatRegister::new(1).unwrap();
        let f2 = FloatRegister::new(2).unwrap();
        let word = MachineWord::new(encode::fle_s(Register::RA, f1, f2));
        assert_eq!(registry.decode(word).unwrap().mnemonic, "fle.s");
    }

    #[test]
    fn test_decode_miss_is_illegal_instruction() {
        let registry = Registry::new();
        let word = MachineWord::new(0xFFFF_FFFF);
        assert_eq!(
            registry.decode(word).unwrap_err(),
            IsaError::IllegalInstruction(0xFFFF_FFFF)
        );
    }

    #[test]
    fn test_find_by_mnemonic() {
        let registry = Registry::new();
        assert!(registry.find("bge").is_some());
        assert!(registry.find("nosuch").is_none());
    }
}
