//! Instruction decoder.
//!
//! Instructions are ordinary words.  The left half carries the
//! operation, the right half the address:
//!
//! ```text
//! left half                                   right half
//! 15   14..12  11..8   7..6    5     4..0     15    14..0
//! sign class   opcode  index   bank  aux      sign  address
//! ```
//!
//! `index` is 0 for no indexing or 1-3 for index register 0-2.  `aux`
//! selects the I/O unit for I/O-class instructions and is otherwise
//! reserved.  Decoding is total: every word decodes to some
//! [`Instruction`], and class/opcode pairs with no assigned meaning
//! become [`Operation::Undefined`].

use crate::cpu::memory::Bank;
use crate::io::Unit;
use crate::onescomplement::{Halves, Word};
use serde::{Deserialize, Serialize};

const CLASS_SHIFT: u16 = 12;
const CLASS_MASK: u16 = 0b111;
const OPCODE_SHIFT: u16 = 8;
const OPCODE_MASK: u16 = 0b1111;
const INDEX_SHIFT: u16 = 6;
const INDEX_MASK: u16 = 0b11;
const BANK_BIT: u16 = 1 << 5;
const AUX_MASK: u16 = 0b1_1111;

/// Mask for the 15-bit address field.
pub const ADDRESS_MASK: u16 = 0x7FFF;

/// The eight instruction classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Class {
    Control,
    Arithmetic,
    Subtract,
    Multiply,
    Store,
    Shift,
    Branch,
    Io,
}

impl Class {
    /// Create from the 3-bit class field.
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0 => Class::Control,
            1 => Class::Arithmetic,
            2 => Class::Subtract,
            3 => Class::Multiply,
            4 => Class::Store,
            5 => Class::Shift,
            6 => Class::Branch,
            _ => Class::Io,
        }
    }

    /// The 3-bit class field.
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

/// A decoded operation: the meaning of a (class, opcode) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    // ==================== Control ====================
    /// Stop the machine.
    Hlt,
    /// Do nothing.
    Nop,

    // ==================== Arithmetic ====================
    /// Clear and add: A := M
    Cad,
    /// Add, with the adder's implicit halving: A := (A + M) / 2
    Add,

    // ==================== Subtract ====================
    /// Clear and subtract: A := -M
    Csu,
    /// Subtract, with implicit halving: A := (A - M) / 2
    Sub,
    /// Difference of magnitudes: A := (|A| - |M|) / 2
    Dim,

    // ==================== Multiply ====================
    /// Fractional multiply of each half: A := A * M
    Mul,

    // ==================== Store ====================
    /// Store the whole accumulator.
    Sto,
    /// Store the left half only.
    Slh,
    /// Store the right half only.
    Srh,

    // ==================== Shift ====================
    /// Logical shift left of the accumulator.
    Shl(Halves),
    /// Logical shift right of the accumulator.
    Shr(Halves),

    // ==================== Branch ====================
    /// Unconditional jump.
    Jmp,
    /// Branch if the accumulator is non-zero.
    Bnz,
    /// Branch if the accumulator is zero.
    Bz,
    /// Branch if the accumulator's left half is negative.
    Bmi,
    /// Decrement an index register and branch while it stays positive.
    Tix,
    /// Store a return jump at the target and continue after it.
    Call,
    /// Jump through the return word stored at the target.
    Ret,

    // ==================== I/O ====================
    /// Read a drum word (or the real-time clock) into the accumulator.
    Rds,
    /// Write the accumulator to a drum field.
    Wds,
    /// Branch if a drum status channel is set.
    Sns,
    /// Clear a drum status channel.
    Cls,
    /// Load an index register from memory.
    Ldx,
    /// Clear an index register.
    Clx,
    /// Draw the accumulator as a scope point (and offer it to the light gun).
    Drw,

    /// A class/opcode pair with no assigned meaning.
    Undefined { class: Class, opcode: u8 },
}

impl Operation {
    /// Look up the operation for a class/opcode pair.
    pub const fn from_code(class: Class, opcode: u8) -> Self {
        match (class, opcode) {
            (Class::Control, 0) => Operation::Hlt,
            (Class::Control, 1) => Operation::Nop,
            (Class::Arithmetic, 0) => Operation::Cad,
            (Class::Arithmetic, 1) => Operation::Add,
            (Class::Subtract, 0) => Operation::Csu,
            (Class::Subtract, 1) => Operation::Sub,
            (Class::Subtract, 2) => Operation::Dim,
            (Class::Multiply, 0) => Operation::Mul,
            (Class::Store, 0) => Operation::Sto,
            (Class::Store, 1) => Operation::Slh,
            (Class::Store, 2) => Operation::Srh,
            (Class::Shift, 0) => Operation::Shl(Halves::Both),
            (Class::Shift, 1) => Operation::Shr(Halves::Both),
            (Class::Shift, 2) => Operation::Shl(Halves::Left),
            (Class::Shift, 3) => Operation::Shr(Halves::Left),
            (Class::Shift, 4) => Operation::Shl(Halves::Right),
            (Class::Shift, 5) => Operation::Shr(Halves::Right),
            (Class::Branch, 0) => Operation::Jmp,
            (Class::Branch, 1) => Operation::Bnz,
            (Class::Branch, 2) => Operation::Bz,
            (Class::Branch, 3) => Operation::Bmi,
            (Class::Branch, 4) => Operation::Tix,
            (Class::Branch, 5) => Operation::Call,
            (Class::Branch, 6) => Operation::Ret,
            (Class::Io, 0) => Operation::Rds,
            (Class::Io, 1) => Operation::Wds,
            (Class::Io, 2) => Operation::Sns,
            (Class::Io, 3) => Operation::Cls,
            (Class::Io, 4) => Operation::Ldx,
            (Class::Io, 5) => Operation::Clx,
            (Class::Io, 6) => Operation::Drw,
            (class, opcode) => Operation::Undefined { class, opcode },
        }
    }

    /// The class/opcode pair for this operation.
    pub const fn code(self) -> (Class, u8) {
        match self {
            Operation::Hlt => (Class::Control, 0),
            Operation::Nop => (Class::Control, 1),
            Operation::Cad => (Class::Arithmetic, 0),
            Operation::Add => (Class::Arithmetic, 1),
            Operation::Csu => (Class::Subtract, 0),
            Operation::Sub => (Class::Subtract, 1),
            Operation::Dim => (Class::Subtract, 2),
            Operation::Mul => (Class::Multiply, 0),
            Operation::Sto => (Class::Store, 0),
            Operation::Slh => (Class::Store, 1),
            Operation::Srh => (Class::Store, 2),
            Operation::Shl(Halves::Both) => (Class::Shift, 0),
            Operation::Shr(Halves::Both) => (Class::Shift, 1),
            Operation::Shl(Halves::Left) => (Class::Shift, 2),
            Operation::Shr(Halves::Left) => (Class::Shift, 3),
            Operation::Shl(Halves::Right) => (Class::Shift, 4),
            Operation::Shr(Halves::Right) => (Class::Shift, 5),
            Operation::Jmp => (Class::Branch, 0),
            Operation::Bnz => (Class::Branch, 1),
            Operation::Bz => (Class::Branch, 2),
            Operation::Bmi => (Class::Branch, 3),
            Operation::Tix => (Class::Branch, 4),
            Operation::Call => (Class::Branch, 5),
            Operation::Ret => (Class::Branch, 6),
            Operation::Rds => (Class::Io, 0),
            Operation::Wds => (Class::Io, 1),
            Operation::Sns => (Class::Io, 2),
            Operation::Cls => (Class::Io, 3),
            Operation::Ldx => (Class::Io, 4),
            Operation::Clx => (Class::Io, 5),
            Operation::Drw => (Class::Io, 6),
            Operation::Undefined { class, opcode } => (class, opcode),
        }
    }

    /// Assembler mnemonic, or `None` for undefined operations.
    pub const fn mnemonic(self) -> Option<&'static str> {
        Some(match self {
            Operation::Hlt => "HLT",
            Operation::Nop => "NOP",
            Operation::Cad => "CAD",
            Operation::Add => "ADD",
            Operation::Csu => "CSU",
            Operation::Sub => "SUB",
            Operation::Dim => "DIM",
            Operation::Mul => "MUL",
            Operation::Sto => "STO",
            Operation::Slh => "SLH",
            Operation::Srh => "SRH",
            Operation::Shl(Halves::Both) => "SHL",
            Operation::Shr(Halves::Both) => "SHR",
            Operation::Shl(Halves::Left) => "LHL",
            Operation::Shr(Halves::Left) => "LHR",
            Operation::Shl(Halves::Right) => "RHL",
            Operation::Shr(Halves::Right) => "RHR",
            Operation::Jmp => "JMP",
            Operation::Bnz => "BNZ",
            Operation::Bz => "BZ",
            Operation::Bmi => "BMI",
            Operation::Tix => "TIX",
            Operation::Call => "CALL",
            Operation::Ret => "RET",
            Operation::Rds => "RDS",
            Operation::Wds => "WDS",
            Operation::Sns => "SNS",
            Operation::Cls => "CLS",
            Operation::Ldx => "LDX",
            Operation::Clx => "CLX",
            Operation::Drw => "DRW",
            Operation::Undefined { .. } => return None,
        })
    }

    /// Look up an operation by mnemonic (case-insensitive).
    pub fn from_mnemonic(name: &str) -> Option<Self> {
        (0..8u8)
            .flat_map(|class| (0..16u8).map(move |opcode| (class, opcode)))
            .map(|(class, opcode)| Operation::from_code(Class::from_bits(class), opcode))
            .find(|op| {
                op.mnemonic()
                    .is_some_and(|m| m.eq_ignore_ascii_case(name))
            })
    }

    /// True for operations whose index field names a register to
    /// operate on, rather than a register to index by.
    pub const fn targets_index_register(self) -> bool {
        matches!(self, Operation::Tix | Operation::Ldx | Operation::Clx)
    }

    /// True for operations that address a drum unit through `aux`.
    pub const fn uses_unit(self) -> bool {
        matches!(
            self,
            Operation::Rds | Operation::Wds | Operation::Sns | Operation::Cls
        )
    }

    /// True for shifts, whose address field is a shift count.
    pub const fn is_shift(self) -> bool {
        matches!(self, Operation::Shl(_) | Operation::Shr(_))
    }

    /// True for operations that take no operand at all.
    pub const fn has_no_operand(self) -> bool {
        matches!(self, Operation::Hlt | Operation::Nop | Operation::Clx)
    }
}

/// A word viewed as an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instruction {
    /// Instruction class (3 bits).
    pub class: Class,
    /// Operation within the class (4 bits).
    pub opcode: u8,
    /// 0 = no indexing, 1-3 = index register 0-2.  For TIX, LDX and CLX
    /// this names the register operated on (0-3).
    pub index_select: u8,
    /// Which bank the address refers to.
    pub bank: Bank,
    /// 15-bit address within the bank.
    pub address: u16,
    /// Auxiliary field (5 bits); the low 3 bits select the I/O unit.
    pub aux: u8,
}

impl Instruction {
    /// A bank-1, unindexed instruction.
    pub const fn new(op: Operation, address: u16) -> Self {
        let (class, opcode) = op.code();
        Self {
            class,
            opcode,
            index_select: 0,
            bank: Bank::One,
            address: address & ADDRESS_MASK,
            aux: 0,
        }
    }

    /// Index by register `select - 1` (1-3), or name a register (0-3)
    /// for TIX/LDX/CLX.
    pub const fn indexed(mut self, select: u8) -> Self {
        self.index_select = select & INDEX_MASK as u8;
        self
    }

    /// Refer to the given bank.
    pub const fn in_bank(mut self, bank: Bank) -> Self {
        self.bank = bank;
        self
    }

    /// Address the given I/O unit.
    pub const fn on_unit(mut self, unit: Unit) -> Self {
        self.aux = (self.aux & !0b111) | unit.code();
        self
    }

    /// The operation this instruction performs.
    pub const fn operation(&self) -> Operation {
        Operation::from_code(self.class, self.opcode)
    }

    /// The I/O unit named by the aux field.
    pub const fn unit(&self) -> Unit {
        Unit::from_code(self.aux)
    }

    /// The register named by TIX/LDX/CLX.
    pub const fn register(&self) -> usize {
        (self.index_select & 0b11) as usize
    }

    /// Encode back into a word (sign bits clear).
    pub const fn encode(&self) -> Word {
        let mut left = ((self.class.bits() as u16) & CLASS_MASK) << CLASS_SHIFT;
        left |= ((self.opcode as u16) & OPCODE_MASK) << OPCODE_SHIFT;
        left |= ((self.index_select as u16) & INDEX_MASK) << INDEX_SHIFT;
        if self.bank.bit() {
            left |= BANK_BIT;
        }
        left |= (self.aux as u16) & AUX_MASK;
        Word::from_halves(left, self.address & ADDRESS_MASK)
    }
}

/// Decode a word into its instruction fields.
pub const fn decode(word: Word) -> Instruction {
    let left = word.left();
    Instruction {
        class: Class::from_bits(((left >> CLASS_SHIFT) & CLASS_MASK) as u8),
        opcode: ((left >> OPCODE_SHIFT) & OPCODE_MASK) as u8,
        index_select: ((left >> INDEX_SHIFT) & INDEX_MASK) as u8,
        bank: Bank::from_bit(left & BANK_BIT != 0),
        address: word.right() & ADDRESS_MASK,
        aux: (left & AUX_MASK) as u8,
    }
}

/// Encode an instruction to a word.
pub const fn encode(instr: &Instruction) -> Word {
    instr.encode()
}

/// Add the selected index register to `base`, wrapping modulo `modulus`.
///
/// Index registers are signed, so a negative index reaches addresses
/// below the base.
pub fn indexed_offset(base: u16, index_select: u8, index_registers: &[i16; 4], modulus: usize) -> usize {
    let index_select = index_select & 0b11;
    if index_select == 0 {
        return usize::from(base);
    }
    let index = index_registers[usize::from(index_select - 1)];
    (i64::from(base) + i64::from(index)).rem_euclid(modulus as i64) as usize
}

/// Compute the (bank, address) an instruction refers to.
///
/// With `index_select == 0` the raw address is returned unchanged.
/// Otherwise the selected index register is added and the result
/// wrapped to the size of the instruction's bank.
pub fn effective_address(instr: &Instruction, index_registers: &[i16; 4]) -> (Bank, usize) {
    (
        instr.bank,
        indexed_offset(instr.address, instr.index_select, index_registers, instr.bank.size()),
    )
}
