//! Disassembler.
//!
//! Converts words back to assembler syntax.  The output for any defined
//! operation assembles back to the same word, as long as the reserved
//! fields (sign bits, unused `aux` bits, address bits above a shift
//! count) are clear.

use std::fmt;

use crate::asm::program::Program;
use crate::cpu::decode::{decode, Instruction, Operation};
use crate::cpu::Bank;
use crate::onescomplement::Word;

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = self.operation();
        let Some(mnemonic) = op.mnemonic() else {
            return write!(f, "??? class {} opcode {}", self.class.bits(), self.opcode);
        };

        let mut operands = Vec::new();
        if op.is_shift() {
            operands.push((self.address & 0b1_1111).to_string());
        } else if !op.has_no_operand() {
            operands.push(self.address.to_string());
        }
        if op.targets_index_register() {
            operands.push(format!("R{}", self.index_select));
        } else if self.index_select != 0 {
            operands.push(format!("X{}", self.index_select));
        }
        if op.uses_unit() {
            operands.push(self.unit().name().to_string());
        }
        if self.bank == Bank::Two {
            operands.push(self.bank.to_string());
        }

        if operands.is_empty() {
            f.write_str(mnemonic)
        } else {
            write!(f, "{} {}", mnemonic, operands.join(","))
        }
    }
}

/// Disassemble a single word to text.
pub fn disassemble_word(word: Word) -> String {
    decode(word).to_string()
}

/// Disassemble a program image into a listing.
pub fn disassemble(program: &Program) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "; FSQ-7 disassembly: {} words at {} in bank {}\n\n",
        program.len(),
        program.origin,
        program.bank.number()
    ));

    for (i, &word) in program.words.iter().enumerate() {
        let address = usize::from(program.origin) + i;
        let line = if word == Word::ZERO || decode(word).operation() == Operation::Hlt {
            // Zero is both HLT and empty storage; show the numbers too.
            format!("{:<20} ; {}", disassemble_word(word), format_data(word))
        } else {
            disassemble_word(word)
        };
        output.push_str(&format!("{:05}: {}  {}\n", address, word, line));
    }

    output
}

fn format_data(word: Word) -> String {
    let (l, r) = word.to_fractions();
    format!("{:+.5},{:+.5}", l, r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::assemble;
    use crate::io::Unit;
    use crate::onescomplement::Halves;

    #[test]
    fn test_disassemble_hlt() {
        assert_eq!(disassemble_word(Word::ZERO), "HLT");
    }

    #[test]
    fn test_disassemble_with_modifiers() {
        let cases = [
            (Instruction::new(Operation::Add, 10), "ADD 10"),
            (Instruction::new(Operation::Add, 29).indexed(1), "ADD 29,X1"),
            (Instruction::new(Operation::Tix, 1).indexed(0), "TIX 1,R0"),
            (Instruction::new(Operation::Clx, 0).indexed(2), "CLX R2"),
            (Instruction::new(Operation::Rds, 5).on_unit(Unit::Clock), "RDS 5,RTC"),
            (Instruction::new(Operation::Jmp, 7).in_bank(Bank::Two), "JMP 7,B2"),
            (Instruction::new(Operation::Shr(Halves::Left), 3), "LHR 3"),
        ];

        for (instr, text) in cases {
            assert_eq!(instr.to_string(), text);
        }
    }

    #[test]
    fn test_shift_shows_only_the_count() {
        let instr = Instruction::new(Operation::Shl(Halves::Right), 0x0123);
        assert_eq!(instr.to_string(), "RHL 3");
        assert!(assemble(&instr.to_string()).is_ok());
    }

    #[test]
    fn test_disassemble_undefined() {
        let word = Word::from_halves(0x3900, 0);
        assert!(disassemble_word(word).starts_with("???"));
    }

    #[test]
    fn test_disassembly_reassembles() {
        let source = "CAD 100,X3,B2\nSNS 4,LG\nTIX 1,R3\nDRW 5,X1\nRET 10\nHLT\n";
        let program = assemble(source).unwrap();

        let text: String = program
            .words
            .iter()
            .map(|&w| disassemble_word(w) + "\n")
            .collect();
        assert_eq!(assemble(&text).unwrap(), program);
    }

    #[test]
    fn test_listing() {
        let program = Program::new(10, Bank::One, vec![Instruction::new(Operation::Nop, 0).encode(), Word::ZERO]);
        let listing = disassemble(&program);
        assert!(listing.contains("00010: 0100 0000  NOP"));
        assert!(listing.contains("00011: 0000 0000  HLT"));
    }
}
