//! Two-pass assembler.
//!
//! Syntax:
//! ```text
//! ; Comment
//! LOOP:               ; Define a label
//!     CAD 100         ; Clear and add from address 100
//!     ADD TABLE-1,X1  ; Indexed by X1 (index register 0)
//!     TIX LOOP,R0     ; Count down register 0
//!     RDS 5,LRI       ; Read word 5 of the LRI drum field
//!     JMP 7,B2        ; Jump into bank 2
//!     HLT
//!
//!     ORG 50          ; Skip ahead (zero fill)
//! TABLE:
//!     DAT 42          ; Integer in the right half
//!     DAT 0.5,-0.25   ; Two fractions
//!     DAT 0x00010002  ; Raw word
//! ```
//!
//! Modifiers are `X1`-`X3` (indexing), `R0`-`R3` (register for TIX, LDX,
//! CLX), `B1`/`B2` (bank) and the unit names `LRI GFI XTL SD LOG TEMP LG
//! RTC`.  They are reserved and cannot be used as labels.

use crate::asm::program::Program;
use crate::cpu::decode::{Instruction, Operation, ADDRESS_MASK};
use crate::cpu::Bank;
use crate::io::Unit;
use crate::onescomplement::{half, Word};
use std::collections::HashMap;
use thiserror::Error;

/// Assemble source code into a bank-1 program image.
pub fn assemble(source: &str) -> Result<Program, AssemblerError> {
    let statements = source
        .lines()
        .enumerate()
        .map(|(i, line)| parse_line(line, i + 1))
        .collect::<Result<Vec<_>, _>>()?;

    let mut asm = Assembler::new();
    asm.collect_labels(&statements)?;
    asm.emit(&statements)?;
    Ok(Program::new(asm.origin, Bank::One, asm.output))
}

/// One source line, split into its parts.
struct Statement<'a> {
    line: usize,
    label: Option<String>,
    mnemonic: Option<String>,
    operands: Vec<&'a str>,
}

/// An operand before label resolution.
#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(i64),
    Label { name: String, offset: i64 },
}

/// A modifier token.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Modifier {
    Index(u8),
    Register(u8),
    Bank(Bank),
    Unit(Unit),
}

fn parse_modifier(token: &str) -> Option<Modifier> {
    let upper = token.to_ascii_uppercase();
    let digit = |prefix: char, range: std::ops::RangeInclusive<u8>| {
        let mut chars = upper.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(p), Some(d), None) if p == prefix => d
                .to_digit(10)
                .map(|d| d as u8)
                .filter(|d| range.contains(d)),
            _ => None,
        }
    };

    if let Some(n) = digit('X', 1..=3) {
        Some(Modifier::Index(n))
    } else if let Some(n) = digit('R', 0..=3) {
        Some(Modifier::Register(n))
    } else if let Some(n) = digit('B', 1..=2) {
        Bank::from_number(n).map(Modifier::Bank)
    } else {
        Unit::from_name(&upper).map(Modifier::Unit)
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_hex(text: &str) -> bool {
    text.starts_with("0x") || text.starts_with("0X")
}

fn syntax(line: usize, message: impl Into<String>) -> AssemblerError {
    AssemblerError::SyntaxError {
        line,
        message: message.into(),
    }
}

fn out_of_range(line: usize, value: impl ToString) -> AssemblerError {
    AssemblerError::ValueOutOfRange {
        line,
        value: value.to_string(),
    }
}

fn parse_line(line: &str, line_num: usize) -> Result<Statement<'_>, AssemblerError> {
    // Remove comments
    let mut text = match line.find(';') {
        Some(idx) => &line[..idx],
        None => line,
    }
    .trim();

    let mut label = None;
    if let Some(colon_idx) = text.find(':') {
        let name = text[..colon_idx].trim();
        if !is_identifier(name) || parse_modifier(name).is_some() {
            return Err(syntax(line_num, format!("invalid label {:?}", name)));
        }
        label = Some(name.to_ascii_uppercase());
        text = text[colon_idx + 1..].trim();
    }

    if text.is_empty() {
        return Ok(Statement {
            line: line_num,
            label,
            mnemonic: None,
            operands: Vec::new(),
        });
    }

    let (mnemonic, rest) = match text.find(char::is_whitespace) {
        Some(idx) => (&text[..idx], text[idx..].trim()),
        None => (text, ""),
    };

    let operands: Vec<&str> = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split(',').map(str::trim).collect()
    };
    if operands.iter().any(|op| op.is_empty()) {
        return Err(syntax(line_num, "empty operand"));
    }

    Ok(Statement {
        line: line_num,
        label,
        mnemonic: Some(mnemonic.to_ascii_uppercase()),
        operands,
    })
}

fn parse_number(text: &str) -> Option<i64> {
    if is_hex(text) {
        i64::from_str_radix(&text[2..], 16).ok()
    } else {
        text.parse::<i64>().ok()
    }
}

fn parse_expr(text: &str, line: usize) -> Result<Expr, AssemblerError> {
    if let Some(n) = parse_number(text) {
        return Ok(Expr::Number(n));
    }

    // label, label+n or label-n
    let split = text
        .char_indices()
        .skip(1)
        .find(|&(_, c)| c == '+' || c == '-')
        .map(|(i, _)| i);
    let (name, offset) = match split {
        Some(idx) => {
            let offset = parse_number(text[idx + 1..].trim())
                .ok_or_else(|| syntax(line, format!("invalid offset in {:?}", text)))?;
            let sign: i64 = if &text[idx..=idx] == "-" { -1 } else { 1 };
            let offset = sign.checked_mul(offset).ok_or_else(|| out_of_range(line, text))?;
            (text[..idx].trim(), offset)
        }
        None => (text, 0),
    };

    if !is_identifier(name) {
        return Err(syntax(line, format!("invalid operand {:?}", text)));
    }
    Ok(Expr::Label {
        name: name.to_ascii_uppercase(),
        offset,
    })
}

/// The assembler state.
struct Assembler {
    /// Address of the first output word.
    origin: u16,
    /// Symbol table (label -> address).
    symbols: HashMap<String, i64>,
    /// Output words.
    output: Vec<Word>,
}

impl Assembler {
    fn new() -> Self {
        Self {
            origin: 0,
            symbols: HashMap::new(),
            output: Vec::new(),
        }
    }

    fn org_target(statement: &Statement<'_>) -> Result<i64, AssemblerError> {
        let target = match statement.operands.as_slice() {
            [value] => parse_number(value)
                .ok_or_else(|| syntax(statement.line, "ORG requires a numeric address"))?,
            _ => return Err(syntax(statement.line, "ORG requires one address")),
        };
        if !(0..=i64::from(ADDRESS_MASK)).contains(&target) {
            return Err(out_of_range(statement.line, target));
        }
        Ok(target)
    }

    /// Pass 1: assign an address to every label and fix the origin.
    fn collect_labels(&mut self, statements: &[Statement<'_>]) -> Result<(), AssemblerError> {
        let mut current: i64 = 0;
        let mut emitted = false;

        for statement in statements {
            if statement.mnemonic.as_deref() == Some("ORG") {
                let target = Self::org_target(statement)?;
                if !emitted {
                    self.origin = target as u16;
                } else if target < current {
                    return Err(AssemblerError::OrgBackwards {
                        line: statement.line,
                        from: current,
                        to: target,
                    });
                }
                current = target;
            }

            if let Some(label) = &statement.label {
                if self.symbols.insert(label.clone(), current).is_some() {
                    return Err(AssemblerError::DuplicateLabel {
                        line: statement.line,
                        label: label.clone(),
                    });
                }
            }

            if matches!(statement.mnemonic.as_deref(), Some(m) if m != "ORG") {
                emitted = true;
                current += 1;
            }
        }

        Ok(())
    }

    /// Pass 2: encode every statement.
    fn emit(&mut self, statements: &[Statement<'_>]) -> Result<(), AssemblerError> {
        for statement in statements {
            let Some(mnemonic) = statement.mnemonic.as_deref() else {
                continue;
            };

            match mnemonic {
                "ORG" => {
                    let target = Self::org_target(statement)?;
                    // Leading ORGs only move the origin.
                    let fill = (target - i64::from(self.origin)).max(0) as usize;
                    if !self.output.is_empty() && fill > self.output.len() {
                        self.output.resize(fill, Word::ZERO);
                    }
                }

                "DAT" => {
                    let word = self.encode_data(&statement.operands, statement.line)?;
                    self.output.push(word);
                }

                _ => {
                    let word = self.encode_instruction(mnemonic, &statement.operands, statement.line)?;
                    self.output.push(word);
                }
            }
        }

        Ok(())
    }

    fn resolve(&self, text: &str, line: usize) -> Result<i64, AssemblerError> {
        match parse_expr(text, line)? {
            Expr::Number(n) => Ok(n),
            Expr::Label { name, offset } => {
                let addr = self
                    .symbols
                    .get(&name)
                    .ok_or(AssemblerError::UndefinedLabel { line, label: name.clone() })?;
                addr.checked_add(offset).ok_or_else(|| out_of_range(line, text))
            }
        }
    }

    fn encode_instruction(&self, mnemonic: &str, operands: &[&str], line: usize) -> Result<Word, AssemblerError> {
        let op = Operation::from_mnemonic(mnemonic).ok_or_else(|| AssemblerError::UnknownMnemonic {
            line,
            mnemonic: mnemonic.to_string(),
        })?;

        let mut instr = Instruction::new(op, 0);
        let mut address = None;
        let mut has_unit = false;

        for &token in operands {
            match parse_modifier(token) {
                Some(Modifier::Index(n)) if !op.targets_index_register() => instr = instr.indexed(n),
                Some(Modifier::Register(n)) if op.targets_index_register() => instr = instr.indexed(n),
                Some(Modifier::Bank(bank)) => instr = instr.in_bank(bank),
                Some(Modifier::Unit(unit)) if op.uses_unit() && !has_unit => {
                    instr = instr.on_unit(unit);
                    has_unit = true;
                }
                Some(_) => {
                    return Err(syntax(line, format!("{} cannot take modifier {}", mnemonic, token)));
                }
                None if address.is_none() => address = Some(self.resolve(token, line)?),
                None => return Err(syntax(line, format!("unexpected operand {:?}", token))),
            }
        }

        if op.uses_unit() && !has_unit {
            return Err(syntax(line, format!("{} requires a unit", mnemonic)));
        }

        let address = address.unwrap_or(0);
        if !(0..=i64::from(ADDRESS_MASK)).contains(&address) {
            return Err(out_of_range(line, address));
        }
        // Shifts only look at the low five bits.
        if op.is_shift() && address > 31 {
            return Err(out_of_range(line, address));
        }
        instr.address = address as u16;

        Ok(instr.encode())
    }

    fn encode_data(&self, operands: &[&str], line: usize) -> Result<Word, AssemblerError> {
        match operands {
            [raw] if is_hex(raw) => u32::from_str_radix(&raw[2..], 16)
                .map(Word::from_raw)
                .map_err(|_| out_of_range(line, raw)),
            [right] => Ok(Word::from_halves(half::PLUS_ZERO, self.data_half(right, line)?)),
            [left, right] => Ok(Word::from_halves(
                self.data_half(left, line)?,
                self.data_half(right, line)?,
            )),
            _ => Err(syntax(line, "DAT takes one or two values")),
        }
    }

    fn data_half(&self, text: &str, line: usize) -> Result<u16, AssemblerError> {
        if text.contains('.') {
            let value: f64 = text
                .parse()
                .map_err(|_| syntax(line, format!("invalid fraction {:?}", text)))?;
            if !(value > -1.0 && value < 1.0) {
                return Err(out_of_range(line, text));
            }
            return Ok(half::from_fraction(value));
        }

        if is_hex(text) {
            return u16::from_str_radix(&text[2..], 16).map_err(|_| out_of_range(line, text));
        }

        let value = self.resolve(text, line)?;
        let limit = i64::from(half::MAX_POSITIVE);
        if !(-limit..=limit).contains(&value) {
            return Err(out_of_range(line, value));
        }
        Ok(half::from_integer(value as i16))
    }
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("undefined label on line {line}: {label}")]
    UndefinedLabel { line: usize, label: String },

    #[error("duplicate label on line {line}: {label}")]
    DuplicateLabel { line: usize, label: String },

    #[error("value out of range on line {line}: {value}")]
    ValueOutOfRange { line: usize, value: String },

    #[error("ORG on line {line} moves backwards from {from} to {to}")]
    OrgBackwards { line: usize, from: i64, to: i64 },
}
