//! CPU execution engine.
//!
//! Implements the fetch-decode-execute cycle and all instruction
//! behaviors.  Nothing in here returns an error: addresses wrap, fraction
//! overflow saturates, and an operation with no meaning halts the
//! machine.

use crate::cpu::decode::{self, effective_address, indexed_offset, Instruction, Operation, ADDRESS_MASK};
use crate::cpu::memory::{Bank, MemoryBanks};
use crate::cpu::registers::Registers;
use crate::io::light_gun::scope_coordinate;
use crate::io::{Drum, Field, LightGun, Unit, FIELD_SIZE};
use crate::onescomplement::arith::{self, difference_of_magnitudes};
use crate::onescomplement::half;
use crate::onescomplement::{parallel_add_with_shift, parallel_multiply, parallel_negate, Word};
use serde::{Deserialize, Serialize};
use tracing::{event, Level};

/// Real-time clock ticks per second.
pub const CLOCK_HZ: f64 = 32.0;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// Fetching and executing instructions.
    Running,
    /// Stopped; `step` does nothing.
    Halted,
}

/// Why the CPU last stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HaltReason {
    /// Never started since power-on.
    PowerOn,
    /// Stopped by [`Cpu::reset`].
    Reset,
    /// Executed HLT.
    HaltInstruction,
    /// Fetched an operation (or unit combination) with no meaning.
    UndefinedOperation,
}

/// The CPU, together with the memory and peripherals it owns.
#[derive(Clone)]
pub struct Cpu {
    pub(crate) regs: Registers,
    pub(crate) mem: MemoryBanks,
    pub(crate) drum: Drum,
    pub(crate) light_gun: LightGun<u16>,
    state: CpuState,
    halt_reason: HaltReason,
    instruction_count: u64,
    last_instr: Option<Instruction>,
}

impl Cpu {
    /// Power on: zeroed registers, memory and drum; halted.
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            mem: MemoryBanks::new(),
            drum: Drum::new(),
            light_gun: LightGun::new(),
            state: CpuState::Halted,
            halt_reason: HaltReason::PowerOn,
            instruction_count: 0,
            last_instr: None,
        }
    }

    /// Halt and zero every register (the clock too) and the instruction
    /// counter.  Memory and drum contents are kept.
    pub fn reset(&mut self) {
        event!(Level::DEBUG, "reset");
        self.regs.reset();
        self.state = CpuState::Halted;
        self.halt_reason = HaltReason::Reset;
        self.instruction_count = 0;
        self.last_instr = None;
    }

    /// Copy a program into memory and point the PC at its first word.
    /// The run state is left alone; call [`Cpu::start`] to execute.
    pub fn load_program(&mut self, words: &[Word], start: u16, bank: Bank) {
        event!(Level::DEBUG, words = words.len(), start, %bank, "program loaded");
        self.mem.load(bank, usize::from(start), words);
        self.regs.jump(bank, usize::from(start));
    }

    /// Begin executing at the current PC.
    pub fn start(&mut self) {
        self.state = CpuState::Running;
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that was executed, or `None` if the CPU is
    /// halted (in which case nothing changes).
    pub fn step(&mut self) -> Option<Instruction> {
        if self.state != CpuState::Running {
            return None;
        }

        // Fetch
        let bank = self.regs.pc_bank;
        let pc = self.regs.advance_pc();
        let raw = self.mem.read(bank, usize::from(pc));
        self.instruction_count += 1;

        // Decode
        let instr = decode::decode(raw);
        event!(Level::TRACE, %bank, pc, word = %raw, instruction = %instr, "execute");

        // Execute
        self.execute(instr);
        self.last_instr = Some(instr);

        Some(instr)
    }

    /// Step until halted or `max_steps` instructions have executed.
    ///
    /// Returns the number of instructions executed.
    pub fn run(&mut self, max_steps: u64) -> u64 {
        let mut executed = 0;
        while executed < max_steps && self.step().is_some() {
            executed += 1;
        }
        executed
    }

    /// Advance the real-time clock by `elapsed_seconds` of wall time.
    ///
    /// Each call adds `floor(elapsed * 32)` ticks; fractions of a tick
    /// are not carried over.  Non-positive and NaN input is ignored.
    pub fn tick_real_time_clock(&mut self, elapsed_seconds: f64) {
        if !(elapsed_seconds > 0.0) {
            return;
        }
        let ticks = (elapsed_seconds * CLOCK_HZ).floor() % 65536.0;
        self.regs.tick(ticks as u16);
    }

    /// Execute a decoded instruction.
    fn execute(&mut self, instr: Instruction) {
        let op = instr.operation();
        let (bank, ea) = effective_address(&instr, &self.regs.ix);

        match op {
            // ==================== Control ====================
            Operation::Hlt => self.halt(HaltReason::HaltInstruction),

            Operation::Nop => {}

            // ==================== Arithmetic ====================
            Operation::Cad => {
                self.regs.acc = self.mem.read(bank, ea);
            }

            Operation::Add => {
                let operand = self.mem.read(bank, ea);
                self.regs.acc = parallel_add_with_shift(self.regs.acc, operand);
            }

            Operation::Csu => {
                self.regs.acc = parallel_negate(self.mem.read(bank, ea));
            }

            Operation::Sub => {
                let operand = parallel_negate(self.mem.read(bank, ea));
                self.regs.acc = parallel_add_with_shift(self.regs.acc, operand);
            }

            Operation::Dim => {
                let operand = self.mem.read(bank, ea);
                self.regs.acc = difference_of_magnitudes(self.regs.acc, operand);
            }

            Operation::Mul => {
                let operand = self.mem.read(bank, ea);
                self.regs.acc = parallel_multiply(self.regs.acc, operand);
            }

            // ==================== Store ====================
            Operation::Sto => self.mem.write(bank, ea, self.regs.acc),

            Operation::Slh => {
                let old = self.mem.read(bank, ea);
                self.mem.write(bank, ea, old.with_left(self.regs.acc.left()));
            }

            Operation::Srh => {
                let old = self.mem.read(bank, ea);
                self.mem.write(bank, ea, old.with_right(self.regs.acc.right()));
            }

            // ==================== Shift ====================
            Operation::Shl(halves) => {
                self.regs.acc = arith::shift_left(self.regs.acc, halves, shift_count(&instr));
            }

            Operation::Shr(halves) => {
                self.regs.acc = arith::shift_right(self.regs.acc, halves, shift_count(&instr));
            }

            // ==================== Branch ====================
            Operation::Jmp => self.regs.jump(bank, ea),

            Operation::Bnz => {
                if !self.regs.acc.is_zero() {
                    self.regs.jump(bank, ea);
                }
            }

            Operation::Bz => {
                if self.regs.acc.is_zero() {
                    self.regs.jump(bank, ea);
                }
            }

            Operation::Bmi => {
                if half::is_strictly_negative(self.regs.acc.left()) {
                    self.regs.jump(bank, ea);
                }
            }

            Operation::Tix => {
                let r = instr.register();
                self.regs.ix[r] = self.regs.ix[r].wrapping_sub(1);
                if self.regs.ix[r] > 0 {
                    self.regs.jump(instr.bank, usize::from(instr.address));
                }
            }

            Operation::Call => {
                let link = Instruction::new(Operation::Jmp, self.regs.pc).in_bank(self.regs.pc_bank);
                self.mem.write(bank, ea, link.encode());
                self.regs.jump(bank, ea + 1);
            }

            Operation::Ret => {
                let link = decode::decode(self.mem.read(bank, ea));
                self.regs.jump(link.bank, usize::from(link.address));
            }

            // ==================== I/O ====================
            Operation::Rds => match instr.unit() {
                Unit::Clock => self.regs.acc = Word::from_halves(half::PLUS_ZERO, self.regs.rtc),
                unit => match unit.field() {
                    Some(field) => self.regs.acc = self.drum.read(field, self.drum_address(&instr)),
                    None => self.undefined(instr),
                },
            },

            Operation::Wds => match instr.unit().field() {
                Some(field) => {
                    let address = self.drum_address(&instr);
                    self.drum.write(field, address, self.regs.acc);
                }
                None => self.undefined(instr),
            },

            Operation::Sns => match instr.unit().channel() {
                Some(channel) => {
                    if self.drum.check_status(channel) {
                        self.regs.jump(bank, ea);
                    }
                }
                None => self.undefined(instr),
            },

            Operation::Cls => match instr.unit().channel() {
                Some(channel) => self.drum.clear_status(channel),
                None => self.undefined(instr),
            },

            Operation::Ldx => {
                let value = self.mem.read(instr.bank, usize::from(instr.address));
                self.regs.ix[instr.register()] = half::to_integer(value.right());
            }

            Operation::Clx => self.regs.ix[instr.register()] = 0,

            Operation::Drw => {
                let address = self.drum_address(&instr);
                let point = self.regs.acc;
                self.drum.write(Field::Sd, address, point);
                self.light_gun.draw_event(
                    &mut self.drum,
                    address as u16,
                    scope_coordinate(point.left()),
                    scope_coordinate(point.right()),
                );
            }

            Operation::Undefined { .. } => self.undefined(instr),
        }
    }

    /// Effective address of an I/O instruction within a drum field.
    fn drum_address(&self, instr: &Instruction) -> usize {
        indexed_offset(instr.address, instr.index_select, &self.regs.ix, FIELD_SIZE)
    }

    fn halt(&mut self, reason: HaltReason) {
        event!(Level::DEBUG, ?reason, pc = self.regs.pc, count = self.instruction_count, "halted");
        self.state = CpuState::Halted;
        self.halt_reason = reason;
    }

    fn undefined(&mut self, instr: Instruction) {
        event!(
            Level::WARN,
            class = ?instr.class,
            opcode = instr.opcode,
            unit = %instr.unit(),
            word = %instr.encode(),
            "undefined operation"
        );
        self.halt(HaltReason::UndefinedOperation);
    }

    /// Aim the light gun at scope position (x, y).
    pub fn arm_light_gun(&mut self, x: f64, y: f64) {
        self.light_gun.arm(&mut self.drum, x, y);
    }

    /// Collect the id of the point the light gun detected, if any.
    pub fn poll_light_gun(&mut self) -> Option<u16> {
        self.light_gun.poll_and_clear(&mut self.drum)
    }

    pub fn light_gun(&self) -> &LightGun<u16> {
        &self.light_gun
    }

    pub fn accumulator(&self) -> Word {
        self.regs.acc
    }

    /// Index register `n` (0-3).
    pub fn index_register(&self, n: usize) -> i16 {
        self.regs.ix[n]
    }

    pub fn index_registers(&self) -> [i16; 4] {
        self.regs.ix
    }

    /// Address of the next instruction.
    pub fn pc(&self) -> u16 {
        self.regs.pc & ADDRESS_MASK
    }

    /// Bank of the next instruction.
    pub fn pc_bank(&self) -> Bank {
        self.regs.pc_bank
    }

    /// Real-time clock, in 1/32 s ticks.
    pub fn rtc(&self) -> u16 {
        self.regs.rtc
    }

    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    pub fn state(&self) -> CpuState {
        self.state
    }

    pub fn halt_reason(&self) -> HaltReason {
        self.halt_reason
    }

    /// Instructions executed since power-on or the last reset.
    pub fn instruction_count(&self) -> u64 {
        self.instruction_count
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    pub fn memory(&self) -> &MemoryBanks {
        &self.mem
    }

    pub fn memory_mut(&mut self) -> &mut MemoryBanks {
        &mut self.mem
    }

    pub fn drum(&self) -> &Drum {
        &self.drum
    }

    pub fn drum_mut(&mut self) -> &mut Drum {
        &mut self.drum
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }
}

/// Shift count: the low five bits of the address.
fn shift_count(instr: &Instruction) -> u32 {
    u32::from(instr.address & 0b1_1111)
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("halt_reason", &self.halt_reason)
            .field("instruction_count", &self.instruction_count)
            .field("regs", &self.regs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::{encode, Class};
    use crate::io::Channel;
    use crate::onescomplement::Halves;

    fn make_program(instructions: &[Instruction]) -> Vec<Word> {
        instructions.iter().map(encode).collect()
    }

    fn boot(instructions: &[Instruction]) -> Cpu {
        let mut cpu = Cpu::new();
        cpu.load_program(&make_program(instructions), 0, Bank::One);
        cpu.start();
        cpu
    }

    fn op(op: Operation, address: u16) -> Instruction {
        Instruction::new(op, address)
    }

    fn place(cpu: &mut Cpu, address: usize, instr: Instruction) {
        cpu.memory_mut().write(Bank::One, address, instr.encode());
    }

    fn int_word(left: i16, right: i16) -> Word {
        Word::from_halves(half::from_integer(left), half::from_integer(right))
    }

    #[test]
    fn test_power_on_is_halted() {
        let mut cpu = Cpu::new();
        assert!(cpu.is_halted());
        assert_eq!(cpu.halt_reason(), HaltReason::PowerOn);
        assert_eq!(cpu.step(), None);
        assert_eq!(cpu.instruction_count(), 0);
        assert_eq!(cpu.pc(), 0);
    }

    #[test]
    fn test_cpu_halt() {
        let mut cpu = boot(&[op(Operation::Hlt, 0)]);

        let executed = cpu.run(100);

        assert_eq!(executed, 1);
        assert!(cpu.is_halted());
        assert_eq!(cpu.halt_reason(), HaltReason::HaltInstruction);
        assert_eq!(cpu.last_instruction().map(|i| i.operation()), Some(Operation::Hlt));
    }

    #[test]
    fn test_cpu_nop_then_halt() {
        let mut cpu = boot(&[
            op(Operation::Nop, 0),
            op(Operation::Nop, 0),
            op(Operation::Nop, 0),
            op(Operation::Hlt, 0),
        ]);

        assert_eq!(cpu.run(100), 4);
        assert_eq!(cpu.instruction_count(), 4);
        assert_eq!(cpu.pc(), 4);
    }

    #[test]
    fn test_run_respects_limit() {
        let mut cpu = boot(&[op(Operation::Jmp, 0)]);
        assert_eq!(cpu.run(50), 50);
        assert!(cpu.is_running());
    }

    #[test]
    fn test_undefined_operation_halts() {
        let mut cpu = Cpu::new();
        let bogus = Instruction {
            class: Class::Multiply,
            opcode: 9,
            index_select: 0,
            bank: Bank::One,
            address: 0,
            aux: 0,
        };
        cpu.load_program(&[op(Operation::Nop, 0).encode(), bogus.encode()], 0, Bank::One);
        cpu.start();

        assert_eq!(cpu.run(100), 2);
        assert_eq!(cpu.halt_reason(), HaltReason::UndefinedOperation);
        assert_eq!(cpu.pc(), 2);
    }

    #[test]
    fn test_add_halves_each_half() {
        let mut cpu = boot(&[op(Operation::Cad, 100), op(Operation::Add, 101), op(Operation::Hlt, 0)]);
        cpu.memory_mut().write(Bank::One, 100, Word::from_fractions(0.5, 0.25));
        cpu.memory_mut().write(Bank::One, 101, Word::from_fractions(0.25, -0.25));

        cpu.run(10);

        assert_eq!(cpu.accumulator().left(), half::from_fraction(0.375));
        assert!(half::is_zero(cpu.accumulator().right()));
    }

    #[test]
    fn test_subtract_and_negate() {
        let mut cpu = boot(&[
            op(Operation::Csu, 100),
            op(Operation::Sto, 102),
            op(Operation::Cad, 100),
            op(Operation::Sub, 101),
            op(Operation::Hlt, 0),
        ]);
        cpu.memory_mut().write(Bank::One, 100, Word::from_fractions(0.5, 0.5));
        cpu.memory_mut().write(Bank::One, 101, Word::from_fractions(0.25, 0.25));

        cpu.run(10);

        assert_eq!(cpu.memory().read(Bank::One, 102), Word::from_fractions(-0.5, -0.5));
        assert_eq!(cpu.accumulator(), Word::from_fractions(0.125, 0.125));
    }

    #[test]
    fn test_multiply_and_dim() {
        let mut cpu = boot(&[
            op(Operation::Cad, 100),
            op(Operation::Mul, 101),
            op(Operation::Sto, 102),
            op(Operation::Cad, 100),
            op(Operation::Dim, 103),
            op(Operation::Hlt, 0),
        ]);
        cpu.memory_mut().write(Bank::One, 100, Word::from_fractions(0.5, -0.5));
        cpu.memory_mut().write(Bank::One, 101, Word::from_fractions(0.5, 0.5));
        cpu.memory_mut().write(Bank::One, 103, Word::from_fractions(-0.25, 0.25));

        cpu.run(10);

        assert_eq!(cpu.memory().read(Bank::One, 102), Word::from_fractions(0.25, -0.25));
        assert_eq!(cpu.accumulator(), Word::from_fractions(0.125, 0.125));
    }

    #[test]
    fn test_store_half_variants() {
        let mut cpu = boot(&[
            op(Operation::Cad, 100),
            op(Operation::Slh, 200),
            op(Operation::Srh, 201),
            op(Operation::Sto, 202),
            op(Operation::Hlt, 0),
        ]);
        cpu.memory_mut().write(Bank::One, 100, Word::from_halves(0x1111, 0x2222));
        for address in 200..=202 {
            cpu.memory_mut().write(Bank::One, address, Word::from_halves(0x0AAA, 0x0BBB));
        }

        cpu.run(10);

        let mem = cpu.memory();
        assert_eq!(mem.read(Bank::One, 200), Word::from_halves(0x1111, 0x0BBB));
        assert_eq!(mem.read(Bank::One, 201), Word::from_halves(0x0AAA, 0x2222));
        assert_eq!(mem.read(Bank::One, 202), Word::from_halves(0x1111, 0x2222));
    }

    #[test]
    fn test_shifts() {
        let mut cpu = boot(&[
            op(Operation::Cad, 100),
            op(Operation::Shl(Halves::Left), 4),
            op(Operation::Shr(Halves::Right), 4),
            op(Operation::Shl(Halves::Both), 0x20 | 1),
            op(Operation::Hlt, 0),
        ]);
        cpu.memory_mut().write(Bank::One, 100, Word::from_halves(0x0011, 0x0011));

        cpu.run(10);

        // Only the low five address bits count.
        assert_eq!(cpu.accumulator(), Word::from_halves(0x0220, 0x0002));
    }

    #[test]
    fn test_branch_on_either_zero() {
        let mut cpu = boot(&[
            op(Operation::Cad, 10),
            op(Operation::Bz, 3),
            op(Operation::Hlt, 0),
            op(Operation::Bnz, 2),
            op(Operation::Hlt, 0),
        ]);
        cpu.memory_mut().write(Bank::One, 10, Word::MINUS_ZERO);

        assert_eq!(cpu.run(10), 4);
        assert_eq!(cpu.pc(), 5);
    }

    #[test]
    fn test_branch_minus_ignores_minus_zero() {
        let mut cpu = boot(&[
            op(Operation::Cad, 10),
            op(Operation::Bmi, 5),
            op(Operation::Cad, 11),
            op(Operation::Bmi, 5),
            op(Operation::Hlt, 0),
            op(Operation::Hlt, 0),
        ]);
        cpu.memory_mut().write(Bank::One, 10, Word::from_halves(half::MINUS_ZERO, 0x8000));
        cpu.memory_mut().write(Bank::One, 11, Word::from_fractions(-0.5, 0.0));

        assert_eq!(cpu.run(10), 5);
        assert_eq!(cpu.pc(), 6);
    }

    #[test]
    fn test_jump_switches_bank() {
        // Bank 2 is all zero, and a zero word is HLT.
        let mut cpu = boot(&[op(Operation::Jmp, 7).in_bank(Bank::Two)]);

        assert_eq!(cpu.run(10), 2);
        assert_eq!(cpu.pc_bank(), Bank::Two);
        assert_eq!(cpu.pc(), 8);
    }

    #[test]
    fn test_pc_wraps_at_15_bits() {
        let mut cpu = Cpu::new();
        cpu.load_program(&[op(Operation::Nop, 0).encode()], 0x7FFF, Bank::One);
        cpu.start();

        assert_eq!(cpu.run(10), 2);
        assert_eq!(cpu.pc(), 1);
    }

    #[test]
    fn test_summation_loop() {
        // Sum ten values with the halving adder: shifting the running
        // total left first and storing each value pre-doubled keeps every
        // step exact.
        let mut cpu = boot(&[
            op(Operation::Ldx, 20).indexed(0),
            op(Operation::Shl(Halves::Both), 1),
            op(Operation::Add, 29).indexed(1),
            op(Operation::Tix, 1).indexed(0),
            op(Operation::Hlt, 0),
        ]);
        cpu.memory_mut().write(Bank::One, 20, int_word(0, 10));
        for v in 1..=10i16 {
            cpu.memory_mut().write(Bank::One, 29 + v as usize, int_word(2 * v, 0));
        }

        assert_eq!(cpu.run(1000), 32);
        assert_eq!(half::to_integer(cpu.accumulator().left()), 55);
        assert_eq!(cpu.index_register(0), 0);
    }

    #[test]
    fn test_tix_uses_register_directly() {
        let mut cpu = boot(&[
            op(Operation::Ldx, 20).indexed(3),
            op(Operation::Tix, 1).indexed(3),
            op(Operation::Hlt, 0),
        ]);
        cpu.memory_mut().write(Bank::One, 20, int_word(0, 4));

        // LDX, then TIX three times to 3, 2, 1 (branching) and once to 0.
        assert_eq!(cpu.run(100), 6);
        assert_eq!(cpu.index_registers(), [0, 0, 0, 0]);
    }

    #[test]
    fn test_negative_index() {
        let mut cpu = boot(&[
            op(Operation::Ldx, 20).indexed(0),
            op(Operation::Cad, 10).indexed(1),
            op(Operation::Clx, 0).indexed(1),
            op(Operation::Hlt, 0),
        ]);
        cpu.memory_mut().write(Bank::One, 20, int_word(0, -5));
        cpu.memory_mut().write(Bank::One, 5, Word::from_raw(0x1234_5678));
        cpu.regs.ix[1] = 9;

        cpu.run(10);

        assert_eq!(cpu.accumulator(), Word::from_raw(0x1234_5678));
        assert_eq!(cpu.index_registers(), [-5, 0, 0, 0]);
    }

    #[test]
    fn test_call_and_return() {
        let mut cpu = boot(&[op(Operation::Call, 10), op(Operation::Hlt, 0)]);
        place(&mut cpu, 11, op(Operation::Cad, 20));
        place(&mut cpu, 12, op(Operation::Ret, 10));
        cpu.memory_mut().write(Bank::One, 20, Word::from_raw(0x0042_0042));

        assert_eq!(cpu.run(100), 4);
        assert_eq!(cpu.accumulator(), Word::from_raw(0x0042_0042));
        assert_eq!(
            cpu.memory().read(Bank::One, 10),
            op(Operation::Jmp, 1).encode()
        );
        assert_eq!(cpu.pc(), 2);
    }

    #[test]
    fn test_cpu_drum_write_sets_channel() {
        let mut cpu = boot(&[
            op(Operation::Cad, 20),
            op(Operation::Wds, 5).on_unit(Unit::Log),
            op(Operation::Sns, 4).on_unit(Unit::Log),
            op(Operation::Hlt, 0),
            op(Operation::Cls, 0).on_unit(Unit::Log),
            op(Operation::Cad, 21),
            op(Operation::Rds, 5).on_unit(Unit::Log),
            op(Operation::Hlt, 0),
        ]);
        let value = Word::from_fractions(0.75, -0.125);
        cpu.memory_mut().write(Bank::One, 20, value);

        assert_eq!(cpu.run(100), 7);
        assert_eq!(cpu.accumulator(), value);
        assert_eq!(cpu.drum().read(Field::Log, 5), value);
        assert!(!cpu.drum().check_status(Channel::Field(Field::Log)));
    }

    #[test]
    fn test_host_input_through_drum() {
        let mut cpu = boot(&[
            op(Operation::Sns, 2).on_unit(Unit::Lri),
            op(Operation::Jmp, 0),
            op(Operation::Rds, 3).on_unit(Unit::Lri),
            op(Operation::Cls, 0).on_unit(Unit::Lri),
            op(Operation::Hlt, 0),
        ]);

        // Polls while the channel is clear.
        assert_eq!(cpu.run(20), 20);
        assert!(cpu.is_running());

        let value = Word::from_fractions(0.1, 0.2);
        cpu.drum_mut().write_field("lri", 3, value).unwrap();
        cpu.run(100);

        assert!(cpu.is_halted());
        assert_eq!(cpu.accumulator(), value);
        assert!(!cpu.drum().check_status(Channel::Field(Field::Lri)));
    }

    #[test]
    fn test_drum_address_wraps_with_index() {
        let mut cpu = boot(&[
            op(Operation::Cad, 20),
            op(Operation::Wds, 2047).on_unit(Unit::Temp).indexed(1),
            op(Operation::Hlt, 0),
        ]);
        cpu.regs.ix[0] = 3;
        cpu.memory_mut().write(Bank::One, 20, Word::from_raw(99));

        cpu.run(10);

        assert_eq!(cpu.drum().read(Field::Temp, 2), Word::from_raw(99));
    }

    #[test]
    fn test_meaningless_unit_combinations_halt() {
        let cases = [
            op(Operation::Rds, 0).on_unit(Unit::LightGun),
            op(Operation::Wds, 0).on_unit(Unit::LightGun),
            op(Operation::Wds, 0).on_unit(Unit::Clock),
            op(Operation::Sns, 0).on_unit(Unit::Clock),
            op(Operation::Cls, 0).on_unit(Unit::Clock),
        ];

        for instr in cases {
            let mut cpu = boot(&[instr, op(Operation::Nop, 0)]);
            assert_eq!(cpu.run(10), 1, "{:?}", instr);
            assert_eq!(cpu.halt_reason(), HaltReason::UndefinedOperation);
        }
    }

    #[test]
    fn test_read_clock() {
        let mut cpu = boot(&[op(Operation::Rds, 0).on_unit(Unit::Clock), op(Operation::Hlt, 0)]);
        cpu.tick_real_time_clock(1.0);
        cpu.tick_real_time_clock(0.05);

        cpu.run(10);

        assert_eq!(cpu.accumulator(), Word::from_halves(0, 33));
    }

    #[test]
    fn test_clock_wraps_and_ignores_bad_input() {
        let mut cpu = Cpu::new();

        cpu.tick_real_time_clock(2048.0);
        assert_eq!(cpu.rtc(), 0);

        cpu.tick_real_time_clock(2047.0 + 31.0 / 32.0);
        assert_eq!(cpu.rtc(), 65535);

        cpu.tick_real_time_clock(1.0 / 32.0);
        assert_eq!(cpu.rtc(), 0);

        cpu.tick_real_time_clock(-1.0);
        cpu.tick_real_time_clock(0.0);
        cpu.tick_real_time_clock(f64::NAN);
        assert_eq!(cpu.rtc(), 0);
    }

    #[test]
    fn test_reset_preserves_memory_and_drum() {
        let mut cpu = boot(&[op(Operation::Cad, 20), op(Operation::Wds, 1).on_unit(Unit::Gfi), op(Operation::Hlt, 0)]);
        cpu.memory_mut().write(Bank::One, 20, Word::from_raw(7));
        cpu.tick_real_time_clock(3.0);
        cpu.run(10);

        cpu.reset();

        assert!(cpu.is_halted());
        assert_eq!(cpu.halt_reason(), HaltReason::Reset);
        assert_eq!(cpu.registers(), &Registers::new());
        assert_eq!(cpu.instruction_count(), 0);
        assert_eq!(cpu.last_instruction(), None);
        assert_eq!(cpu.memory().read(Bank::One, 20), Word::from_raw(7));
        assert_eq!(cpu.drum().read(Field::Gfi, 1), Word::from_raw(7));
        assert!(cpu.drum().check_status(Channel::Field(Field::Gfi)));
    }

    #[test]
    fn test_light_gun_scan_loop() {
        let mut cpu = boot(&[
            op(Operation::Cad, 20),
            op(Operation::Drw, 100),
            op(Operation::Sns, 10).on_unit(Unit::LightGun),
            op(Operation::Cad, 21),
            op(Operation::Drw, 101),
            op(Operation::Sns, 10).on_unit(Unit::LightGun),
            op(Operation::Cad, 22),
            op(Operation::Drw, 102),
            op(Operation::Sns, 10).on_unit(Unit::LightGun),
            op(Operation::Hlt, 0),
            op(Operation::Hlt, 0),
        ]);
        let target = Word::from_fractions(-0.5, 0.25);
        cpu.memory_mut().write(Bank::One, 20, Word::from_fractions(0.5, 0.5));
        cpu.memory_mut().write(Bank::One, 21, target);
        cpu.memory_mut().write(Bank::One, 22, Word::from_fractions(0.0, 0.0));

        cpu.arm_light_gun(256.0, 640.0);
        assert_eq!(cpu.run(100), 7);

        assert_eq!(cpu.pc(), 11);
        assert_eq!(cpu.drum().read(Field::Sd, 101), target);
        assert!(cpu.drum().check_status(Channel::LightGun));
        assert_eq!(cpu.poll_light_gun(), Some(101));
        assert!(!cpu.drum().check_status(Channel::LightGun));
        assert_eq!(cpu.poll_light_gun(), None);
    }

    #[test]
    fn test_clear_light_gun_channel_keeps_flash() {
        let mut cpu = boot(&[
            op(Operation::Cad, 20),
            op(Operation::Drw, 7),
            op(Operation::Cls, 0).on_unit(Unit::LightGun),
            op(Operation::Hlt, 0),
        ]);
        cpu.memory_mut().write(Bank::One, 20, Word::from_fractions(0.0, 0.0));
        cpu.arm_light_gun(512.0, 512.0);

        cpu.run(10);

        assert!(!cpu.drum().check_status(Channel::LightGun));
        assert_eq!(cpu.poll_light_gun(), Some(7));
    }
}
