//! WebAssembly bindings for the emulator.
//!
//! This module provides JavaScript-friendly wrappers around the core
//! emulator: program loading, clock input, stepping, drum access and the
//! light gun.

use js_sys::Uint32Array;
use wasm_bindgen::prelude::*;

use crate::asm::assembler::assemble;
use crate::asm::program::Program;
use crate::cpu::memory::Bank;
use crate::io::Channel;
use crate::onescomplement::Word;
use crate::Cpu;

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn js_error(e: impl std::fmt::Display) -> JsError {
    JsError::new(&e.to_string())
}

fn bank_from_js(bank: u8) -> Result<Bank, JsError> {
    Bank::from_number(bank).ok_or_else(|| JsError::new("bank must be 1 or 2"))
}

/// WebAssembly-friendly CPU wrapper.
#[wasm_bindgen]
pub struct WasmCpu {
    cpu: Cpu,
    program: Program,
}

#[wasm_bindgen]
impl WasmCpu {
    /// Create a new CPU instance.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            program: Program::default(),
        }
    }

    /// Load a program from assembly source code.  Returns the word count.
    #[wasm_bindgen]
    pub fn load_asm(&mut self, source: &str) -> Result<usize, JsError> {
        let program = assemble(source).map_err(js_error)?;
        Ok(self.load(program))
    }

    /// Load a JSON program image.  Returns the word count.
    #[wasm_bindgen]
    pub fn load_image(&mut self, json: &str) -> Result<usize, JsError> {
        let program = Program::from_json(json).map_err(js_error)?;
        Ok(self.load(program))
    }

    /// Load raw words at `start` in `bank` (1 or 2).
    #[wasm_bindgen]
    pub fn load_words(&mut self, words: &[u32], start: u16, bank: u8) -> Result<(), JsError> {
        let words = words.iter().copied().map(Word::from_raw).collect();
        self.load(Program::new(start, bank_from_js(bank)?, words));
        Ok(())
    }

    /// Begin executing at the current PC.
    #[wasm_bindgen]
    pub fn start(&mut self) {
        self.cpu.start();
    }

    /// Step one instruction.  Returns its disassembly, or `undefined` if
    /// the CPU is halted.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Option<String> {
        self.cpu.step().map(|instr| instr.to_string())
    }

    /// Run until halt or `max_steps`.  Returns the number executed.
    #[wasm_bindgen]
    pub fn run(&mut self, max_steps: u32) -> u32 {
        self.cpu.run(u64::from(max_steps)) as u32
    }

    /// Halt and zero the registers.  Memory and drum are kept.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.cpu.reset();
    }

    /// Reset, then copy the last loaded program back into memory and
    /// point the PC at it.
    #[wasm_bindgen]
    pub fn reload(&mut self) {
        self.cpu.reset();
        self.program.load_into(&mut self.cpu);
    }

    /// Feed elapsed wall time to the real-time clock.
    #[wasm_bindgen]
    pub fn tick_real_time_clock(&mut self, elapsed_seconds: f64) {
        self.cpu.tick_real_time_clock(elapsed_seconds);
    }

    /// Check if CPU is running.
    #[wasm_bindgen]
    pub fn is_running(&self) -> bool {
        self.cpu.is_running()
    }

    /// Check if CPU is halted.
    #[wasm_bindgen]
    pub fn is_halted(&self) -> bool {
        self.cpu.is_halted()
    }

    /// Get state as string.
    #[wasm_bindgen]
    pub fn state(&self) -> String {
        format!("{:?}", self.cpu.state())
    }

    /// Get halt reason as string.
    #[wasm_bindgen]
    pub fn halt_reason(&self) -> String {
        format!("{:?}", self.cpu.halt_reason())
    }

    /// Instructions executed since the last reset.
    #[wasm_bindgen]
    pub fn instruction_count(&self) -> f64 {
        self.cpu.instruction_count() as f64
    }

    /// Get program counter.
    #[wasm_bindgen]
    pub fn pc(&self) -> u16 {
        self.cpu.pc()
    }

    /// Get the PC bank (1 or 2).
    #[wasm_bindgen]
    pub fn pc_bank(&self) -> u8 {
        self.cpu.pc_bank().number()
    }

    /// Get the real-time clock.
    #[wasm_bindgen]
    pub fn rtc(&self) -> u16 {
        self.cpu.rtc()
    }

    /// Get the raw accumulator.
    #[wasm_bindgen]
    pub fn accumulator(&self) -> u32 {
        self.cpu.accumulator().raw()
    }

    /// Get the accumulator as two fractions.
    #[wasm_bindgen]
    pub fn accumulator_fractions(&self) -> Vec<f64> {
        let (left, right) = self.cpu.accumulator().to_fractions();
        vec![left, right]
    }

    /// Get index register `n` (0-3).
    #[wasm_bindgen]
    pub fn index_register(&self, n: usize) -> Result<i16, JsError> {
        self.cpu
            .index_registers()
            .get(n)
            .copied()
            .ok_or_else(|| JsError::new("index register must be 0-3"))
    }

    /// Get a memory word.
    #[wasm_bindgen]
    pub fn memory_at(&self, bank: u8, address: usize) -> Result<u32, JsError> {
        Ok(self.cpu.memory().read(bank_from_js(bank)?, address).raw())
    }

    /// Get a range of memory as raw words.
    #[wasm_bindgen]
    pub fn memory_range(&self, bank: u8, start: usize, count: usize) -> Result<Uint32Array, JsError> {
        let words: Vec<u32> = self
            .cpu
            .memory()
            .dump(bank_from_js(bank)?, start, count)
            .into_iter()
            .map(|(_, w)| w.raw())
            .collect();
        Ok(Uint32Array::from(words.as_slice()))
    }

    /// Write a word to a named drum field.
    #[wasm_bindgen]
    pub fn write_field(&mut self, name: &str, address: usize, word: u32) -> Result<(), JsError> {
        self.cpu
            .drum_mut()
            .write_field(name, address, Word::from_raw(word))
            .map_err(js_error)
    }

    /// Read a word from a named drum field.
    #[wasm_bindgen]
    pub fn read_field(&self, name: &str, address: usize) -> Result<u32, JsError> {
        self.cpu
            .drum()
            .read_field(name, address)
            .map(Word::raw)
            .map_err(js_error)
    }

    /// Whether a named status channel is raised.
    #[wasm_bindgen]
    pub fn check_status(&self, channel: &str) -> Result<bool, JsError> {
        let channel: Channel = channel.parse().map_err(js_error)?;
        Ok(self.cpu.drum().check_status(channel))
    }

    /// Aim the light gun at scope position (x, y).
    #[wasm_bindgen]
    pub fn arm_light_gun(&mut self, x: f64, y: f64) {
        self.cpu.arm_light_gun(x, y);
    }

    /// Collect the detected point id, or `undefined`.
    #[wasm_bindgen]
    pub fn poll_light_gun(&mut self) -> Option<u16> {
        self.cpu.poll_light_gun()
    }
}

impl WasmCpu {
    fn load(&mut self, program: Program) -> usize {
        program.load_into(&mut self.cpu);
        self.program = program;
        self.program.len()
    }
}

impl Default for WasmCpu {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble source code and return the image as JSON.
#[wasm_bindgen]
pub fn wasm_assemble(source: &str) -> Result<String, JsError> {
    let program = assemble(source).map_err(js_error)?;
    program.to_json().map_err(js_error)
}

/// Disassemble a single word.
#[wasm_bindgen]
pub fn wasm_disassemble(word: u32) -> String {
    crate::asm::disassemble_word(Word::from_raw(word))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SELF_MODIFYING: &str = "ORG 20\nCAD V\nSTO V\nHLT\nV: DAT 0x11112222\n";

    #[test]
    fn test_reset_keeps_memory() {
        let mut w = WasmCpu::new();
        assert_eq!(w.load_asm(SELF_MODIFYING).ok(), Some(4));
        w.start();
        w.run(10);
        w.cpu.memory_mut().write(Bank::One, 23, Word::from_raw(0xDEAD));

        w.reset();

        assert_eq!(w.pc(), 0);
        assert_eq!(w.pc_bank(), 1);
        assert!(w.is_halted());
        assert_eq!(w.cpu.memory().read(Bank::One, 23).raw(), 0xDEAD);
    }

    #[test]
    fn test_reload_restores_program() {
        let mut w = WasmCpu::new();
        assert_eq!(w.load_asm(SELF_MODIFYING).ok(), Some(4));
        w.cpu.memory_mut().write(Bank::One, 23, Word::from_raw(0xDEAD));

        w.reload();

        assert_eq!(w.pc(), 20);
        assert_eq!(w.cpu.memory().read(Bank::One, 23).raw(), 0x1111_2222);
        assert_eq!(w.accumulator(), 0);
    }
}
