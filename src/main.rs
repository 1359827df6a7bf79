//! FSQ-7 Emulator - CLI Entry Point
//!
//! Commands:
//! - `fsq7-emu run <program>` - Run a program image or ASM file
//! - `fsq7-emu asm <source>` - Assemble to a program image
//! - `fsq7-emu disasm <image>` - Disassemble a program image
//! - `fsq7-emu test` - Built-in self-test

use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;

use fsq7::{Bank, Cpu, HaltReason, Program};

#[derive(Parser)]
#[command(name = "fsq7-emu")]
#[command(version = "0.1.0")]
#[command(about = "An emulator of the AN/FSQ-7 central processor, drum and light gun")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the program image (JSON) or ASM file to execute
        program: String,
        /// Load address (defaults to the image origin)
        #[arg(short, long)]
        start: Option<u16>,
        /// Memory bank to load into (defaults to the image bank)
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=2))]
        bank: Option<u8>,
        /// Maximum number of instructions to run
        #[arg(short, long, default_value = "10000")]
        max_steps: u64,
        /// Log every instruction (same as RUST_LOG=trace)
        #[arg(short, long)]
        trace: bool,
        /// Simulated seconds that pass per instruction, fed to the real-time clock
        #[arg(short, long)]
        clock_seconds: Option<f64>,
    },
    /// Assemble source to a program image
    Asm {
        /// Path to the source file
        source: String,
        /// Output image file
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Disassemble a program image to readable text
    Disasm {
        /// Path to the image file
        image: String,
    },
    /// Run the built-in self-test
    Test,
}

fn main() {
    let cli = Cli::parse();

    let trace = matches!(cli.command, Some(Commands::Run { trace: true, .. }));
    if let Err(e) = init_logging(trace) {
        eprintln!("❌ Failed to set up logging: {}", e);
        std::process::exit(1);
    }

    match cli.command {
        Some(Commands::Run {
            program,
            start,
            bank,
            max_steps,
            trace: _,
            clock_seconds,
        }) => {
            let bank = bank.and_then(Bank::from_number);
            run_program(&program, start, bank, max_steps, clock_seconds);
        }
        Some(Commands::Asm { source, output }) => {
            assemble_file(&source, output);
        }
        Some(Commands::Disasm { image }) => {
            disassemble_file(&image);
        }
        Some(Commands::Test) => {
            run_self_test();
        }
        None => {
            println!("FSQ-7 Emulator v0.1.0");
            println!("A one's-complement, two-bank, drum-buffered air-defence computer");
            println!();
            println!("Use --help for available commands");
        }
    }
}

fn init_logging(trace: bool) -> Result<(), tracing_subscriber::filter::ParseError> {
    // RUST_LOG selects which events are printed; see
    // https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html
    let default = if trace { "trace" } else { "info" };
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(default))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
    Ok(())
}

/// Read a program: `.asm` files are assembled, anything else is a JSON image.
fn load_program_file(path: &str) -> Program {
    if path.ends_with(".asm") {
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("❌ Failed to read file: {}", e);
                std::process::exit(1);
            }
        };

        match fsq7::assemble(&source) {
            Ok(program) => {
                println!("📝 Assembled {} words", program.len());
                program
            }
            Err(e) => {
                eprintln!("❌ Assembly error: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        match fsq7::load_image(path) {
            Ok(program) => {
                println!("📂 Loaded {} words", program.len());
                program
            }
            Err(e) => {
                eprintln!("❌ Failed to load image: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn run_program(path: &str, start: Option<u16>, bank: Option<Bank>, max_steps: u64, clock_seconds: Option<f64>) {
    println!("🔧 Running: {}", path);

    let program = load_program_file(path);
    if program.is_empty() {
        eprintln!("❌ No words to execute");
        std::process::exit(1);
    }

    // Create CPU and load program
    let mut cpu = Cpu::new();
    let start = start.unwrap_or(program.origin);
    let bank = bank.unwrap_or(program.bank);
    cpu.load_program(&program.words, start, bank);
    cpu.start();

    println!();
    println!("━━━ Execution ━━━");

    let executed = match clock_seconds {
        None => cpu.run(max_steps),
        Some(per_step) => {
            // The clock only counts whole ticks, so carry the remainder here.
            let mut pending = 0.0;
            let mut executed = 0;
            while executed < max_steps && cpu.step().is_some() {
                executed += 1;
                pending += per_step;
                if pending * fsq7::CLOCK_HZ >= 1.0 {
                    let whole = (pending * fsq7::CLOCK_HZ).floor() / fsq7::CLOCK_HZ;
                    cpu.tick_real_time_clock(whole);
                    pending -= whole;
                }
            }
            executed
        }
    };

    let acc = cpu.accumulator();
    let (left, right) = acc.to_fractions();

    println!();
    println!("━━━ Result ━━━");
    println!("Instructions: {}", executed);
    println!("State: {:?} ({:?})", cpu.state(), cpu.halt_reason());
    println!("A (accumulator): {} ({:+.5}, {:+.5})", acc, left, right);
    println!("X (index):       {:?}", cpu.index_registers());
    println!("PC:              {} {}", cpu.pc(), cpu.pc_bank());
    println!("RTC:             {}", cpu.rtc());
    println!("Drum:            {:?}", cpu.drum());

    if cpu.is_running() {
        println!();
        println!("⚠️  Reached max steps limit ({}). Use --max-steps to increase.", max_steps);
    }
}

fn assemble_file(source_path: &str, output: Option<String>) {
    let out_path = output.unwrap_or_else(|| source_path.replace(".asm", ".json"));

    println!("📝 Assembling: {} → {}", source_path, out_path);

    // Read source
    let source = match std::fs::read_to_string(source_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Failed to read file: {}", e);
            std::process::exit(1);
        }
    };

    // Assemble
    let program = match fsq7::assemble(&source) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("❌ Assembly error: {}", e);
            std::process::exit(1);
        }
    };

    println!("✓ Assembled {} words at origin {}", program.len(), program.origin);

    if let Err(e) = fsq7::save_image(&out_path, &program) {
        eprintln!("❌ Failed to save image: {}", e);
        std::process::exit(1);
    }

    println!("✓ Saved to {}", out_path);
}

fn disassemble_file(image_path: &str) {
    println!("📖 Disassembling: {}", image_path);
    println!();

    let program = match fsq7::load_image(image_path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("❌ Failed to load image: {}", e);
            std::process::exit(1);
        }
    };

    println!("{}", fsq7::disassemble(&program));
}

const SUM_PROGRAM: &str = r#"
        LDX COUNT,R0
LOOP:   SHL 1           ; pre-scale the running total
        ADD TABLE-1,X1  ; the adder halves, so values are stored doubled
        TIX LOOP,R0
        HLT
COUNT:  DAT 5
TABLE:  DAT 2,0
        DAT 4,0
        DAT 6,0
        DAT 8,0
        DAT 10,0
"#;

const SCAN_PROGRAM: &str = r#"
        LDX COUNT,R1
NEXT:   CAD POINTS-1,X2
        DRW 0,X2
        SNS FOUND,LG
        TIX NEXT,R1
        HLT
FOUND:  HLT
COUNT:  DAT 3
POINTS: DAT 0.5,0.5
        DAT -0.5,0.25
        DAT 0.0,0.0
"#;

fn run_self_test() {
    use fsq7::onescomplement::half;
    use fsq7::Word;

    println!("━━━ FSQ-7 Emulator Self-Test ━━━");
    println!();

    let mut passed = 0;
    let mut failed = 0;

    let mut check = |name: &str, ok: bool, detail: String| {
        print!("{}... ", name);
        if ok {
            println!("✓");
            passed += 1;
        } else {
            println!("✗ ({})", detail);
            failed += 1;
        }
    };

    // Negation involution
    let ok = [0u16, 1, 0x1234, 0x7FFF, 0x8000, 0xFFFF]
        .into_iter()
        .all(|h| half::negate(half::negate(h)) == h);
    check("Negation involution", ok, String::new());

    // a + -a = -0
    let ok = [0u16, 1, 0x1234, 0x7FFF]
        .into_iter()
        .all(|h| half::add_ones_complement(h, half::negate(h)) == half::MINUS_ZERO);
    check("Additive inverse (a + -a = -0)", ok, String::new());

    // End-around carry
    let sum = half::add_ones_complement(half::from_integer(-1), half::from_integer(-1));
    check(
        "End-around carry (-1 + -1 = -2)",
        half::to_integer(sum) == -2,
        format!("got {}", half::to_integer(sum)),
    );

    // Fraction round trip
    let w = Word::from_fractions(0.5, -0.25);
    check("Fraction round trip", w.to_fractions() == (0.5, -0.25), format!("{:?}", w));

    // CPU halt
    let mut cpu = Cpu::new();
    cpu.load_program(&[Word::ZERO], 0, Bank::One);
    cpu.start();
    let executed = cpu.run(10);
    check(
        "CPU halt instruction",
        executed == 1 && cpu.halt_reason() == HaltReason::HaltInstruction,
        format!("{:?}", cpu),
    );

    // Summation loop
    let mut cpu = Cpu::new();
    match fsq7::assemble(SUM_PROGRAM) {
        Ok(program) => {
            program.load_into(&mut cpu);
            cpu.start();
            cpu.run(1000);
            let total = half::to_integer(cpu.accumulator().left());
            check("CPU summation loop", total == 15, format!("got {}, expected 15", total));
        }
        Err(e) => check("CPU summation loop", false, e.to_string()),
    }

    // Light gun scan
    let mut cpu = Cpu::new();
    match fsq7::assemble(SCAN_PROGRAM) {
        Ok(program) => {
            program.load_into(&mut cpu);
            cpu.arm_light_gun(256.0, 640.0);
            cpu.start();
            cpu.run(1000);
            let id = cpu.poll_light_gun();
            check("Light gun scan", id == Some(2), format!("got {:?}, expected Some(2)", id));
        }
        Err(e) => check("Light gun scan", false, e.to_string()),
    }

    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed == 0 {
        println!("✓ All tests passed!");
    } else {
        std::process::exit(1);
    }
}
