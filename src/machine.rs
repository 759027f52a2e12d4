//! The machine: an instruction registry, an execution context, and the loop that runs code
//! against them.

use std::fmt::{Display, Formatter};

use prettytable::{format as TableFormat, Table};
use tracing::{debug, trace};

use crate::bytecode::{assemble, Code, Flow, Instruction, Opcode, Word};
use crate::context::Context;
use crate::fault::{Fault, Result};
use crate::registry::Registry;

/// What a successful run produces: the top of the stack at halt, and the output text.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Outcome {
  pub value  : Word,
  pub output : String,
}

pub struct Machine {
  registry : Registry,
  context  : Context,
  /// Echo a disassembly and every executed instruction to stderr.
  debug    : bool,
}

impl Machine {

  // region Display methods

  fn make_stack_table(stack: &[Word]) -> Table {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Depth", ubl->"Value"]);

    // Top of stack first.
    for (depth, value) in stack.iter().rev().enumerate() {
      match depth == 0 {

        true  => {
          table.add_row(row![r->format!("* --> S[{}] =", depth), value]);
        }

        false => {
          table.add_row(row![r->format!("S[{}] =", depth), value]);
        }

      } // end match on top
    } // end for
    table
  }

  /**
    Renders `code` as a table of program counter, mnemonic, and argument, stopping at the
    first opcode this machine's registry never issued. Returns the table and the program
    counter of that opcode, if there is one.
  */
  fn make_listing(&self, code: &[Instruction]) -> (Table, Option<usize>) {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"PC", ubl->"Instruction", ubr->"Argument"]);

    for (pc, instruction) in code.iter().enumerate() {
      match self.registry.mnemonic(instruction.opcode) {
        Some(mnemonic) => {
          table.add_row(row![r->pc, mnemonic, r->instruction.argument]);
        }
        None           => return (table, Some(pc))
      }
    }

    (table, None)
  }

  /// The full listing of `code`, or `None` if it contains an opcode unknown to the registry.
  pub fn disassemble(&self, code: &[Instruction]) -> Option<String> {
    match self.make_listing(code) {
      (table, None) => Some(table.to_string()),
      (_, Some(_))  => None
    }
  }

  // endregion

  // region Construction and accessors

  /// A machine with the standard instruction set, an empty stack, and the counter at zero.
  pub fn new(debug: bool) -> Machine {
    Machine::with_registry(Registry::standard(), debug)
  }

  pub fn with_registry(registry: Registry, debug: bool) -> Machine {
    Machine {
      registry,
      context : Context::new(),
      debug,
    }
  }

  /// Adds an instruction to this machine. See `Registry::register`.
  pub fn register<F>(&mut self, mnemonic: &str, action: F) -> Result<Opcode>
    where F: Fn(&mut Context, Word) -> Result<Flow> + 'static
  {
    self.registry.register(mnemonic, action)
  }

  /// Assembles `source` against this machine's registry.
  pub fn assemble(&self, source: &str) -> Result<Code> {
    assemble(&self.registry, source)
  }

  pub fn registry(&self) -> &Registry {
    &self.registry
  }

  pub fn stack(&self) -> &[Word] {
    self.context.stack()
  }

  pub fn output(&self) -> &str {
    self.context.output()
  }

  pub fn pc(&self) -> usize {
    self.context.pc()
  }

  pub fn debug(&self) -> bool {
    self.debug
  }

  pub fn set_debug(&mut self, debug: bool) {
    self.debug = debug;
  }

  /// Clears the stack and the output and moves the program counter back to zero.
  pub fn reset(&mut self) {
    self.context.reset();
  }

  /// Moves the program counter back to zero, keeping the stack and the output.
  pub fn rewind(&mut self) {
    self.context.set_pc(0);
  }

  // endregion

  // region Execution

  /**
    Runs `code` until an instruction signals a halt, and returns the top of the stack
    together with all output accumulated so far.

    Execution starts at the current program counter, which is zero for a fresh machine but
    is not reset between runs, and neither are the stack and the output. Use `rewind` or
    `reset` between runs as needed.

    The counter is advanced past each instruction *before* its action runs. A jump
    overwrites the advanced value, and that overwrite is what the next fetch sees.

    Running off either end of the code is `Fault::OutOfBounds`; programs must halt
    explicitly. A program that never halts runs forever. See `run_bounded`.
  */
  pub fn run(&mut self, code: &[Instruction]) -> Result<Outcome> {
    self.execute(code, None)
  }

  /// Like `run`, but faults with `Fault::StepLimitExceeded` once `max_steps` instructions
  /// have executed without a halt.
  pub fn run_bounded(&mut self, code: &[Instruction], max_steps: usize) -> Result<Outcome> {
    self.execute(code, Some(max_steps))
  }

  /**
    Writes the disassembly of `code` to stderr if the debug flag is set, and returns
    whether the run should trace each instruction. The listing goes up to the first
    opcode with no known mnemonic; after such an opcode, tracing is off for this run. The
    debug flag itself is not changed.
  */
  fn begin_trace(&self, code: &[Instruction]) -> bool {
    if !self.debug {
      return false;
    }

    eprintln!("=== running vm ======================");
    eprintln!("disassembly of run code:");
    let (listing, unknown) = self.make_listing(code);
    eprintln!("{}", listing);

    let tracing_run = match unknown {

      Some(pc) => {
        eprintln!("could not disassemble - opcode {} at pc={} unknown...", code[pc].opcode, pc);
        eprintln!("turning off debug mode.");
        debug!(pc, opcode = code[pc].opcode, "disassembly failed, tracing disabled");
        false
      }

      None     => true

    };
    eprintln!("=== end of disassembly\n");
    tracing_run
  }

  fn execute(&mut self, code: &[Instruction], limit: Option<usize>) -> Result<Outcome> {
    let tracing_run = self.begin_trace(code);

    self.context.set_code_len(code.len());
    debug!(len = code.len(), pc = self.context.pc(), "run started");

    let mut steps: usize = 0;
    loop {
      if let Some(limit) = limit {
        if steps >= limit {
          debug!(limit, "step limit exceeded");
          return Err(Fault::StepLimitExceeded { limit });
        }
      }

      let pc          = self.context.pc();
      let instruction =
        code.get(pc)
            .copied()
            .ok_or(Fault::OutOfBounds { target: pc as Word, len: code.len() })?;

      if tracing_run {
        let mnemonic =
          self.registry.mnemonic(instruction.opcode)
                       .map(|m| m.to_string())
                       .unwrap_or_else(|| instruction.to_string());
        eprintln!("-- exec {} arg={} at pc={}", mnemonic, instruction.argument, pc);
      }
      trace!(pc, opcode = instruction.opcode, argument = instruction.argument, "exec");

      // Advance first so that a jump can overwrite the counter.
      self.context.set_pc(pc + 1);

      let action =
        self.registry
            .action(instruction.opcode)
            .ok_or(Fault::UnknownOpcode { opcode: instruction.opcode, pc })?;

      let flow =
        action(&mut self.context, instruction.argument)
          .map_err(|fault| {
            debug!(pc, %fault, "instruction faulted");
            fault
          })?;
      steps += 1;

      #[cfg(feature = "trace_computation")]
      {
        if tracing_run {
          eprintln!("{}", Machine::make_stack_table(self.context.stack()));
        }
      }

      if flow == Flow::Halt {
        break;
      }
    }

    // A halt with nothing on the stack has no result to report.
    let value = self.context.top()?;
    debug!(value, steps, "run halted");

    Ok(Outcome {
      value,
      output : self.context.output().to_string(),
    })
  }

  // endregion

}

impl Default for Machine {
  fn default() -> Machine {
    Machine::new(false)
  }
}


lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

impl Display for Machine {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let stack_table = Machine::make_stack_table(self.context.stack());

    write!(
      f,
      "PC: {}\tInstructions: {}\tOutput: {:?}\n{}",
      self.context.pc(),
      self.registry.len(),
      self.context.output(),
      stack_table
    )
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  fn run_source(source: &str) -> Result<Outcome> {
    let mut machine = Machine::new(false);
    let code        = machine.assemble(source)?;
    machine.run(&code)
  }

  #[test]
  fn add_program_returns_sum_and_no_output() {
    let outcome = run_source("LOAD_CONST 3\nLOAD_CONST 4\nADD\nEXIT").unwrap();
    assert_eq!(outcome, Outcome { value: 7, output: String::new() });
  }

  #[test]
  fn dup_eq_is_always_one() {
    assert_eq!(run_source("LOAD_CONST 5\nDUP\nEQ\nEXIT").unwrap().value, 1);
  }

  #[test]
  fn division_by_zero_faults_before_exit() {
    let mut machine = Machine::new(false);
    let code        = machine.assemble("LOAD_CONST 4\nLOAD_CONST 0\nDIV\nEXIT").unwrap();

    assert_eq!(machine.run(&code), Err(Fault::DivisionByZero));
    // The counter was advanced past DIV before it ran; EXIT never executed.
    assert_eq!(machine.pc(), 3);
    assert_eq!(machine.stack(), &[4, 0]);
  }

  #[test]
  fn write_char_outputs_a() {
    assert_eq!(run_source("LOAD_CONST 65\nWRITE_CHAR\nEXIT").unwrap().output, "A");
  }

  #[test]
  fn running_off_the_end_is_out_of_bounds() {
    assert_eq!(
      run_source("LOAD_CONST 1\nPOP"),
      Err(Fault::OutOfBounds { target: 2, len: 2 })
    );
  }

  #[test]
  fn empty_code_is_out_of_bounds() {
    assert_eq!(run_source(""), Err(Fault::OutOfBounds { target: 0, len: 0 }));
  }

  #[test]
  fn halting_with_empty_stack_is_underflow() {
    let mut machine = Machine::new(false);
    machine.register("HALT", |_, _| Ok(Flow::Halt)).unwrap();
    let code = machine.assemble("HALT").unwrap();

    assert_eq!(machine.run(&code), Err(Fault::underflow(1, 0)));
  }

  #[test]
  fn unregistered_opcode_is_an_internal_fault() {
    let mut machine = Machine::new(false);
    let code        = vec![Instruction::new(99, 0)];
    assert_eq!(machine.run(&code), Err(Fault::UnknownOpcode { opcode: 99, pc: 0 }));
  }

  /// The jump target is stored after the counter is advanced, so the jump sticks.
  #[test]
  fn jump_overwrites_advanced_counter() {
    let source = "LOAD_CONST 1\nJMP 4\nLOAD_CONST 2\nEXIT\nLOAD_CONST 3\nEXIT";
    assert_eq!(run_source(source).unwrap().value, 3);
  }

  #[test]
  fn countdown_loop_writes_digits() {
    // Writes 3, 2, 1 and halts with 0 on the stack.
    let source = "\
LOAD_CONST 3
WRITE
LOAD_CONST -1
ADD
DUP
JMPZ 7
JMP 1
EXIT";
    let outcome = run_source(source).unwrap();
    assert_eq!(outcome.output, "321");
    assert_eq!(outcome.value, 0);
  }

  #[test]
  fn bounded_run_stops_infinite_loop() {
    let mut machine = Machine::new(false);
    let code        = machine.assemble("LOAD_CONST 0\nJMP 1").unwrap();

    assert_eq!(machine.run_bounded(&code, 50), Err(Fault::StepLimitExceeded { limit: 50 }));
  }

  #[test]
  fn bounded_run_that_halts_in_time_succeeds() {
    let mut machine = Machine::new(false);
    let code        = machine.assemble("LOAD_CONST 9\nEXIT").unwrap();
    assert_eq!(machine.run_bounded(&code, 2).unwrap().value, 9);
  }

  #[test]
  fn unknown_opcode_turns_tracing_off_for_the_run() {
    let mut machine = Machine::new(true);
    let code        = vec![Instruction::new(1, 5), Instruction::new(2, 0), Instruction::new(77, 0)];

    assert!(!machine.begin_trace(&code));
    assert!(machine.disassemble(&code).is_none());

    // The run still succeeds, and the machine stays in debug mode for later runs.
    assert_eq!(machine.run(&code).unwrap().value, 5);
    assert!(machine.debug());

    assert!(machine.begin_trace(&code[..2]));
  }

  #[test]
  fn tracing_follows_debug_flag() {
    let mut machine = Machine::new(false);
    let code        = machine.assemble("LOAD_CONST 1\nEXIT").unwrap();
    assert!(!machine.begin_trace(&code));

    machine.set_debug(true);
    assert!(machine.begin_trace(&code));
  }

  #[test]
  fn listing_stops_at_unknown_opcode() {
    let machine = Machine::new(false);
    let code    = vec![Instruction::new(1, 41), Instruction::new(99, 0), Instruction::new(1, 43)];

    let (table, unknown) = machine.make_listing(&code);
    let listing          = table.to_string();

    assert_eq!(unknown, Some(1));
    assert!(listing.contains("LOAD_CONST"));
    assert!(listing.contains("41"));
    assert!(!listing.contains("43"));
  }

  #[test]
  fn disassembly_lists_mnemonics_and_arguments() {
    let machine = Machine::new(false);
    let code    = machine.assemble("LOAD_CONST -3\nEXIT").unwrap();
    let listing = machine.disassemble(&code).unwrap();

    assert!(listing.contains("LOAD_CONST"));
    assert!(listing.contains("-3"));
    assert!(listing.contains("EXIT"));
  }

  #[test]
  fn display_shows_stack_top_first() {
    let mut machine = Machine::new(false);
    let code        = machine.assemble("LOAD_CONST 11\nLOAD_CONST 22\nEXIT").unwrap();
    machine.run(&code).unwrap();

    let text = machine.to_string();
    assert!(text.starts_with("PC: 3"));
    assert!(text.find("22").unwrap() < text.find("11").unwrap());
  }
}
