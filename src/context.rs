//! The mutable execution context every action is threaded through.

use std::fmt::Write as FmtWrite;

use crate::bytecode::Word;
use crate::fault::{Fault, Result};

/**
  Operand stack, program counter, length of the loaded code, and accumulated output.

  Actions receive the context by exclusive reference and mutate it through the methods
  below. The operations that consume operands check the stack depth before touching
  anything, so a faulting instruction never pops part of its operands.
*/
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Context {
  /// Operand stack. The top is the last element.
  stack    : Vec<Word>,
  /// Index of the next instruction to fetch.
  pc       : usize,
  /// Length of the code currently being run. Jump targets are checked against it.
  code_len : usize,
  /// Text appended by `WRITE` and `WRITE_CHAR`.
  output   : String,
}

impl Context {

  pub fn new() -> Context {
    Context::default()
  }

  // region Stack

  /// Faults unless at least `count` operands are on the stack.
  pub fn require(&self, count: usize) -> Result<()> {
    match self.stack.len() < count {
      true  => Err(Fault::underflow(count, self.stack.len())),
      false => Ok(())
    }
  }

  pub fn push(&mut self, value: Word) {
    self.stack.push(value);
  }

  pub fn pop(&mut self) -> Result<Word> {
    self.stack.pop().ok_or_else(|| Fault::underflow(1, 0))
  }

  /**
    Pops the top two operands and returns them as `(below, top)`, i.e. in the order they
    were pushed. Faults without popping anything if fewer than two are present.
  */
  pub fn pop_pair(&mut self) -> Result<(Word, Word)> {
    self.require(2)?;
    let top   = self.pop()?;
    let below = self.pop()?;
    Ok((below, top))
  }

  /// Reads the top of the stack without popping it.
  pub fn top(&self) -> Result<Word> {
    self.stack.last().copied().ok_or_else(|| Fault::underflow(1, 0))
  }

  pub fn stack(&self) -> &[Word] {
    &self.stack
  }

  // endregion

  // region Control flow

  pub fn pc(&self) -> usize {
    self.pc
  }

  /// Length of the code currently being run.
  pub fn code_len(&self) -> usize {
    self.code_len
  }

  /// Checks that `target` lies in `[0, code_len)` and converts it to a program counter value.
  pub fn check_target(&self, target: Word) -> Result<usize> {
    match usize::try_from(target) {
      Ok(pc) if pc < self.code_len => Ok(pc),
      _                            => Err(Fault::OutOfBounds { target, len: self.code_len })
    }
  }

  /**
    Overwrites the program counter. The execution loop has already advanced the counter
    past the current instruction, so the new value is the next instruction fetched.
  */
  pub fn jump(&mut self, target: Word) -> Result<()> {
    self.pc = self.check_target(target)?;
    Ok(())
  }

  pub(crate) fn set_pc(&mut self, pc: usize) {
    self.pc = pc;
  }

  pub(crate) fn set_code_len(&mut self, code_len: usize) {
    self.code_len = code_len;
  }

  // endregion

  // region Output

  pub fn output(&self) -> &str {
    &self.output
  }

  pub fn write_word(&mut self, value: Word) {
    // Writing to a `String` cannot fail.
    let _ = write!(self.output, "{}", value);
  }

  pub fn write_char(&mut self, c: char) {
    self.output.push(c);
  }

  // endregion

  /// Clears the stack and the output and moves the program counter back to zero.
  pub fn reset(&mut self) {
    self.stack.clear();
    self.output.clear();
    self.pc = 0;
  }
}
