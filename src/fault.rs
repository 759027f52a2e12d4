//! Faults raised by the registry, the assembler, and the execution loop.
//!
//! Every fault aborts the call that raised it. Nothing here is retried or recovered from
//! inside the machine; the caller decides what to do with the machine afterwards.

use string_cache::DefaultAtom;
use thiserror::Error;

use crate::bytecode::{Opcode, Word};

pub type Result<T> = std::result::Result<T, Fault>;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum Fault {
  /// An instruction required more operands than the stack holds. Also raised when a run
  /// halts with an empty stack, since there is no result to return.
  #[error("stack underflow: {required} operand(s) required but {available} present")]
  StackUnderflow {
    required  : usize,
    available : usize,
  },

  #[error("division by zero")]
  DivisionByZero,

  /// A jump target, or the program counter itself, left `[0, len)`.
  #[error("program counter {target} out of bounds for code of length {len}")]
  OutOfBounds {
    target : Word,
    len    : usize,
  },

  #[error("line {line}: unknown instruction `{mnemonic}`")]
  UnknownInstruction {
    mnemonic : String,
    line     : usize,
  },

  #[error("line {line}: malformed instruction `{text}`: {reason}")]
  MalformedInstruction {
    line   : usize,
    text   : String,
    reason : String,
  },

  /// The code references an opcode the registry never issued.
  #[error("no action bound to opcode {opcode} at pc={pc}")]
  UnknownOpcode {
    opcode : Opcode,
    pc     : usize,
  },

  #[error("instruction `{0}` is already registered")]
  DuplicateMnemonic(DefaultAtom),

  #[error("`{0}` is not a valid mnemonic")]
  InvalidMnemonic(String),

  #[error("step limit of {limit} instruction(s) exceeded")]
  StepLimitExceeded {
    limit : usize,
  },
}

impl Fault {
  pub(crate) fn underflow(required: usize, available: usize) -> Fault {
    Fault::StackUnderflow { required, available }
  }
}
