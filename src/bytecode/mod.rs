/*!

  The VM operates on signed 64 bit machine words. Every operand on the stack is a `Word`,
  and so is the single argument carried by every instruction. There is no heap and no
  other value type.

  An instruction is a pair of an opcode and an argument. Opcodes are not fixed at compile
  time: they are dense, sequential numbers handed out by a `Registry` in registration
  order, starting at zero. Code produced by the assembler is therefore only meaningful
  to the registry that assembled it.

  The standard instruction set is described by the `Builtin` enum below. The enum exists
  only to give the builtin mnemonics a single source of truth (via the `strum` derives);
  dispatch never goes through it. A fresh machine registers the builtins in declaration
  order, so the order the variants are listed below is also their opcode order.

*/

pub mod assembly;

use std::fmt::{Display, Formatter};

use strum_macros::{Display as StrumDisplay, EnumIter, EnumString, IntoStaticStr};

pub use assembly::{assemble, parse_argument};

/// The machine word. Operands, arguments, and results are all `Word`s.
pub type Word = i64;

/// Dense instruction identifier assigned by a `Registry`.
pub type Opcode = u32;

/// Assembled code: instructions in source line order.
pub type Code = Vec<Instruction>;

/// One assembled instruction. The argument is zero when the source line supplies none.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct Instruction {
  pub opcode   : Opcode,
  pub argument : Word,
}

impl Instruction {
  pub fn new(opcode: Opcode, argument: Word) -> Instruction {
    Instruction { opcode, argument }
  }
}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "#{}({})", self.opcode, self.argument)
  }
}

/**
  The signal an action returns when it completes without a fault. `Halt` ends the run
  successfully; `Continue` fetches the next instruction.
*/
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Flow {
  Continue,
  Halt,
}

/**
  Mnemonics of the standard instruction set.

  Order-dependencies:

  ```text
  standard::install()
  ```
*/
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, EnumIter,
  Clone,        Copy,          Eq,         PartialEq,  Debug, Hash
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Builtin {
  Print,      // print top to stdout
  LoadConst,  // push argument
  Exit,       // halt
  Pop,
  Add,
  Div,        // numerator / denominator, denominator on top
  Eq,
  Neq,
  Dup,
  Jmp,        // jmp( target )
  Jmpz,       // jmpz( target )
  Write,      // append decimal text of top to output
  WriteChar,  // append top as a character to output
}

impl Builtin {
  pub fn mnemonic(&self) -> &'static str {
    self.into()
  }

  /// The number of stack operands the instruction requires to be present.
  pub fn operands(&self) -> usize {
    match self {
      Builtin::LoadConst
      | Builtin::Jmp                             => 0,

      Builtin::Print
      | Builtin::Exit
      | Builtin::Pop
      | Builtin::Dup
      | Builtin::Jmpz
      | Builtin::Write
      | Builtin::WriteChar                       => 1,

      Builtin::Add
      | Builtin::Div
      | Builtin::Eq
      | Builtin::Neq                             => 2,
    }
  }
}
