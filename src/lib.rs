/*!
  A small extensible stack-based bytecode virtual machine.

  A `Machine` owns an instruction `Registry`, which it fills with the standard instruction
  set when it is created, and an execution `Context` holding the operand stack, program
  counter, and output text. Programs are written in a line oriented assembly, turned into
  `Code` by `assemble`, and executed by `Machine::run`:

  ```
  use stackvm::Machine;

  let mut machine = Machine::new(false);
  let code        = machine.assemble("LOAD_CONST 3\nLOAD_CONST 4\nADD\nWRITE\nEXIT").unwrap();
  let outcome     = machine.run(&code).unwrap();

  assert_eq!(outcome.value, 7);
  assert_eq!(outcome.output, "7");
  ```

  New instructions are closures over the `Context`:

  ```
  use stackvm::{Flow, Machine};

  let mut machine = Machine::new(false);
  machine.register("NEG", |context, _| {
    let value = context.pop()?;
    context.push(-value);
    Ok(Flow::Continue)
  }).unwrap();

  let code = machine.assemble("LOAD_CONST 5\nNEG\nEXIT").unwrap();
  assert_eq!(machine.run(&code).unwrap().value, -5);
  ```
*/

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;

pub mod bytecode;
pub mod context;
pub mod fault;
pub mod machine;
pub mod registry;
pub mod split;
pub mod standard;

pub use bytecode::{assemble, Builtin, Code, Flow, Instruction, Opcode, Word};
pub use context::Context;
pub use fault::{Fault, Result};
pub use machine::{Machine, Outcome};
pub use registry::{Action, Mnemonic, Registry};
