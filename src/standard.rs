/*!
  The standard instruction set. Every action checks the stack depth it needs before it
  mutates anything, and every action except `EXIT` returns `Flow::Continue`.

  Arithmetic wraps on overflow, and division truncates toward zero.
*/

use std::io::{self, Write as IoWrite};

use strum::IntoEnumIterator;
use tracing::warn;

use crate::bytecode::{Builtin, Flow, Word};
use crate::context::Context;
use crate::fault::{Fault, Result};
use crate::registry::{Action, Mnemonic, Registry};

/**
  Registers the builtins into `registry` in `Builtin` declaration order. The builtin
  mnemonics are distinct enum variants, so on a fresh registry the opcodes come out as
  `0..13` and no duplicate check is needed.
*/
pub(crate) fn install(registry: &mut Registry) {
  for builtin in Builtin::iter() {
    registry.install(Mnemonic::from(builtin.mnemonic()), action(builtin));
  }
}

/// The action implementing `builtin`.
pub fn action(builtin: Builtin) -> Action {
  match builtin {
    Builtin::Print     => Box::new(print),
    Builtin::LoadConst => Box::new(load_const),
    Builtin::Exit      => Box::new(exit),
    Builtin::Pop       => Box::new(pop),
    Builtin::Add       => Box::new(add),
    Builtin::Div       => Box::new(div),
    Builtin::Eq        => Box::new(eq),
    Builtin::Neq       => Box::new(neq),
    Builtin::Dup       => Box::new(dup),
    Builtin::Jmp       => Box::new(jmp),
    Builtin::Jmpz      => Box::new(jmpz),
    Builtin::Write     => Box::new(write),
    Builtin::WriteChar => Box::new(write_char),
  }
}

// region Actions

/// Prints the top of the stack to stdout. Debugging aid; not part of the output text.
fn print(context: &mut Context, _: Word) -> Result<Flow> {
  print_top(context, &mut io::stdout().lock())
}

/// A closed or broken stream is logged and otherwise ignored. It does not fault the run.
fn print_top<W: IoWrite>(context: &Context, out: &mut W) -> Result<Flow> {
  let top = context.top()?;
  if let Err(e) = writeln!(out, "{}", top) {
    warn!(error = %e, "PRINT could not write to stdout");
  }
  Ok(Flow::Continue)
}

fn load_const(context: &mut Context, value: Word) -> Result<Flow> {
  context.push(value);
  Ok(Flow::Continue)
}

/// The result of the run is whatever is on top of the stack, so there must be something.
fn exit(context: &mut Context, _: Word) -> Result<Flow> {
  context.require(Builtin::Exit.operands())?;
  Ok(Flow::Halt)
}

fn pop(context: &mut Context, _: Word) -> Result<Flow> {
  context.pop()?;
  Ok(Flow::Continue)
}

fn add(context: &mut Context, _: Word) -> Result<Flow> {
  let (a, b) = context.pop_pair()?;
  context.push(a.wrapping_add(b));
  Ok(Flow::Continue)
}

/// The denominator is on top, the numerator below it.
fn div(context: &mut Context, _: Word) -> Result<Flow> {
  context.require(Builtin::Div.operands())?;
  if context.top()? == 0 {
    return Err(Fault::DivisionByZero);
  }

  let (numerator, denominator) = context.pop_pair()?;
  context.push(numerator.wrapping_div(denominator));
  Ok(Flow::Continue)
}

fn eq(context: &mut Context, _: Word) -> Result<Flow> {
  let (a, b) = context.pop_pair()?;
  context.push((a == b) as Word);
  Ok(Flow::Continue)
}

fn neq(context: &mut Context, _: Word) -> Result<Flow> {
  let (a, b) = context.pop_pair()?;
  context.push((a != b) as Word);
  Ok(Flow::Continue)
}

fn dup(context: &mut Context, _: Word) -> Result<Flow> {
  let top = context.top()?;
  context.push(top);
  Ok(Flow::Continue)
}

fn jmp(context: &mut Context, target: Word) -> Result<Flow> {
  context.jump(target)?;
  Ok(Flow::Continue)
}

/// The target is checked before the stack, and before we know whether the jump is taken.
fn jmpz(context: &mut Context, target: Word) -> Result<Flow> {
  let target = context.check_target(target)?;
  if context.pop()? == 0 {
    context.set_pc(target);
  }
  Ok(Flow::Continue)
}

fn write(context: &mut Context, _: Word) -> Result<Flow> {
  let top = context.top()?;
  context.write_word(top);
  Ok(Flow::Continue)
}

/// Only the low byte of the value is used, read as a Latin-1 character.
fn write_char(context: &mut Context, _: Word) -> Result<Flow> {
  let top = context.top()?;
  context.write_char(char::from(top as u8));
  Ok(Flow::Continue)
}

// endregion
