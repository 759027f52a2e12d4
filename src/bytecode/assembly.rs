/*!
  The human readable textual form of bytecode is called assembly. A program is a sequence
  of newline separated lines, each of which is either

  ```text
  MNEMONIC
  MNEMONIC ARGUMENT
  ```

  with exactly one space between the two words. `ARGUMENT` is a signed decimal integer
  literal and defaults to zero when absent. Trailing whitespace (including the `\r` of a
  CRLF line ending) is ignored, and lines that are empty after that are skipped. There is
  no comment syntax, and leading whitespace is not ignored: a line is split on every single
  space, so a leading space yields an empty first word. The word count is checked before
  the mnemonic is looked up.

  Assembly either succeeds on the whole program or fails on the first bad line; partial
  code is never returned.
*/

use nom::{
  character::complete::i64 as signed_integer,
  combinator::all_consuming,
  error::Error as NomError,
  Finish,
};
use tracing::debug;

use crate::bytecode::{Code, Instruction, Word};
use crate::fault::{Fault, Result};
use crate::registry::Registry;
use crate::split::split;

/// Parses a whole word as a signed integer literal, e.g. `42`, `-7`, or `+3`.
pub fn parse_argument(text: &str) -> Option<Word> {
  all_consuming(signed_integer::<&str, NomError<&str>>)(text)
    .finish()
    .ok()
    .map(|(_rest, value)| value)
}

/// Converts `source` into code, resolving mnemonics through `registry`.
pub fn assemble(registry: &Registry, source: &str) -> Result<Code> {
  let mut code = Code::new();

  for (index, raw_line) in split(source, '\n').into_iter().enumerate() {
    let line = raw_line.trim_end();
    if line.is_empty() {
      continue;
    }
    code.push(assemble_line(registry, line, index + 1)?);
  }

  debug!(instructions = code.len(), "assembled program");
  Ok(code)
}

fn assemble_line(registry: &Registry, line: &str, line_number: usize) -> Result<Instruction> {
  let malformed = |reason: String| {
    Fault::MalformedInstruction {
      line : line_number,
      text : line.to_string(),
      reason,
    }
  };

  let words = split(line, ' ');

  // An instruction takes at most one argument.
  if words.len() >= 3 {
    return Err(malformed(format!("expected at most one argument but found {}", words.len() - 1)));
  }

  let mnemonic = words[0];
  let opcode   =
    registry.opcode(mnemonic)
            .ok_or_else(|| Fault::UnknownInstruction {
              mnemonic : mnemonic.to_string(),
              line     : line_number,
            })?;

  let argument =
    match words.get(1) {
      Some(word) => {
        parse_argument(word)
          .ok_or_else(|| malformed(format!("`{}` is not a 64 bit integer", word)))?
      }
      None => 0
    };

  Ok(Instruction::new(opcode, argument))
}
