use bimap::BiMap;
use string_cache::DefaultAtom;
use tracing::debug;

use crate::bytecode::{Flow, Opcode, Word};
use crate::context::Context;
use crate::fault::{Fault, Result};

/// Interned instruction name. Mnemonics are case-sensitive.
pub type Mnemonic = DefaultAtom;

/**
  The executable behavior bound to an opcode. An action receives the execution context
  and the instruction's argument, and may mutate the stack, the program counter, and the
  output. It must not hold on to the context after it returns.
*/
pub type Action = Box<dyn Fn(&mut Context, Word) -> Result<Flow>>;

/**
  The instruction registry maps mnemonics to opcodes and opcodes back to both mnemonics
  (for disassembly) and actions (for dispatch). The mnemonic table is a `BiMap`, so the
  mapping is injective in both directions by construction. Since opcodes are dense and
  sequential, actions live in a vector indexed by opcode.

  Registries only grow. There is no way to remove or replace an instruction.
*/
pub struct Registry {
  table   : BiMap<Mnemonic, Opcode>,
  actions : Vec<Action>,
}

impl Registry {

  /// A registry with no instructions in it. Most callers want `Registry::standard()`.
  pub fn new() -> Registry {
    Registry {
      table   : BiMap::new(),
      actions : vec![],
    }
  }

  /// A registry holding the standard instruction set.
  pub fn standard() -> Registry {
    let mut registry = Registry::new();
    crate::standard::install(&mut registry);
    registry
  }

  /**
    Registers `action` under `mnemonic` and returns the opcode assigned to it, which is
    the next unused opcode.

    A mnemonic that is empty or contains whitespace could never be written in assembly and
    is rejected with `Fault::InvalidMnemonic`. Registering a mnemonic that already exists
    is rejected with `Fault::DuplicateMnemonic`, and the registry is left unchanged.
  */
  pub fn register<F>(&mut self, mnemonic: &str, action: F) -> Result<Opcode>
    where F: Fn(&mut Context, Word) -> Result<Flow> + 'static
  {
    if mnemonic.is_empty() || mnemonic.contains(char::is_whitespace) {
      return Err(Fault::InvalidMnemonic(mnemonic.to_string()));
    }

    let mnemonic = Mnemonic::from(mnemonic);
    if self.table.contains_left(&mnemonic) {
      return Err(Fault::DuplicateMnemonic(mnemonic));
    }

    Ok(self.install(mnemonic, Box::new(action)))
  }

  /// Stores the three mappings without checking the mnemonic. Callers guarantee uniqueness.
  pub(crate) fn install(&mut self, mnemonic: Mnemonic, action: Action) -> Opcode {
    let opcode = self.actions.len() as Opcode;
    debug!(%mnemonic, opcode, "instruction registered");

    self.table.insert(mnemonic, opcode);
    self.actions.push(action);
    opcode
  }

  pub fn opcode(&self, mnemonic: &str) -> Option<Opcode> {
    self.table.get_by_left(&Mnemonic::from(mnemonic)).copied()
  }

  pub fn mnemonic(&self, opcode: Opcode) -> Option<&Mnemonic> {
    self.table.get_by_right(&opcode)
  }

  pub fn action(&self, opcode: Opcode) -> Option<&Action> {
    self.actions.get(opcode as usize)
  }

  pub fn len(&self) -> usize {
    self.actions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.actions.is_empty()
  }

  /// Iterates over `(opcode, mnemonic)` pairs in opcode order.
  pub fn iter(&self) -> impl Iterator<Item = (Opcode, &Mnemonic)> + '_ {
    (0..self.len() as Opcode).filter_map(move |opcode| {
      self.mnemonic(opcode).map(|mnemonic| (opcode, mnemonic))
    })
  }
}

impl Default for Registry {
  fn default() -> Registry {
    Registry::new()
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  fn noop(_: &mut Context, _: Word) -> Result<Flow> {
    Ok(Flow::Continue)
  }

  #[test]
  fn opcodes_are_assigned_sequentially_from_zero() {
    let mut registry = Registry::new();
    assert_eq!(registry.register("A", noop).unwrap(), 0);
    assert_eq!(registry.register("B", noop).unwrap(), 1);
    assert_eq!(registry.register("C", noop).unwrap(), 2);

    assert_eq!(registry.opcode("B"), Some(1));
    assert_eq!(registry.mnemonic(2).map(|m| &**m), Some("C"));
    assert!(registry.action(2).is_some());
    assert!(registry.action(3).is_none());
  }

  #[test]
  fn mnemonics_are_case_sensitive() {
    let mut registry = Registry::new();
    registry.register("NOP", noop).unwrap();
    assert_eq!(registry.opcode("nop"), None);
    assert_eq!(registry.register("nop", noop).unwrap(), 1);
  }

  /// Duplicate registration is a hard error, never last-registration-wins.
  #[test]
  fn duplicate_mnemonic_is_rejected() {
    let mut registry = Registry::new();
    registry.register("NOP", noop).unwrap();

    let result = registry.register("NOP", |_, _| Ok(Flow::Halt));
    assert_eq!(result, Err(Fault::DuplicateMnemonic(Mnemonic::from("NOP"))));
    assert_eq!(registry.len(), 1);

    // The first action is still bound.
    let mut context = Context::new();
    let flow = (registry.action(0).unwrap())(&mut context, 0).unwrap();
    assert_eq!(flow, Flow::Continue);
  }

  #[test]
  fn standard_mnemonics_cannot_be_reregistered() {
    let mut registry = Registry::standard();
    let before = registry.len();
    assert!(matches!(
      registry.register("ADD", noop),
      Err(Fault::DuplicateMnemonic(_))
    ));
    assert_eq!(registry.len(), before);
  }

  #[test]
  fn unwritable_mnemonics_are_rejected() {
    let mut registry = Registry::new();
    assert_eq!(registry.register("", noop), Err(Fault::InvalidMnemonic(String::new())));
    assert!(matches!(registry.register("LOAD CONST", noop), Err(Fault::InvalidMnemonic(_))));
    assert!(registry.is_empty());
  }

  #[test]
  fn iter_visits_opcodes_in_order() {
    let registry = Registry::standard();
    let pairs: Vec<(Opcode, String)> =
      registry.iter().map(|(op, m)| (op, m.to_string())).take(3).collect();
    assert_eq!(
      pairs,
      vec![(0, "PRINT".to_string()), (1, "LOAD_CONST".to_string()), (2, "EXIT".to_string())]
    );
  }
}
