use std::{cell::RefCell, collections::HashMap, rc::Rc};

use log::debug;
use slay_syntax::error::SlayError;

use crate::{stdlib, types::Value};

#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    pub value: Value,
    pub is_const: bool,
}

/// A lexical scope. Scopes form a parent chain; lookups and
/// reassignments walk outward, declarations and deletions act on the
/// immediate scope only.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Env {
    values: HashMap<String, Binding>,
    parent: Option<Rc<RefCell<Env>>>,
}

impl Env {
    /// Creates the root environment with the built-in spells installed.
    pub fn new() -> Rc<RefCell<Self>> {
        let mut env = Self::default();
        stdlib::init(&mut env);
        Rc::new(RefCell::new(env))
    }

    pub fn with_parent(parent: Rc<RefCell<Env>>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            values: HashMap::default(),
            parent: Some(parent),
        }))
    }

    /// Declares `name` in this scope. Re-declaring an existing binding
    /// overwrites it, unless that binding is a prophecy.
    pub fn define(&mut self, name: &str, value: Value, is_const: bool) -> Result<(), SlayError> {
        debug!("define {name} = {value}");
        if self.values.get(name).is_some_and(|b| b.is_const) {
            return Err(SlayError::prophecy_violation(format!(
                "cannot redeclare the prophecy '{name}'"
            )));
        }
        self.values.insert(name.to_string(), Binding { value, is_const });
        Ok(())
    }

    /// Installs a binding unconditionally. Used for built-in
    /// registration against a fresh root scope.
    pub(crate) fn install(&mut self, name: &str, value: Value) {
        self.values.insert(
            name.to_string(),
            Binding {
                value,
                is_const: false,
            },
        );
    }

    pub fn get(&self, name: &str) -> Result<Value, SlayError> {
        if let Some(binding) = self.values.get(name) {
            return Ok(binding.value.clone());
        }
        match &self.parent {
            Some(parent) => parent.borrow().get(name),
            None => Err(SlayError::unknown_binding(format!(
                "undefined name '{name}'"
            ))),
        }
    }

    pub fn assign(&mut self, name: &str, value: Value) -> Result<(), SlayError> {
        debug!("assign {name} = {value}");
        if let Some(binding) = self.values.get_mut(name) {
            if binding.is_const {
                return Err(SlayError::prophecy_violation(format!(
                    "cannot transmute the prophecy '{name}'"
                )));
            }
            binding.value = value;
            return Ok(());
        }
        match &self.parent {
            Some(parent) => parent.borrow_mut().assign(name, value),
            None => Err(SlayError::unknown_binding(format!(
                "undefined name '{name}'"
            ))),
        }
    }

    /// Removes `name` from this scope. Bindings in outer scopes are
    /// not reachable, so shadowed names stay intact.
    pub fn delete(&mut self, name: &str) -> Result<(), SlayError> {
        debug!("delete {name}");
        match self.values.get(name) {
            Some(binding) if binding.is_const => Err(SlayError::prophecy_violation(format!(
                "cannot vanquish the prophecy '{name}'"
            ))),
            Some(_) => {
                self.values.remove(name);
                Ok(())
            }
            None => Err(SlayError::unknown_binding(format!(
                "undefined name '{name}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use slay_syntax::error::ErrorKind;

    #[test]
    fn define_and_get() {
        let mut env = Env::default();
        env.define("slayer", Value::Str("buffy".to_string()), false)
            .unwrap();
        assert_eq!(env.get("slayer").unwrap(), Value::Str("buffy".to_string()));
    }

    #[test]
    fn get_walks_parent_chain() {
        let root = Rc::new(RefCell::new(Env::default()));
        root.borrow_mut().define("x", Value::Int(1), false).unwrap();
        let inner = Env::with_parent(Env::with_parent(root));
        assert_eq!(inner.borrow().get("x").unwrap(), Value::Int(1));
    }

    #[test]
    fn assign_updates_outer_binding() {
        let root = Rc::new(RefCell::new(Env::default()));
        root.borrow_mut().define("x", Value::Int(1), false).unwrap();
        let inner = Env::with_parent(root.clone());
        inner.borrow_mut().assign("x", Value::Int(2)).unwrap();
        assert_eq!(root.borrow().get("x").unwrap(), Value::Int(2));
    }

    #[test]
    fn redeclare_overwrites() {
        let mut env = Env::default();
        env.define("x", Value::Int(1), false).unwrap();
        env.define("x", Value::Str("two".to_string()), false).unwrap();
        assert_eq!(env.get("x").unwrap(), Value::Str("two".to_string()));
    }

    #[test]
    fn const_cannot_be_redeclared() {
        let mut env = Env::default();
        env.define("chosen", Value::Int(1), true).unwrap();
        let err = env.define("chosen", Value::Int(2), false).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ProphecyViolation);
    }

    #[test]
    fn const_cannot_be_assigned() {
        let mut env = Env::default();
        env.define("chosen", Value::Int(1), true).unwrap();
        let err = env.assign("chosen", Value::Int(2)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ProphecyViolation);
    }

    #[test]
    fn const_cannot_be_deleted() {
        let mut env = Env::default();
        env.define("chosen", Value::Int(1), true).unwrap();
        let err = env.delete("chosen").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ProphecyViolation);
    }

    #[test]
    fn delete_is_scoped_to_immediate_env() {
        let root = Rc::new(RefCell::new(Env::default()));
        root.borrow_mut().define("x", Value::Int(1), false).unwrap();
        let inner = Env::with_parent(root.clone());
        let err = inner.borrow_mut().delete("x").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownBinding);
        // The outer binding is untouched.
        assert_eq!(root.borrow().get("x").unwrap(), Value::Int(1));
    }

    #[test]
    fn missing_name_is_unknown_binding() {
        let env = Env::default();
        let err = env.get("nobody").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownBinding);
    }
}
