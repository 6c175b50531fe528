use std::{
    cell::RefCell,
    fmt::{Debug, Display},
    rc::Rc,
};

use slay_syntax::{ast::Item, error::SlayError};

use crate::{environment::Env, interpret::Interpreter};

#[derive(Clone, Debug)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Boolean(bool),
    List(Rc<RefCell<Vec<Value>>>),
    Dict(Rc<RefCell<Dict>>),
    Func(Func),
    NativeFunc(NativeFunc),
    Void,
}

impl Value {
    pub fn list(values: Vec<Value>) -> Self {
        Self::List(Rc::new(RefCell::new(values)))
    }

    pub fn dict(dict: Dict) -> Self {
        Self::Dict(Rc::new(RefCell::new(dict)))
    }

    /// The language-level type name, used by `type_of` and error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "scroll",
            Self::Int(_) => "rune",
            Self::Float(_) => "potion",
            Self::Boolean(_) => "charm",
            Self::List(_) => "tome",
            Self::Dict(_) => "grimoire",
            Self::Func(_) | Self::NativeFunc(_) => "spell",
            Self::Void => "void",
        }
    }

    /// Truthiness: booleans are themselves, numbers are true iff nonzero,
    /// strings and collections are true iff nonempty, void is false, and
    /// callables are always true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Void => false,
            Self::Boolean(b) => *b,
            Self::Int(n) => *n != 0,
            Self::Float(n) => *n != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::List(l) => !l.borrow().is_empty(),
            Self::Dict(d) => !d.borrow().is_empty(),
            Self::Func(_) | Self::NativeFunc(_) => true,
        }
    }
}

// Collections can contain themselves through their shared `Rc`s, so
// equality short-circuits on pointer identity and display tracks the
// containers already being printed, rendering a cycle as `[...]`.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::List(a), Self::List(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Self::Dict(a), Self::Dict(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Self::Func(a), Self::Func(b)) => a == b,
            (Self::NativeFunc(a), Self::NativeFunc(b)) => a == b,
            (Self::Void, Self::Void) => true,
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.fmt_with(f, &mut Vec::new())
    }
}

impl Value {
    fn fmt_with(
        &self,
        f: &mut std::fmt::Formatter<'_>,
        seen: &mut Vec<*const ()>,
    ) -> std::fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => f.write_str(&display_float(*n)),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::List(l) => {
                let ptr = Rc::as_ptr(l) as *const ();
                if seen.contains(&ptr) {
                    return f.write_str("[...]");
                }
                seen.push(ptr);
                f.write_str("[")?;
                for (i, v) in l.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    v.fmt_with(f, seen)?;
                }
                seen.pop();
                f.write_str("]")
            }
            Self::Dict(d) => {
                let ptr = Rc::as_ptr(d) as *const ();
                if seen.contains(&ptr) {
                    return f.write_str("{...}");
                }
                seen.push(ptr);
                f.write_str("{")?;
                for (i, (k, v)) in d.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: ")?;
                    v.fmt_with(f, seen)?;
                }
                seen.pop();
                f.write_str("}")
            }
            Self::Func(func) => Display::fmt(func, f),
            Self::NativeFunc(func) => Display::fmt(func, f),
            Self::Void => f.write_str("void"),
        }
    }
}

/// Integral potions keep a trailing `.0` so they remain visibly
/// distinct from runes.
fn display_float(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 {
        format!("{n:.1}")
    } else {
        n.to_string()
    }
}

/// An insertion-ordered string-keyed map. Iteration over keys, values,
/// and pairs follows the order keys were first inserted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dict {
    entries: Vec<(String, Value)>,
}

impl Dict {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Inserts or overwrites; an overwrite keeps the key's original
    /// position.
    pub fn insert(&mut self, key: String, value: Value) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Value)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub trait Callable {
    /// `None` means the callable is variadic and checks its own
    /// argument count.
    fn arity(&self) -> Option<usize>;
    fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, SlayError>;
}

/// A user-defined spell: parameter names plus the shared body AST,
/// closed over the environment active at its declaration site.
#[derive(Clone)]
pub struct Func {
    pub name: String,
    pub params: Rc<Vec<String>>,
    pub body: Rc<Vec<Item>>,
    pub env: Rc<RefCell<Env>>,
    pub announces_result: bool,
}

impl PartialEq for Func {
    fn eq(&self, other: &Self) -> bool {
        // The captured environment is deliberately left out: it may
        // transitively contain this function.
        self.name == other.name
            && self.params == other.params
            && self.announces_result == other.announces_result
    }
}

impl Debug for Func {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Func")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("announces_result", &self.announces_result)
            .finish()
    }
}

impl Display for Func {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.announces_result {
            "incantation"
        } else {
            "spell"
        };
        write!(f, "{kind} {}({})", self.name, self.params.join(", "))
    }
}

impl Callable for Func {
    fn arity(&self) -> Option<usize> {
        Some(self.params.len())
    }
    fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, SlayError> {
        interpreter.call_func(self, args)
    }
}

/// A built-in reached through the dispatch table. Collaborator modules
/// register these against the root environment; the evaluator only ever
/// sees the `Callable` contract.
#[derive(Clone)]
pub struct NativeFunc {
    pub name: &'static str,
    pub arity: Option<usize>,
    pub body: fn(&mut Interpreter, Vec<Value>) -> Result<Value, SlayError>,
}

impl PartialEq for NativeFunc {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.arity == other.arity
    }
}

impl Debug for NativeFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeFunc")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

impl Display for NativeFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "native spell {}", self.name)
    }
}

impl Callable for NativeFunc {
    fn arity(&self) -> Option<usize> {
        self.arity
    }
    fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, SlayError> {
        (self.body)(interpreter, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::{assert_eq, assert_ne};

    fn cyclic_list() -> Value {
        let list = Value::list(vec![Value::Int(1)]);
        if let Value::List(l) = &list {
            l.borrow_mut().push(list.clone());
        }
        list
    }

    #[test]
    fn display_marks_cycles() {
        assert_eq!(cyclic_list().to_string(), "[1, [...]]");
    }

    #[test]
    fn cyclic_dict_display() {
        let dict = Value::dict(Dict::default());
        if let Value::Dict(d) = &dict {
            d.borrow_mut().insert("me".to_string(), dict.clone());
        }
        assert_eq!(dict.to_string(), "{me: {...}}");
    }

    #[test]
    fn cyclic_values_compare_by_pointer() {
        let list = cyclic_list();
        assert_eq!(list, list.clone());
    }

    #[test]
    fn shared_lists_compare_by_contents() {
        let a = Value::list(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::list(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(a, b);
        assert_ne!(a, Value::list(vec![Value::Int(1)]));
    }

    #[test]
    fn equality_is_typed() {
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_eq!(Value::Void, Value::Void);
    }

    #[test]
    fn integral_potions_keep_their_decimal() {
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
    }
}
