use std::{cell::RefCell, fmt, mem, rc::Rc};

use log::debug;
use slay_syntax::{
    ast::{BinOp, Expr, Item, Literal, LogicalOp, UnaryOp},
    error::{ErrorKind, SlayError},
};

use crate::{
    environment::Env,
    stdlib::{ConsoleVoice, Voice},
    types::{Callable, Dict, Func, Value},
};

/// How a statement finished. Loops absorb `Break` and `Continue`,
/// spell calls absorb `Return`; anything that escapes to the top
/// level is a runaway signal and becomes an error there.
#[derive(Clone, Debug, PartialEq)]
pub enum Flow {
    Normal,
    Return { value: Value, line: usize },
    Break { line: usize },
    Continue { line: usize },
}

pub struct Interpreter {
    env: Rc<RefCell<Env>>,
    voice: Box<dyn Voice>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(None)
    }
}

// The voice is a trait object, so Debug cannot be derived.
impl fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter").finish_non_exhaustive()
    }
}

impl Interpreter {
    pub fn new(env: Option<Rc<RefCell<Env>>>) -> Self {
        Self {
            env: env.unwrap_or_else(Env::new),
            voice: Box::new(ConsoleVoice),
        }
    }

    /// Swaps in a speech collaborator. Incantation announcements and
    /// `speak_spell` are routed through it.
    pub fn with_voice(env: Option<Rc<RefCell<Env>>>, voice: Box<dyn Voice>) -> Self {
        Self {
            env: env.unwrap_or_else(Env::new),
            voice,
        }
    }

    pub fn env(&self) -> Rc<RefCell<Env>> {
        self.env.clone()
    }

    pub fn interpret_all(&mut self, items: &[Item]) -> Result<(), SlayError> {
        for item in items {
            match self.exec(item)? {
                Flow::Normal => (),
                Flow::Return { line, .. } => {
                    return Err(SlayError::quest_failed("'cast' outside a spell", line));
                }
                Flow::Break { line } => {
                    return Err(SlayError::quest_failed("'break' outside a patrol or hunt", line));
                }
                Flow::Continue { line } => {
                    return Err(SlayError::quest_failed(
                        "'continue' outside a patrol or hunt",
                        line,
                    ));
                }
            }
        }
        Ok(())
    }

    fn exec(&mut self, item: &Item) -> Result<Flow, SlayError> {
        debug!("exec {item:?}");
        match item {
            Item::VarDecl {
                name,
                init,
                is_const,
                line,
            } => {
                let value = self.evaluate(init)?;
                self.env
                    .borrow_mut()
                    .define(name, value, *is_const)
                    .map_err(|e| e.at_line(*line))?;
                Ok(Flow::Normal)
            }
            Item::Reassign { name, value, line } => {
                let value = self.evaluate(value)?;
                self.env
                    .borrow_mut()
                    .assign(name, value)
                    .map_err(|e| e.at_line(*line))?;
                Ok(Flow::Normal)
            }
            Item::IndexAssign {
                collection,
                index,
                value,
                line,
            } => {
                let target = self.evaluate(collection)?;
                let index = self.evaluate(index)?;
                let value = self.evaluate(value)?;
                self.assign_index(target, index, value, *line)?;
                Ok(Flow::Normal)
            }
            Item::Delete { name, line } => {
                self.env
                    .borrow_mut()
                    .delete(name)
                    .map_err(|e| e.at_line(*line))?;
                Ok(Flow::Normal)
            }
            Item::SpellDecl {
                name,
                params,
                body,
                announces_result,
                line,
            } => {
                let func = Func {
                    name: name.clone(),
                    params: Rc::new(params.clone()),
                    body: Rc::new(body.clone()),
                    env: self.env.clone(),
                    announces_result: *announces_result,
                };
                self.env
                    .borrow_mut()
                    .define(name, Value::Func(func), false)
                    .map_err(|e| e.at_line(*line))?;
                Ok(Flow::Normal)
            }
            Item::Cast { value, line } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Void,
                };
                Ok(Flow::Return { value, line: *line })
            }
            Item::If {
                condition,
                then_branch,
                elif_branches,
                else_branch,
                ..
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.exec(then_branch);
                }
                for (condition, branch) in elif_branches {
                    if self.evaluate(condition)?.is_truthy() {
                        return self.exec(branch);
                    }
                }
                match else_branch {
                    Some(branch) => self.exec(branch),
                    None => Ok(Flow::Normal),
                }
            }
            Item::Until {
                condition, body, ..
            } => {
                while !self.evaluate(condition)?.is_truthy() {
                    match self.exec(body)? {
                        Flow::Normal | Flow::Continue { .. } => (),
                        Flow::Break { .. } => break,
                        flow @ Flow::Return { .. } => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }
            Item::Hunt {
                variable,
                iterable,
                body,
                line,
            } => self.exec_hunt(variable, iterable, body, *line),
            Item::Break { line } => Ok(Flow::Break { line: *line }),
            Item::Continue { line } => Ok(Flow::Continue { line: *line }),
            Item::Block(items) => self.exec_block(items, Env::with_parent(self.env.clone())),
            Item::ExprStmt(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }
        }
    }

    /// Runs `items` inside `env`, restoring the previous scope before
    /// returning, whether the block finished, signalled, or errored.
    fn exec_block(&mut self, items: &[Item], env: Rc<RefCell<Env>>) -> Result<Flow, SlayError> {
        let previous = mem::replace(&mut self.env, env);
        let mut flow = Ok(Flow::Normal);
        for item in items {
            flow = self.exec(item);
            if !matches!(flow, Ok(Flow::Normal)) {
                break;
            }
        }
        self.env = previous;
        flow
    }

    fn exec_hunt(
        &mut self,
        variable: &str,
        iterable: &Expr,
        body: &Item,
        line: usize,
    ) -> Result<Flow, SlayError> {
        // Snapshot the sequence up front: mutating the collection
        // inside the body must not affect the hunt.
        let elements: Vec<Value> = match self.evaluate(iterable)? {
            Value::List(list) => list.borrow().clone(),
            Value::Dict(dict) => dict
                .borrow()
                .keys()
                .map(|k| Value::Str(k.clone()))
                .collect(),
            other => {
                return Err(SlayError::forbidden_magic(
                    format!("can only hunt through a tome or grimoire, found {}", other.type_name()),
                    line,
                ));
            }
        };
        let Item::Block(items) = body else {
            return Err(SlayError::quest_failed("malformed hunt body", line));
        };
        for element in elements {
            let env = Env::with_parent(self.env.clone());
            env.borrow_mut()
                .define(variable, element, false)
                .map_err(|e| e.at_line(line))?;
            match self.exec_block(items, env)? {
                Flow::Normal | Flow::Continue { .. } => (),
                Flow::Break { .. } => break,
                flow @ Flow::Return { .. } => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value, SlayError> {
        match expr {
            Expr::Literal { value, .. } => Ok(match value {
                Literal::Str(s) => Value::Str(s.clone()),
                Literal::Int(n) => Value::Int(*n),
                Literal::Float(n) => Value::Float(*n),
                Literal::Boolean(b) => Value::Boolean(*b),
                Literal::Void => Value::Void,
            }),
            Expr::Ident { name, line } => self.env.borrow().get(name).map_err(|e| {
                // An unresolved read surfaces as an unknown incantation
                // at the use site; the raw binding error stays internal.
                if e.kind == ErrorKind::UnknownBinding {
                    SlayError::unknown_incantation(e.message, *line)
                } else {
                    e.at_line(*line)
                }
            }),
            Expr::Unary { op, expr, line } => {
                let value = self.evaluate(expr)?;
                match op {
                    UnaryOp::Not => Ok(Value::Boolean(!value.is_truthy())),
                    UnaryOp::Minus => match value {
                        Value::Int(n) => Ok(Value::Int(-n)),
                        Value::Float(n) => Ok(Value::Float(-n)),
                        other => Err(SlayError::forbidden_magic(
                            format!("cannot negate a {}", other.type_name()),
                            *line,
                        )),
                    },
                }
            }
            Expr::Binary { lhs, op, rhs, line } => {
                let lhs = self.evaluate(lhs)?;
                let rhs = self.evaluate(rhs)?;
                binary_op(lhs, *op, rhs, *line)
            }
            Expr::Logical { lhs, op, rhs, .. } => {
                let lhs = self.evaluate(lhs)?.is_truthy();
                // Short-circuit: the right side only runs when needed.
                match op {
                    LogicalOp::And if !lhs => Ok(Value::Boolean(false)),
                    LogicalOp::Or if lhs => Ok(Value::Boolean(true)),
                    _ => Ok(Value::Boolean(self.evaluate(rhs)?.is_truthy())),
                }
            }
            Expr::Call { callee, args, line } => self.eval_call(callee, args, *line),
            Expr::Tome { elements, .. } => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.evaluate(element)?);
                }
                Ok(Value::list(values))
            }
            Expr::Grimoire { pairs, .. } => {
                let mut dict = Dict::default();
                for (key, value) in pairs {
                    let Value::Str(key_str) = self.evaluate(key)? else {
                        return Err(SlayError::forbidden_magic(
                            "grimoire keys must be scrolls",
                            key.line(),
                        ));
                    };
                    let value = self.evaluate(value)?;
                    dict.insert(key_str, value);
                }
                Ok(Value::dict(dict))
            }
            Expr::Index {
                collection,
                index,
                line,
            } => {
                let collection = self.evaluate(collection)?;
                let index = self.evaluate(index)?;
                eval_index(collection, index, *line)
            }
            Expr::Member {
                object,
                member,
                line,
            } => {
                let object = self.evaluate(object)?;
                let Value::Dict(dict) = object else {
                    return Err(SlayError::forbidden_magic(
                        format!("cannot access a member of a {}", object.type_name()),
                        *line,
                    ));
                };
                let dict = dict.borrow();
                dict.get(member).cloned().ok_or_else(|| {
                    SlayError::forbidden_magic(
                        format!("no member '{member}' in grimoire"),
                        *line,
                    )
                })
            }
        }
    }

    fn eval_call(&mut self, callee: &Expr, args: &[Expr], line: usize) -> Result<Value, SlayError> {
        let callee = self.evaluate(callee)?;
        let func: Box<dyn Callable> = match callee {
            Value::Func(f) => Box::new(f),
            Value::NativeFunc(f) => Box::new(f),
            other => {
                return Err(SlayError::forbidden_magic(
                    format!(
                        "can only invoke spells and incantations, found {}",
                        other.type_name()
                    ),
                    line,
                ));
            }
        };
        // Arguments run left to right before the arity check, so their
        // side effects land even when the call itself is rejected.
        let mut arg_values = Vec::with_capacity(args.len());
        for arg in args {
            arg_values.push(self.evaluate(arg)?);
        }
        if let Some(expected) = func.arity() {
            if expected != arg_values.len() {
                return Err(SlayError::cursed_scroll(
                    format!("expected {expected} arguments, found {}", arg_values.len()),
                    line,
                ));
            }
        }
        func.call(self, arg_values).map_err(|e| e.at_line(line))
    }

    /// Invokes a user-defined spell: binds arguments in a fresh scope
    /// parented at the closure environment, runs the body, and maps a
    /// fallthrough to void. Incantations announce their result.
    pub(crate) fn call_func(&mut self, func: &Func, args: Vec<Value>) -> Result<Value, SlayError> {
        let call_env = Env::with_parent(func.env.clone());
        for (param, value) in func.params.iter().zip(args) {
            call_env.borrow_mut().define(param, value, false)?;
        }
        let result = match self.exec_block(&func.body, call_env)? {
            Flow::Return { value, .. } => value,
            Flow::Normal => Value::Void,
            Flow::Break { line } => {
                return Err(SlayError::quest_failed("'break' outside a patrol or hunt", line));
            }
            Flow::Continue { line } => {
                return Err(SlayError::quest_failed(
                    "'continue' outside a patrol or hunt",
                    line,
                ));
            }
        };
        if func.announces_result && result != Value::Void {
            self.voice.speak(&result.to_string())?;
        }
        Ok(result)
    }

    pub(crate) fn speak(&mut self, text: &str) -> Result<(), SlayError> {
        self.voice.speak(text)
    }

    fn assign_index(
        &mut self,
        target: Value,
        index: Value,
        value: Value,
        line: usize,
    ) -> Result<(), SlayError> {
        match target {
            Value::List(list) => {
                let mut list = list.borrow_mut();
                let i = list_index(&index, list.len(), line)?;
                list[i] = value;
                Ok(())
            }
            Value::Dict(dict) => {
                let Value::Str(key) = index else {
                    return Err(SlayError::forbidden_magic(
                        format!("grimoire keys must be scrolls, found {}", index.type_name()),
                        line,
                    ));
                };
                dict.borrow_mut().insert(key, value);
                Ok(())
            }
            other => Err(SlayError::forbidden_magic(
                format!("cannot assign into a {}", other.type_name()),
                line,
            )),
        }
    }
}

/// Validates an integer index against a collection length.
fn list_index(index: &Value, len: usize, line: usize) -> Result<usize, SlayError> {
    let Value::Int(i) = index else {
        return Err(SlayError::forbidden_magic(
            format!("index must be a rune, found {}", index.type_name()),
            line,
        ));
    };
    if *i < 0 || *i as usize >= len {
        return Err(SlayError::cursed_scroll(
            format!("index {i} out of range"),
            line,
        ));
    }
    Ok(*i as usize)
}

fn eval_index(collection: Value, index: Value, line: usize) -> Result<Value, SlayError> {
    match collection {
        Value::List(list) => {
            let list = list.borrow();
            let i = list_index(&index, list.len(), line)?;
            Ok(list[i].clone())
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let i = list_index(&index, chars.len(), line)?;
            Ok(Value::Str(chars[i].to_string()))
        }
        Value::Dict(dict) => {
            let Value::Str(key) = index else {
                return Err(SlayError::forbidden_magic(
                    format!("grimoire keys must be scrolls, found {}", index.type_name()),
                    line,
                ));
            };
            let dict = dict.borrow();
            dict.get(&key).cloned().ok_or_else(|| {
                SlayError::cursed_scroll(format!("key '{key}' not found in grimoire"), line)
            })
        }
        other => Err(SlayError::forbidden_magic(
            format!("cannot index into a {}", other.type_name()),
            line,
        )),
    }
}

/// Both operands as numbers, keeping rune arithmetic exact: a potion on
/// either side promotes the whole operation.
enum NumPair {
    Ints(i64, i64),
    Floats(f64, f64),
}

fn num_pair(lhs: &Value, rhs: &Value) -> Option<NumPair> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Some(NumPair::Ints(*a, *b)),
        (Value::Int(a), Value::Float(b)) => Some(NumPair::Floats(*a as f64, *b)),
        (Value::Float(a), Value::Int(b)) => Some(NumPair::Floats(*a, *b as f64)),
        (Value::Float(a), Value::Float(b)) => Some(NumPair::Floats(*a, *b)),
        _ => None,
    }
}

fn binary_op(lhs: Value, op: BinOp, rhs: Value, line: usize) -> Result<Value, SlayError> {
    match op {
        BinOp::Is => return Ok(Value::Boolean(lhs == rhs)),
        BinOp::Isnt => return Ok(Value::Boolean(lhs != rhs)),
        _ => (),
    }
    if let BinOp::Plus = op {
        match (&lhs, &rhs) {
            (Value::Str(a), Value::Str(b)) => return Ok(Value::Str(format!("{a}{b}"))),
            (Value::List(a), Value::List(b)) => {
                let mut joined = a.borrow().clone();
                joined.extend(b.borrow().iter().cloned());
                return Ok(Value::list(joined));
            }
            _ => (),
        }
    }
    if let BinOp::Star = op {
        // Scroll repetition; a negative count yields an empty scroll.
        match (&lhs, &rhs) {
            (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => {
                return Ok(Value::Str(s.repeat((*n).max(0) as usize)));
            }
            _ => (),
        }
    }
    let Some(pair) = num_pair(&lhs, &rhs) else {
        return Err(SlayError::forbidden_magic(
            format!(
                "cannot apply '{op}' to {} and {}",
                lhs.type_name(),
                rhs.type_name()
            ),
            line,
        ));
    };
    match op {
        BinOp::Plus => Ok(match pair {
            NumPair::Ints(a, b) => Value::Int(a.wrapping_add(b)),
            NumPair::Floats(a, b) => Value::Float(a + b),
        }),
        BinOp::Minus => Ok(match pair {
            NumPair::Ints(a, b) => Value::Int(a.wrapping_sub(b)),
            NumPair::Floats(a, b) => Value::Float(a - b),
        }),
        BinOp::Star => Ok(match pair {
            NumPair::Ints(a, b) => Value::Int(a.wrapping_mul(b)),
            NumPair::Floats(a, b) => Value::Float(a * b),
        }),
        BinOp::Slash => match pair {
            NumPair::Ints(_, 0) => Err(SlayError::cursed_scroll("division by zero", line)),
            NumPair::Ints(a, b) => Ok(Value::Int(a.wrapping_div(b))),
            NumPair::Floats(_, b) if b == 0.0 => {
                Err(SlayError::cursed_scroll("division by zero", line))
            }
            NumPair::Floats(a, b) => Ok(Value::Float(a / b)),
        },
        BinOp::Percent => match pair {
            NumPair::Ints(_, 0) => Err(SlayError::cursed_scroll("modulo by zero", line)),
            NumPair::Ints(a, b) => Ok(Value::Int(a.wrapping_rem(b))),
            NumPair::Floats(_, b) if b == 0.0 => {
                Err(SlayError::cursed_scroll("modulo by zero", line))
            }
            NumPair::Floats(a, b) => Ok(Value::Float(a % b)),
        },
        BinOp::Power => match pair {
            // A negative rune exponent leaves the runes, as rune
            // exponentiation would truncate everything to zero.
            NumPair::Ints(a, b) if b < 0 => Ok(Value::Float((a as f64).powi(b as i32))),
            NumPair::Ints(a, b) => u32::try_from(b)
                .ok()
                .and_then(|exp| a.checked_pow(exp))
                .map(Value::Int)
                .ok_or_else(|| SlayError::cursed_scroll("rune overflow in '**'", line)),
            NumPair::Floats(a, b) => Ok(Value::Float(a.powf(b))),
        },
        BinOp::Exceeds | BinOp::Under | BinOp::Atleast | BinOp::Atmost => {
            let (a, b) = match pair {
                NumPair::Ints(a, b) => (a as f64, b as f64),
                NumPair::Floats(a, b) => (a, b),
            };
            Ok(Value::Boolean(match op {
                BinOp::Exceeds => a > b,
                BinOp::Under => a < b,
                BinOp::Atleast => a >= b,
                BinOp::Atmost => a <= b,
                _ => unreachable!("numeric comparison"),
            }))
        }
        BinOp::Is | BinOp::Isnt => unreachable!("handled above"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use slay_syntax::{lex::Lexer, parse::Parser};

    /// A voice that records everything spoken, for asserting on
    /// incantation announcements.
    #[derive(Default)]
    struct RecordedVoice(Rc<RefCell<Vec<String>>>);

    impl Voice for RecordedVoice {
        fn speak(&mut self, text: &str) -> Result<(), SlayError> {
            self.0.borrow_mut().push(text.to_string());
            Ok(())
        }
    }

    fn run(source: &str) -> Result<Interpreter, SlayError> {
        let mut interpreter = Interpreter::default();
        let tokens = Lexer::new(source).lex_all()?;
        let root = Parser::new(&tokens).parse_all()?;
        interpreter.interpret_all(&root.items)?;
        Ok(interpreter)
    }

    fn value_of(interpreter: &Interpreter, name: &str) -> Value {
        interpreter.env().borrow().get(name).unwrap()
    }

    fn eval(source: &str) -> Value {
        let interpreter = run(&format!("conjure result as {source}")).unwrap();
        value_of(&interpreter, "result")
    }

    fn fails_with(source: &str) -> SlayError {
        let mut interpreter = Interpreter::default();
        let tokens = Lexer::new(source).lex_all().unwrap();
        let root = Parser::new(&tokens).parse_all().unwrap();
        interpreter.interpret_all(&root.items).unwrap_err()
    }

    #[test]
    fn arithmetic_stays_integral() {
        assert_eq!(eval("7 / 2"), Value::Int(3));
        assert_eq!(eval("7 % 2"), Value::Int(1));
        assert_eq!(eval("2 ** 10"), Value::Int(1024));
    }

    #[test]
    fn float_operand_promotes() {
        assert_eq!(eval("7 / 2.0"), Value::Float(3.5));
        assert_eq!(eval("1 + 0.5"), Value::Float(1.5));
        assert_eq!(eval("2 ** -1"), Value::Float(0.5));
    }

    #[test]
    fn string_concat_and_repeat() {
        assert_eq!(eval("'buf' + 'fy'"), Value::Str("buffy".to_string()));
        assert_eq!(eval("'ha' * 3"), Value::Str("hahaha".to_string()));
        assert_eq!(eval("'ha' * -1"), Value::Str(String::new()));
    }

    #[test]
    fn mixed_addition_is_forbidden() {
        let err = fails_with("conjure x as 'stake' + 1");
        assert_eq!(err.kind, ErrorKind::ForbiddenMagic);
        assert_eq!(err.line, Some(1));
    }

    #[test]
    fn list_concat() {
        assert_eq!(eval("[1, 2] + [3]"), Value::list(vec![
            Value::Int(1),
            Value::Int(2),
            Value::Int(3)
        ]));
    }

    #[test]
    fn division_by_zero() {
        let err = fails_with("conjure x as 1 / 0");
        assert_eq!(err.kind, ErrorKind::CursedScroll);
        let err = fails_with("conjure x as 1 % 0");
        assert_eq!(err.kind, ErrorKind::CursedScroll);
    }

    #[test]
    fn equality_is_typed() {
        assert_eq!(eval("1 is 1"), Value::Boolean(true));
        assert_eq!(eval("1 is 1.0"), Value::Boolean(false));
        assert_eq!(eval("'a' isnt 'b'"), Value::Boolean(true));
        assert_eq!(eval("void is void"), Value::Boolean(true));
    }

    #[test]
    fn comparisons_require_numbers() {
        assert_eq!(eval("3 exceeds 2"), Value::Boolean(true));
        assert_eq!(eval("2 atleast 2.0"), Value::Boolean(true));
        let err = fails_with("conjure x as 'a' under 'b'");
        assert_eq!(err.kind, ErrorKind::ForbiddenMagic);
    }

    #[test]
    fn logical_short_circuit() {
        // The right side would be an unknown name if evaluated.
        assert_eq!(eval("false and missing"), Value::Boolean(false));
        assert_eq!(eval("true or missing"), Value::Boolean(true));
        assert_eq!(eval("not 0"), Value::Boolean(true));
    }

    #[test]
    fn undeclared_identifier() {
        let err = fails_with("conjure x as nobody");
        assert_eq!(err.kind, ErrorKind::UnknownIncantation);
        assert_eq!(err.line, Some(1));
    }

    #[test]
    fn const_reassignment_fails() {
        let err = fails_with("const prophecy chosen as 1\ntransmute chosen as 2");
        assert_eq!(err.kind, ErrorKind::ProphecyViolation);
        assert_eq!(err.line, Some(2));
    }

    #[test]
    fn vanquish_removes_binding() {
        let err = fails_with("conjure x as 1\nvanquish x\nconjure y as x");
        assert_eq!(err.kind, ErrorKind::UnknownIncantation);
    }

    #[test]
    fn until_loop_counts() {
        let interpreter = run(
            "conjure count as 0\n\
             patrol until count atleast 3 {\n\
                 transmute count as count + 1\n\
             }",
        )
        .unwrap();
        assert_eq!(value_of(&interpreter, "count"), Value::Int(3));
    }

    #[test]
    fn break_and_continue() {
        let interpreter = run(
            "conjure total as 0\n\
             hunt each n in [1, 2, 3, 4, 5] {\n\
                 prophecy reveals n is 3 { continue }\n\
                 prophecy reveals n is 5 { break }\n\
                 transmute total as total + n\n\
             }",
        )
        .unwrap();
        assert_eq!(value_of(&interpreter, "total"), Value::Int(7));
    }

    #[test]
    fn hunt_preserves_insertion_order() {
        let interpreter = run(
            "conjure order as ''\n\
             conjure g as {'b': 1, 'a': 2, 'c': 3}\n\
             hunt each key in g {\n\
                 transmute order as order + key\n\
             }",
        )
        .unwrap();
        assert_eq!(value_of(&interpreter, "order"), Value::Str("bac".to_string()));
    }

    #[test]
    fn runaway_signals_fail_the_quest() {
        assert_eq!(fails_with("break").kind, ErrorKind::QuestFailed);
        assert_eq!(fails_with("continue").kind, ErrorKind::QuestFailed);
        assert_eq!(fails_with("cast 1").kind, ErrorKind::QuestFailed);
    }

    #[test]
    fn spell_call_and_fallthrough() {
        let interpreter = run(
            "spell stake(v) {\n\
                 cast v + 1\n\
             }\n\
             spell quiet() {\n\
                 conjure unused as 0\n\
             }\n\
             conjure a as stake(2)\n\
             conjure b as quiet()",
        )
        .unwrap();
        assert_eq!(value_of(&interpreter, "a"), Value::Int(3));
        assert_eq!(value_of(&interpreter, "b"), Value::Void);
    }

    #[test]
    fn arity_mismatch() {
        let err = fails_with("spell f(a, b) { cast a }\nconjure x as f(1)");
        assert_eq!(err.kind, ErrorKind::CursedScroll);
        assert_eq!(err.line, Some(2));
    }

    #[test]
    fn arguments_evaluate_before_the_arity_check() {
        let mut interpreter = Interpreter::default();
        let source = "conjure hits as 0\n\
                      spell bump() {\n\
                          transmute hits as hits + 1\n\
                      }\n\
                      spell pair(a, b) {\n\
                          cast a\n\
                      }\n\
                      pair(bump())";
        let tokens = Lexer::new(source).lex_all().unwrap();
        let root = Parser::new(&tokens).parse_all().unwrap();
        let err = interpreter.interpret_all(&root.items).unwrap_err();
        assert_eq!(err.kind, ErrorKind::CursedScroll);
        // The lone argument still ran.
        assert_eq!(value_of(&interpreter, "hits"), Value::Int(1));
    }

    #[test]
    fn calling_a_non_spell() {
        let err = fails_with("conjure n as 3\nconjure x as n(1)");
        assert_eq!(err.kind, ErrorKind::ForbiddenMagic);
    }

    #[test]
    fn closures_capture_their_scope() {
        let interpreter = run(
            "spell counter() {\n\
                 conjure n as 0\n\
                 spell tick() {\n\
                     transmute n as n + 1\n\
                     cast n\n\
                 }\n\
                 cast tick\n\
             }\n\
             conjure tick as counter()\n\
             tick()\n\
             conjure second as tick()",
        )
        .unwrap();
        assert_eq!(value_of(&interpreter, "second"), Value::Int(2));
    }

    #[test]
    fn incantation_announces_result() {
        let spoken = Rc::new(RefCell::new(Vec::new()));
        let mut interpreter = Interpreter::with_voice(
            None,
            Box::new(RecordedVoice(spoken.clone())),
        );
        let source = "incantation greet(name) {\n\
                          cast 'hail ' + name\n\
                      }\n\
                      greet('willow')";
        let tokens = Lexer::new(source).lex_all().unwrap();
        let root = Parser::new(&tokens).parse_all().unwrap();
        interpreter.interpret_all(&root.items).unwrap();
        assert_eq!(*spoken.borrow(), vec!["hail willow".to_string()]);
    }

    #[test]
    fn indexing() {
        assert_eq!(eval("[10, 20, 30][1]"), Value::Int(20));
        assert_eq!(eval("'buffy'[0]"), Value::Str("b".to_string()));
        assert_eq!(eval("{'k': 7}['k']"), Value::Int(7));
        assert_eq!(eval("{'k': 7}.k"), Value::Int(7));
    }

    #[test]
    fn index_errors() {
        assert_eq!(
            fails_with("conjure x as [1][5]").kind,
            ErrorKind::CursedScroll
        );
        assert_eq!(
            fails_with("conjure x as [1]['a']").kind,
            ErrorKind::ForbiddenMagic
        );
        assert_eq!(
            fails_with("conjure x as {'a': 1}['b']").kind,
            ErrorKind::CursedScroll
        );
        assert_eq!(
            fails_with("conjure x as 3[0]").kind,
            ErrorKind::ForbiddenMagic
        );
    }

    #[test]
    fn index_assignment() {
        let interpreter = run(
            "conjure xs as [1, 2, 3]\n\
             transmute xs[1] as 9\n\
             conjure g as {'a': 1}\n\
             transmute g['b'] as 2\n\
             conjure got as g['b']",
        )
        .unwrap();
        assert_eq!(
            value_of(&interpreter, "xs"),
            Value::list(vec![Value::Int(1), Value::Int(9), Value::Int(3)])
        );
        assert_eq!(value_of(&interpreter, "got"), Value::Int(2));
    }

    #[test]
    fn shadowing_in_blocks() {
        let interpreter = run(
            "conjure x as 1\n\
             prophecy reveals true {\n\
                 conjure x as 2\n\
             }\n\
             conjure seen as x",
        )
        .unwrap();
        assert_eq!(value_of(&interpreter, "seen"), Value::Int(1));
    }

    #[test]
    fn hunt_variable_is_per_iteration() {
        let err = fails_with(
            "hunt each n in [1] {\n}\nconjure x as n",
        );
        assert_eq!(err.kind, ErrorKind::UnknownIncantation);
    }
}
