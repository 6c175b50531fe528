use slay_syntax::error::{ErrorKind, SlayError};

use crate::{
    environment::Env,
    interpret::Interpreter,
    types::{NativeFunc, Value},
};

/// The speech boundary. Incantation announcements and `speak_spell`
/// go through whichever voice the interpreter was built with;
/// collaborator implementations report failures as `VoiceSilenced`.
pub trait Voice {
    fn speak(&mut self, text: &str) -> Result<(), SlayError>;
}

/// Fallback voice that announces on stdout.
pub struct ConsoleVoice;

impl Voice for ConsoleVoice {
    fn speak(&mut self, text: &str) -> Result<(), SlayError> {
        println!("[Speaking]: {text}");
        Ok(())
    }
}

/// Registers a built-in against an environment. Collaborator modules
/// use this to expose their own spells alongside the core set.
pub fn register(env: &mut Env, func: NativeFunc) {
    env.install(func.name, Value::NativeFunc(func));
}

pub fn init(env: &mut Env) {
    let builtins = [
        NativeFunc {
            name: "scribe",
            arity: None,
            body: scribe,
        },
        NativeFunc {
            name: "scribe_line",
            arity: None,
            body: scribe_line,
        },
        NativeFunc {
            name: "measure",
            arity: Some(1),
            body: measure,
        },
        NativeFunc {
            name: "transform_to_rune",
            arity: Some(1),
            body: transform_to_rune,
        },
        NativeFunc {
            name: "transform_to_scroll",
            arity: Some(1),
            body: transform_to_scroll,
        },
        NativeFunc {
            name: "transform_to_potion",
            arity: Some(1),
            body: transform_to_potion,
        },
        NativeFunc {
            name: "range",
            arity: None,
            body: range,
        },
        NativeFunc {
            name: "append",
            arity: Some(2),
            body: append,
        },
        NativeFunc {
            name: "remove",
            arity: Some(2),
            body: remove,
        },
        NativeFunc {
            name: "keys",
            arity: Some(1),
            body: keys,
        },
        NativeFunc {
            name: "values",
            arity: Some(1),
            body: values,
        },
        NativeFunc {
            name: "type_of",
            arity: Some(1),
            body: type_of,
        },
        NativeFunc {
            name: "speak_spell",
            arity: Some(1),
            body: speak_spell,
        },
    ];
    for func in builtins {
        register(env, func);
    }
}

fn join_args(args: &[Value]) -> String {
    args.iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn scribe(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, SlayError> {
    print!("{}", join_args(&args));
    Ok(Value::Void)
}

fn scribe_line(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, SlayError> {
    println!("{}", join_args(&args));
    Ok(Value::Void)
}

fn measure(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, SlayError> {
    let len = match &args[0] {
        Value::Str(s) => s.chars().count(),
        Value::List(l) => l.borrow().len(),
        Value::Dict(d) => d.borrow().len(),
        other => {
            return Err(forbidden(format!(
                "cannot measure a {}",
                other.type_name()
            )));
        }
    };
    Ok(Value::Int(len as i64))
}

fn transform_to_rune(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, SlayError> {
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Float(n) => Ok(Value::Int(*n as i64)),
        Value::Boolean(b) => Ok(Value::Int(i64::from(*b))),
        Value::Str(s) => s.trim().parse().map(Value::Int).map_err(|_| {
            forbidden(format!("cannot transform '{s}' into a rune"))
        }),
        other => Err(forbidden(format!(
            "cannot transform a {} into a rune",
            other.type_name()
        ))),
    }
}

fn transform_to_scroll(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, SlayError> {
    Ok(Value::Str(args[0].to_string()))
}

fn transform_to_potion(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, SlayError> {
    match &args[0] {
        Value::Int(n) => Ok(Value::Float(*n as f64)),
        Value::Float(n) => Ok(Value::Float(*n)),
        Value::Boolean(b) => Ok(Value::Float(f64::from(u8::from(*b)))),
        Value::Str(s) => s.trim().parse().map(Value::Float).map_err(|_| {
            forbidden(format!("cannot transform '{s}' into a potion"))
        }),
        other => Err(forbidden(format!(
            "cannot transform a {} into a potion",
            other.type_name()
        ))),
    }
}

/// range(stop) / range(start, stop) / range(start, stop, step).
fn range(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, SlayError> {
    let mut bounds = Vec::with_capacity(args.len());
    for arg in &args {
        match arg {
            Value::Int(n) => bounds.push(*n),
            other => {
                return Err(forbidden(format!(
                    "range bounds must be runes, found {}",
                    other.type_name()
                )));
            }
        }
    }
    let (start, stop, step) = match bounds[..] {
        [stop] => (0, stop, 1),
        [start, stop] => (start, stop, 1),
        [start, stop, step] => (start, stop, step),
        // A wrong count is an arity mismatch, not a type error.
        _ => {
            return Err(cursed(format!(
                "range takes 1 to 3 arguments, found {}",
                args.len()
            )));
        }
    };
    if step == 0 {
        return Err(cursed("range step cannot be zero".to_string()));
    }
    let mut items = Vec::new();
    let mut current = start;
    while (step > 0 && current < stop) || (step < 0 && current > stop) {
        items.push(Value::Int(current));
        current += step;
    }
    Ok(Value::list(items))
}

fn append(_: &mut Interpreter, mut args: Vec<Value>) -> Result<Value, SlayError> {
    let item = args.pop().unwrap_or(Value::Void);
    match &args[0] {
        Value::List(list) => {
            list.borrow_mut().push(item);
            Ok(Value::Void)
        }
        other => Err(forbidden(format!(
            "can only append to a tome, found {}",
            other.type_name()
        ))),
    }
}

fn remove(_: &mut Interpreter, mut args: Vec<Value>) -> Result<Value, SlayError> {
    let item = args.pop().unwrap_or(Value::Void);
    match &args[0] {
        Value::List(list) => {
            let mut list = list.borrow_mut();
            match list.iter().position(|v| *v == item) {
                Some(i) => {
                    list.remove(i);
                    Ok(Value::Void)
                }
                None => Err(cursed(format!("'{item}' not found in tome"))),
            }
        }
        other => Err(forbidden(format!(
            "can only remove from a tome, found {}",
            other.type_name()
        ))),
    }
}

fn keys(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, SlayError> {
    match &args[0] {
        Value::Dict(dict) => Ok(Value::list(
            dict.borrow()
                .keys()
                .map(|k| Value::Str(k.clone()))
                .collect(),
        )),
        other => Err(forbidden(format!(
            "keys requires a grimoire, found {}",
            other.type_name()
        ))),
    }
}

fn values(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, SlayError> {
    match &args[0] {
        Value::Dict(dict) => Ok(Value::list(dict.borrow().values().cloned().collect())),
        other => Err(forbidden(format!(
            "values requires a grimoire, found {}",
            other.type_name()
        ))),
    }
}

fn type_of(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, SlayError> {
    Ok(Value::Str(args[0].type_name().to_string()))
}

fn speak_spell(interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, SlayError> {
    interpreter.speak(&args[0].to_string())?;
    Ok(Value::Void)
}

// Built-ins have no source position; the evaluator pins the call-site
// line onto whatever they raise.
fn forbidden(message: String) -> SlayError {
    SlayError::new(ErrorKind::ForbiddenMagic, message, None)
}

fn cursed(message: String) -> SlayError {
    SlayError::new(ErrorKind::CursedScroll, message, None)
}
