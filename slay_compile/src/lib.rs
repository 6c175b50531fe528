pub mod environment;
pub mod interpret;
pub mod stdlib;
pub mod types;

use interpret::Interpreter;
use log::trace;
use slay_syntax::{error::SlayError, lex::Lexer, parse::Parser};

/// Runs a chunk of source to completion against the given interpreter,
/// stopping at the first error from any stage.
pub fn run(source: &str, interpreter: &mut Interpreter) -> Result<(), SlayError> {
    trace!("Lexing {source}");
    let tokens = Lexer::new(source).lex_all()?;
    trace!("Parsing {tokens:#?}");
    let root = Parser::new(&tokens).parse_all()?;
    trace!("Interpreting {root:#?}");
    interpreter.interpret_all(&root.items)
}
