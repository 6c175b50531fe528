use slay_compile::{interpret::Interpreter, run};
use std::{
    env, fs,
    io::{self, Write},
    process,
};

fn main() {
    pretty_env_logger::init();
    let args: Vec<String> = env::args().skip(1).collect();
    match args.len() {
        0 => run_repl(),
        1 => run_file(&args[0]),
        _ => {
            eprintln!("Usage: slay [script.slay]");
            process::exit(64);
        }
    }
}

fn run_repl() {
    let (stdin, mut stdout) = (io::stdin(), io::stdout());
    // One interpreter for the whole session, so bindings persist
    // across lines.
    let mut interpreter = Interpreter::default();
    loop {
        let mut line = String::default();
        print!(">>> ");
        stdout.flush().expect("Failed to flush stdout");
        let n = stdin.read_line(&mut line).expect("Failed to read line");
        // If zero bytes are read, then exit (usually triggered by Ctrl-D)
        if n == 0 {
            break;
        }
        if let Err(e) = run(&line, &mut interpreter) {
            eprintln!("{e}");
        }
    }
}

fn run_file(file_path: &str) {
    let source = match fs::read_to_string(file_path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Failed to read {file_path}: {e}");
            process::exit(66);
        }
    };
    let mut interpreter = Interpreter::default();
    if let Err(e) = run(&source, &mut interpreter) {
        eprintln!("{e}");
        process::exit(70);
    }
}
