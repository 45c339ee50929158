use clap::Parser as ClapParser;
use colored::*;
use std::{
    fs::File,
    io::{self, Write},
    process,
};

extern crate frontend;
extern crate runtime;

use frontend::reader::Reader;
use runtime::interpreter::Interpreter;

// --------
//   CLI
// --------

#[derive(ClapParser)]
#[command(version)]
#[command(about = "Interpreter for the Sprig language")]
struct Cli {
    /// Path to the script to run
    file: String,

    /// Dump the live objects to object.dsv on exit
    #[arg(short, long)]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();

    let reader = match Reader::from_file(&cli.file) {
        Ok(reader) => reader,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut input = stdin.lock();
    let mut out = stdout.lock();

    let mut interpreter = Interpreter::new(reader, &mut out, &mut input, cli.debug);

    let status = match interpreter.run() {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{e}");
            1
        }
    };

    // Release every binding, then list whatever survived
    interpreter.shutdown();

    if cli.debug {
        match File::create("object.dsv") {
            Ok(mut file) => {
                if let Err(e) = interpreter.dump_objects(&mut file) {
                    eprintln!("cannot write object.dsv: {e}");
                }
            }
            Err(e) => eprintln!("cannot create object.dsv: {e}"),
        }

        let leaked = interpreter.live_objects();
        if leaked > 0 {
            eprintln!("{}: {} objects still alive", "leak".yellow().bold(), leaked);
        }
    }

    drop(interpreter);
    let _ = out.flush();
    process::exit(status);
}
