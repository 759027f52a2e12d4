use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stackvm::Machine;

#[derive(Parser, Debug)]
#[command(name = "stackvm")]
#[command(about = "Assemble and run a stack machine program")]
struct Cli {
  /// Program to run, one instruction per line. Use `-` to read stdin.
  program: PathBuf,

  /// Print a disassembly and trace every executed instruction to stderr.
  #[arg(long)]
  debug: bool,

  /// Fail instead of running more than this many instructions.
  #[arg(long, value_name = "N")]
  max_steps: Option<usize>,

  /// Print the disassembly and exit without running.
  #[arg(long)]
  disassemble: bool,
}

fn read_program(path: &Path) -> io::Result<String> {
  match path.to_str() == Some("-") {

    true  => {
      let mut text = String::new();
      io::stdin().read_to_string(&mut text)?;
      Ok(text)
    }

    false => fs::read_to_string(path)
  }
}

/// Returns false when the code holds an unregistered opcode, so no complete listing exists.
fn print_listing(listing: Option<String>) -> bool {
  match listing {
    Some(listing) => {
      println!("{listing}");
      true
    }
    None => {
      eprintln!("error: code references an unregistered opcode");
      false
    }
  }
}

fn main() -> ExitCode {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "stackvm=warn".into()),
    )
    .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
    .init();

  let cli = Cli::parse();

  let text = match read_program(&cli.program) {
    Ok(text) => text,
    Err(e)   => {
      eprintln!("error: could not read {}: {e}", cli.program.display());
      return ExitCode::FAILURE;
    }
  };

  let mut machine = Machine::new(cli.debug);
  let code = match machine.assemble(&text) {
    Ok(code) => code,
    Err(fault) => {
      eprintln!("error: {fault}");
      return ExitCode::FAILURE;
    }
  };

  if cli.disassemble {
    return match print_listing(machine.disassemble(&code)) {
      true  => ExitCode::SUCCESS,
      false => ExitCode::FAILURE,
    };
  }

  let result = match cli.max_steps {
    Some(limit) => machine.run_bounded(&code, limit),
    None        => machine.run(&code),
  };

  match result {

    Ok(outcome) => {
      print!("{}", outcome.output);
      if !outcome.output.is_empty() && !outcome.output.ends_with('\n') {
        println!();
      }
      println!("exit value: {}", outcome.value);
      ExitCode::SUCCESS
    }

    Err(fault) => {
      eprintln!("error: {fault}");
      if cli.debug {
        eprintln!("{machine}");
      }
      ExitCode::FAILURE
    }

  }
}
