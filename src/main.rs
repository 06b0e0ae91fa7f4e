/// AVM - assembler and runner CLI
use avm::asm::Assembler;
use avm::backend::{Stack, Vm, VmConfig};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "avm", version)]
#[command(about = "Assemble and run AVM bytecode")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Integer pool capacity (overrides the configuration; 0 disables it)
    #[arg(long, global = true)]
    pool: Option<usize>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assemble source text into a bytecode file
    Asm {
        /// Assembler source ('-' for stdin)
        input: String,
        /// Bytecode output file
        output: PathBuf,
    },
    /// Run a program and print the resulting stack
    Run {
        /// Assembler source, or bytecode with --binary ('-' for stdin)
        input: String,
        /// Treat the input as assembled bytecode
        #[arg(long)]
        binary: bool,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(io::stderr)
        .init();
}

fn read_input(input: &str) -> Result<Vec<u8>, String> {
    if input == "-" {
        let mut buffer = Vec::new();
        io::stdin()
            .read_to_end(&mut buffer)
            .map_err(|e| format!("Failed to read from stdin: {}", e))?;
        Ok(buffer)
    } else {
        let path = Path::new(input);
        if !path.exists() {
            return Err(format!("Input file not found: {}", input));
        }
        fs::read(path).map_err(|e| format!("Failed to read file '{}': {}", input, e))
    }
}

fn load_config(cli: &Cli) -> Result<VmConfig, String> {
    let mut config = match &cli.config {
        Some(path) => VmConfig::load(path).map_err(|e| format!("{}: {}", path.display(), e))?,
        None => VmConfig::default().with_pool_size(avm::backend::config::DEFAULT_POOL_SIZE),
    };
    if let Some(size) = cli.pool {
        config.integer_pool_size = size;
    }
    if cli.verbose >= 2 {
        config = config.with_trace();
    }
    Ok(config)
}

fn assemble(assembler: &Assembler, input: &str) -> Result<Vec<u8>, String> {
    let bytes = read_input(input)?;
    let source =
        String::from_utf8(bytes).map_err(|e| format!("'{}' is not valid UTF-8: {}", input, e))?;
    assembler
        .assemble(&source)
        .map_err(|e| format!("{}:{}", input, e))
}

fn print_stack(stack: &Stack) {
    for (index, object) in stack.iter().enumerate() {
        println!("{:>4}: {}", index, object);
    }
}

fn run(cli: &Cli) -> Result<i32, String> {
    let config = load_config(cli)?;
    debug!(?config, "configuration loaded");
    let mut vm = Vm::with_config(config).map_err(|e| format!("Failed to create VM: {}", e))?;
    let assembler = Assembler::for_vm(&vm);

    match &cli.command {
        Command::Asm { input, output } => {
            let code = assemble(&assembler, input)?;
            fs::write(output, &code)
                .map_err(|e| format!("Failed to write '{}': {}", output.display(), e))?;
            info!(bytes = code.len(), output = %output.display(), "wrote bytecode");
            Ok(0)
        }
        Command::Run { input, binary } => {
            let code = if *binary {
                read_input(input)?
            } else {
                assemble(&assembler, input)?
            };

            let mut stack = vm.new_stack();
            let result = vm.run(&code, &mut stack);

            print_stack(&stack);
            println!("instructions: {}", vm.instruction_count());

            match result {
                Ok(()) => Ok(0),
                Err(err) => {
                    eprintln!(
                        "Error: {} at byte {}",
                        err,
                        vm.error_position().unwrap_or_default()
                    );
                    Ok(2)
                }
            }
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(code) => process::exit(code),
        Err(message) => {
            eprintln!("Error: {}", message);
            process::exit(1);
        }
    }
}
