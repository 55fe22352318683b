mod logging;

use std::io;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use tracing::info;

use tarn_vm::{CancelToken, Value, Vm, compile, disassemble};

#[derive(Debug, Clone, PartialEq)]
struct CliConfig {
    source: Option<String>,
    invoke: Option<String>,
    invoke_args: Vec<String>,
    timeout_ms: Option<u64>,
    print_prefix: Option<String>,
    seed: Option<u64>,
    dump_bytecode: bool,
    help: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            source: None,
            invoke: None,
            invoke_args: Vec::new(),
            timeout_ms: None,
            print_prefix: None,
            seed: None,
            dump_bytecode: false,
            help: false,
        }
    }
}

fn main() -> ExitCode {
    if let Err(err) = logging::init() {
        eprintln!("failed to initialize logging: {err}");
        return ExitCode::FAILURE;
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match parse_cli_args(&args) {
        Ok(cli) => cli,
        Err(message) => {
            eprintln!("{message}");
            print_usage();
            return ExitCode::FAILURE;
        }
    };
    if cli.help {
        print_usage();
        return ExitCode::SUCCESS;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &CliConfig) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = cli.source.as_deref() else {
        return Err("missing script path".into());
    };
    let source = std::fs::read_to_string(path)?;

    let started = Instant::now();
    let bytecode = match compile(&source) {
        Ok(bytecode) => bytecode,
        Err(errors) => {
            for err in &errors {
                eprintln!("{err}");
            }
            return Err(io::Error::other(format!("{} error(s) in {path}", errors.len())).into());
        }
    };
    info!(
        "{} compiled {path} ({} bytes of bytecode) in {:?}",
        logging::category_script(),
        bytecode.instructions.len(),
        started.elapsed()
    );

    if cli.dump_bytecode {
        print!("{}", disassemble(&bytecode.instructions));
    }

    let mut vm = Vm::new(bytecode);
    if let Some(prefix) = &cli.print_prefix {
        vm.set_print_prefix(prefix.clone());
    }
    if let Some(seed) = cli.seed {
        vm.seed_rng(seed);
    }

    let token = match cli.timeout_ms {
        Some(ms) => CancelToken::with_timeout(Duration::from_millis(ms)),
        None => CancelToken::new(),
    };

    let started = Instant::now();
    vm.run(&token)?;
    info!(
        "{} initial run finished in {:?}",
        logging::category_vm(),
        started.elapsed()
    );

    if let Some(name) = &cli.invoke {
        let function = vm.get_global(name)?;
        let args: Vec<Value> = cli.invoke_args.iter().map(|arg| parse_value(arg)).collect();
        let result = vm.invoke(&token, &function, &args)?;
        println!("{}", result.inspect());
        return Ok(());
    }

    let last = vm.last_popped();
    if !matches!(last, Value::Null) {
        println!("{}", last.inspect());
    }
    Ok(())
}

fn parse_cli_args(args: &[String]) -> Result<CliConfig, String> {
    let mut cfg = CliConfig::default();
    let mut index = 0usize;

    while index < args.len() {
        match args[index].as_str() {
            "-h" | "--help" => {
                cfg.help = true;
                index += 1;
            }
            "--invoke" => {
                let name = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --invoke".to_string())?;
                cfg.invoke = Some(name.clone());
                index += 2;
            }
            "--timeout-ms" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --timeout-ms".to_string())?;
                cfg.timeout_ms = Some(
                    value
                        .parse()
                        .map_err(|_| format!("invalid --timeout-ms value '{value}'"))?,
                );
                index += 2;
            }
            "--print-prefix" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --print-prefix".to_string())?;
                cfg.print_prefix = Some(value.clone());
                index += 2;
            }
            "--seed" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --seed".to_string())?;
                cfg.seed = Some(
                    value
                        .parse()
                        .map_err(|_| format!("invalid --seed value '{value}'"))?,
                );
                index += 2;
            }
            "--dump-bytecode" => {
                cfg.dump_bytecode = true;
                index += 1;
            }
            flag if flag.starts_with("--") => {
                return Err(format!("unknown flag '{flag}'"));
            }
            positional => {
                if cfg.source.is_none() {
                    cfg.source = Some(positional.to_string());
                } else {
                    cfg.invoke_args.push(positional.to_string());
                }
                index += 1;
            }
        }
    }

    Ok(cfg)
}

// Invoke arguments arrive as plain strings; interpret the obvious literals
// and fall back to a string value.
fn parse_value(text: &str) -> Value {
    match text {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" => return Value::Null,
        _ => {}
    }
    if let Ok(int) = text.parse::<i64>() {
        return Value::Int(int);
    }
    if let Ok(float) = text.parse::<f64>() {
        return Value::Float(float);
    }
    Value::string(text)
}

fn print_usage() {
    println!("usage: tarn <script.tarn> [invoke-args...] [options]");
    println!();
    println!("options:");
    println!("  --invoke <name>       invoke a script function after the initial run;");
    println!("                        extra positional arguments become its arguments");
    println!("  --timeout-ms <n>      cancel execution after n milliseconds");
    println!("  --print-prefix <s>    prefix every print() line with s");
    println!("  --seed <n>            seed the builtin RNG for deterministic runs");
    println!("  --dump-bytecode       print disassembled bytecode before running");
    println!("  -h, --help            show this help");
}
