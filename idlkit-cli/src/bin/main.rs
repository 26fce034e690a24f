use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use idlkit_cli::commands::{self, Target};
use idlkit_cli::error::{CliError, CliResult};
use idlkit_cli::parse::parse_json;
use idlkit_cli::pda::{compute_pda_from_idl, compute_pda_from_specs, IdlPdaRequest};
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "idlkit", version, about = "Encode, decode and derive addresses from an Anchor-style IDL")]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace). Overrides IDLKIT_LOG.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct IdlFile {
    /// IDL JSON file.
    #[arg(short, long, env = "IDLKIT_IDL")]
    idl: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the 8-byte discriminator of `namespace:name`.
    Discriminator {
        /// `account`, `global` (or `instruction`), `event`, or any custom prefix.
        namespace: String,
        name: String,
    },
    /// Summarize the instructions, accounts, events and types of an IDL.
    Idl {
        #[command(flatten)]
        file: IdlFile,

        /// Print the normalized IDL as JSON instead of a summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Encode a JSON value to Borsh, discriminator included.
    Encode {
        #[command(flatten)]
        file: IdlFile,
        #[arg(value_enum)]
        target: Target,
        name: String,
        /// JSON value, e.g. '{"amount": 5}'.
        value: String,

        /// Print base64 instead of hex.
        #[arg(long, default_value_t = false)]
        base64: bool,
    },
    /// Decode hex or base64 data to JSON. Without NAME the discriminator
    /// selects the entry.
    Decode {
        #[command(flatten)]
        file: IdlFile,
        #[arg(value_enum)]
        target: Target,
        /// `[NAME] DATA`
        #[arg(num_args = 1..=2, required = true)]
        inputs: Vec<String>,
    },
    /// Decode an event from a `Program data:` log line.
    Log {
        #[command(flatten)]
        file: IdlFile,
        line: String,
    },
    /// Allocation size of an account, discriminator included.
    Size {
        #[command(flatten)]
        file: IdlFile,
        account: String,
    },
    /// RPC memcmp filter matching accounts of one type.
    Memcmp {
        #[command(flatten)]
        file: IdlFile,
        account: String,

        /// Hex bytes appended after the discriminator.
        #[arg(long)]
        append: Option<String>,
    },
    /// Derive a program address from seeds or from an instruction's IDL.
    Pda {
        /// Program address (base58 or hex). Defaults to the IDL's address.
        #[arg(long)]
        program: Option<String>,

        /// Seed as KIND:VALUE (string, hex, pubkey, u8..u128, bool). Repeatable.
        #[arg(long = "seed")]
        seeds: Vec<String>,

        /// IDL JSON file, for deriving an instruction account.
        #[arg(short, long, env = "IDLKIT_IDL")]
        idl: Option<PathBuf>,

        /// Instruction declaring the PDA.
        #[arg(long, requires = "account")]
        instruction: Option<String>,

        /// Account of the instruction to derive.
        #[arg(long, requires = "instruction")]
        account: Option<String>,

        /// Instruction arguments as a JSON object.
        #[arg(long)]
        args: Option<String>,

        /// NAME=KEY for an account referenced by a seed. Repeatable.
        #[arg(long = "key")]
        keys: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_env("IDLKIT_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(command: Commands) -> CliResult<()> {
    match command {
        Commands::Discriminator { namespace, name } => {
            let disc = commands::discriminator(&namespace, &name)?;
            println!("{}", commands::format_discriminator(&disc));
        }
        Commands::Idl { file, json } => {
            let (idl, coder) = commands::load_coder(&file.idl)?;
            if json {
                println!("{}", idl.to_json_pretty()?);
            } else {
                print!("{}", idlkit_cli::cli::idl_summary(&idl, &coder));
            }
        }
        Commands::Encode {
            file,
            target,
            name,
            value,
            base64,
        } => {
            let (_, coder) = commands::load_coder(&file.idl)?;
            let bytes = commands::encode(&coder, target, &name, &parse_json(&value)?)?;
            println!("{}", commands::format_bytes(&bytes, base64));
        }
        Commands::Decode { file, target, inputs } => {
            let (_, coder) = commands::load_coder(&file.idl)?;
            let (name, data) = commands::split_decode_inputs(&inputs)?;
            let (name, value) = commands::decode(&coder, target, name, &data)?;
            println!("{}", serde_json::to_string_pretty(&commands::decoded_json(&name, &value))?);
        }
        Commands::Log { file, line } => {
            let (_, coder) = commands::load_coder(&file.idl)?;
            match commands::decode_log(&coder, &line)? {
                Some((name, value)) => {
                    println!("{}", serde_json::to_string_pretty(&commands::decoded_json(&name, &value))?)
                }
                None => return Err(CliError::usage("line carries no event of this program")),
            }
        }
        Commands::Size { file, account } => {
            let (_, coder) = commands::load_coder(&file.idl)?;
            println!("{}", commands::size(&coder, &account)?);
        }
        Commands::Memcmp { file, account, append } => {
            let (_, coder) = commands::load_coder(&file.idl)?;
            let filter = commands::memcmp(&coder, &account, append.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&filter)?);
        }
        Commands::Pda {
            program,
            seeds,
            idl,
            instruction,
            account,
            args,
            keys,
        } => {
            let output = match (instruction, account) {
                (Some(instruction), Some(account)) => {
                    let path = idl.ok_or_else(|| CliError::usage("--instruction needs --idl"))?;
                    let (idl, coder) = commands::load_coder(&path)?;
                    let args = args.as_deref().map(parse_json).transpose()?;
                    let req = IdlPdaRequest {
                        instruction: &instruction,
                        account: &account,
                        args: args.as_ref(),
                        keys: &keys,
                        program: program.as_deref(),
                    };
                    compute_pda_from_idl(&idl, &coder, &req)?
                }
                _ => {
                    let program = program.ok_or_else(|| CliError::usage("--program is required with --seed"))?;
                    compute_pda_from_specs(&program, &seeds)?
                }
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}
