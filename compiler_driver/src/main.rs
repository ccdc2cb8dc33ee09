use clap::Parser;
use shared_context::suppress::{Check, SuppressMask};
use shared_context::units::MAX_INCLUDE_DIRS;
use std::path::PathBuf;
use std::process::ExitCode;

mod files;
mod locator;
mod stages;

/// Ada 83 front end: compiles one source file to textual SSA IR.
#[derive(Parser)]
#[command(name = "adac")]
struct Cli {
    /// Stop after lexing and print the token stream
    #[arg(long, group = "stage")]
    lex: bool,

    /// Stop after parsing
    #[arg(long, group = "stage")]
    parse: bool,

    /// Stop after semantic analysis
    #[arg(long, group = "stage")]
    analyze: bool,

    /// Run the full pipeline and write the IR file (the default)
    #[arg(long, group = "stage")]
    emit_ir: bool,

    /// Include directory for library units named in with clauses;
    /// may repeat, up to 32 directories
    #[arg(short = 'I', value_name = "DIR")]
    include: Vec<PathBuf>,

    /// Name of the main procedure (defaults to the compiled unit)
    #[arg(long, value_name = "NAME")]
    main: Option<String>,

    /// Suppress a check for the whole compilation, as if by pragma
    /// SUPPRESS; accepts the check names or 'all'
    #[arg(long, value_name = "CHECK")]
    suppress: Vec<String>,

    /// Output path for the IR file
    #[arg(short = 'o', value_name = "FILE")]
    output: Option<PathBuf>,

    file_path: PathBuf,
}

fn main() -> ExitCode {
    let args = Cli::parse();

    if args.include.len() > MAX_INCLUDE_DIRS {
        eprintln!("error: at most {MAX_INCLUDE_DIRS} include directories are accepted");
        return ExitCode::FAILURE;
    }

    let mut suppress = SuppressMask::none();
    for name in &args.suppress {
        let folded = name.to_ascii_lowercase();
        if folded == "all" {
            suppress = SuppressMask::all();
        } else if let Some(check) = Check::from_name(&folded) {
            suppress.suppress(check);
        } else {
            eprintln!("error: unknown check name '{name}'");
            return ExitCode::FAILURE;
        }
    }

    let result = if args.lex {
        stages::lexer_stage(&args.file_path)
    } else if args.parse {
        stages::parser_stage(&args.file_path, &args.include)
    } else if args.analyze {
        stages::analyze_stage(&args.file_path, &args.include, suppress)
    } else {
        stages::emit_ir(
            &args.file_path,
            &args.include,
            suppress,
            args.main.as_deref(),
            args.output.as_deref(),
        )
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
