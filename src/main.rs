//! cfront: preprocess and parse a C source file.
//!
//! Usage: `cfront <FILE> [-I DIR]... [--isystem DIR]... [-D NAME[=VALUE]]...
//! [--config FILE] [--set KEY=VALUE]... [--dump-tokens] [--dump-ast] [-v]`

use cfront::config::{FrontendConfig, Loader};
use cfront::error::FrontendError;
use cfront::parser::dump::dump;
use cfront::pass::{run_pass, run_plan, FrontendContext, PassStatus, PreprocessPass};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "cfront")]
#[command(about = "Preprocess and parse a C source file")]
struct Args {
    /// Source file to process
    file: PathBuf,

    /// Add a user include directory
    #[arg(short = 'I', value_name = "DIR")]
    include: Vec<PathBuf>,

    /// Add a system include directory
    #[arg(long = "isystem", value_name = "DIR")]
    isystem: Vec<PathBuf>,

    /// Predefine a macro
    #[arg(short = 'D', value_name = "NAME[=VALUE]")]
    define: Vec<String>,

    /// Configuration file layered over the built-in defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override one configuration key
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Print the preprocessed token stream instead of parsing
    #[arg(long)]
    dump_tokens: bool,

    /// Print the AST
    #[arg(long)]
    dump_ast: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "warn,cfront=debug" } else { "warn,cfront=info" })
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> Result<FrontendConfig, FrontendError> {
    let mut loader = Loader::new();
    if let Some(path) = &args.config {
        loader = loader.with_file(path);
    }
    for item in &args.overrides {
        let (key, value) = item.split_once('=').unwrap_or((item.as_str(), "true"));
        loader = loader.set_override(key, value)?;
    }

    let mut config = loader.build()?;
    config.include.user_dirs.extend(args.include.iter().cloned());
    config.include.system_dirs.extend(args.isystem.iter().cloned());
    config.preprocessor.defines.extend(args.define.iter().cloned());
    Ok(config)
}

fn run(args: &Args) -> Result<bool, FrontendError> {
    let config = load_config(args)?;
    debug!(?config, "configuration");

    let mut ctx = FrontendContext::for_file(&args.file);

    if args.dump_tokens {
        let status = run_pass(&PreprocessPass, &mut ctx, &config)?;
        if status == PassStatus::Ok {
            if let Some(pp) = ctx.preprocessor.as_mut() {
                for token in pp.tokens() {
                    let text = pp.interner().resolve(token.text);
                    println!(
                        "{}:{}\t{}\t{}",
                        token.location.line, token.location.column, token.kind, text
                    );
                }
            }
        }
    } else {
        run_plan(&mut ctx, &config)?;
        if args.dump_ast {
            if let (Some(ast), Some(unit)) = (&ctx.ast, &ctx.unit) {
                print!("{}", dump(ast, &unit.interner));
            }
        }
    }

    let Some(diagnostics) = ctx.diagnostics() else {
        return Ok(true);
    };
    for diagnostic in diagnostics.iter() {
        eprintln!("{diagnostic}");
    }
    if diagnostics.has_errors() {
        eprintln!("{}", FrontendError::Failed(diagnostics.error_count()));
        return Ok(false);
    }
    Ok(true)
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("{err}");
            eprintln!("cfront: {err}");
            ExitCode::FAILURE
        }
    }
}
