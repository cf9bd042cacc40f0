//! Simple CLI / REPL for evaluating math expressions.

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use codespan_reporting::term::termcolor::ColorChoice;
use is_terminal::IsTerminal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::{
    fs,
    io::{self, Read},
    path::PathBuf,
    process,
    str::FromStr,
};

use mathexpr::{Context, Scalar, Snapshot, Symbols, TokenSet, Value};

mod common;
mod repl;

use crate::{
    common::{Env, ParseAndEvalResult, ERROR_EXIT_CODE},
    repl::repl,
};

const ABOUT: &str = "CLI and REPL for parsing and evaluating math expressions.";

const AFTER_HELP: &str = "\
EXIT CODES:
    0    Normal exit
    1    Invalid command-line option or I/O error
    2    Parsing or evaluation error in non-interactive mode

LOGGING:
    Diagnostic logs are written to stderr; use the `RUST_LOG` env var to configure them,
    e.g. `RUST_LOG=mathexpr=debug`.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ColorArg {
    Auto,
    Always,
    Never,
}

impl ColorArg {
    fn to_choice(self) -> ColorChoice {
        match self {
            Self::Auto if io::stdout().is_terminal() && io::stderr().is_terminal() => {
                ColorChoice::Auto
            }
            Self::Auto | Self::Never => ColorChoice::Never,
            Self::Always => ColorChoice::Always,
        }
    }
}

/// Variable definition in the form `name=expression`.
#[derive(Debug, Clone)]
struct Definition {
    name: String,
    expression: String,
}

impl FromStr for Definition {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, expression) = s
            .split_once('=')
            .context("definition must have `name=expression` form")?;
        let name = name.trim();
        anyhow::ensure!(
            mathexpr::tokens::is_valid_symbol_name(name),
            "`{name}` is not a valid variable name"
        );
        Ok(Self {
            name: name.to_owned(),
            expression: expression.trim().to_owned(),
        })
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about = ABOUT, after_help = AFTER_HELP)]
enum Args {
    /// Parse the input and output the expression tree.
    Ast {
        /// Coloring of the output.
        #[arg(long, env = "COLOR", value_enum, default_value_t = ColorArg::Auto)]
        color: ColorArg,
        /// Expressions to parse, one per line. If omitted, expressions will be read from stdin.
        command: Option<String>,
    },
    /// Evaluate the input.
    Eval(EvalArgs),
}

#[derive(Debug, clap::Args)]
struct EvalArgs {
    /// Launch the REPL for math expressions.
    #[arg(long, short = 'i')]
    interactive: bool,
    /// JSON file to load variables from before evaluation and to save them to afterwards.
    #[arg(long, value_name = "FILE")]
    session: Option<PathBuf>,
    /// Local definition in the form `name=expression`, e.g. `-D x=2.5`. The expression
    /// is evaluated once on startup. Definitions shadow context variables and are never
    /// overwritten by assignments.
    #[arg(long = "define", short = 'D', value_name = "NAME=EXPR")]
    definitions: Vec<Definition>,
    /// Do not load the standard constants and functions.
    #[arg(long)]
    no_prelude: bool,
    /// Coloring of the output.
    #[arg(long, env = "COLOR", value_enum, default_value_t = ColorArg::Auto)]
    color: ColorArg,
    /// Expressions to evaluate, one per line. If omitted, expressions will be read from stdin.
    #[arg(conflicts_with = "interactive")]
    command: Option<String>,
}

fn read_command(command: Option<String>) -> io::Result<String> {
    if let Some(command) = command {
        Ok(command)
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    }
}

impl Args {
    fn run(self) -> anyhow::Result<ParseAndEvalResult> {
        match self {
            Self::Ast { color, command } => {
                let command = read_command(command)?;
                let mut env = Env::new(Context::new(), Symbols::new(), color.to_choice());
                let tokens = TokenSet::builtin();
                for line in command.lines().filter(|line| !line.trim().is_empty()) {
                    if !env.output_ast(line, &tokens)?.is_ok() {
                        return Ok(ParseAndEvalResult::Errored);
                    }
                }
                Ok(ParseAndEvalResult::Ok)
            }
            Self::Eval(eval_args) => eval_args.run(),
        }
    }
}

impl EvalArgs {
    fn create_context(&self) -> anyhow::Result<Context<'static>> {
        let context = if self.no_prelude {
            Context::new()
        } else {
            Context::with_prelude()
        };

        if let Some(path) = &self.session {
            if path.exists() {
                let session = fs::read_to_string(path)
                    .with_context(|| format!("cannot read session file {}", path.display()))?;
                let snapshot: Snapshot = serde_json::from_str(&session)
                    .with_context(|| format!("invalid session file {}", path.display()))?;
                tracing::debug!(
                    path = %path.display(),
                    variables = snapshot.variables.len(),
                    "restored session"
                );
                context.restore(snapshot);
            }
        }
        Ok(context)
    }

    fn create_symbols(&self, context: &Context<'_>) -> anyhow::Result<Symbols> {
        let mut symbols = Symbols::new();
        for definition in &self.definitions {
            let value: Value = mathexpr::evaluate(context, &definition.expression, &symbols)
                .with_context(|| {
                    format!("cannot evaluate definition of `{}`", definition.name)
                })?;
            symbols.insert(definition.name.clone(), value);
        }
        Ok(symbols)
    }

    /// Saves context variables to the session file. Non-finite values are skipped since
    /// JSON cannot represent them.
    fn save_session(&self, context: &Context<'_>) -> anyhow::Result<()> {
        let Some(path) = &self.session else {
            return Ok(());
        };
        let mut snapshot = context.snapshot();
        snapshot.constants.clear();
        snapshot.variables.retain(|name, value| {
            let is_finite = is_finite(value);
            if !is_finite {
                tracing::warn!(name = %name, "skipped saving non-finite variable");
            }
            is_finite
        });

        let session = serde_json::to_string_pretty(&snapshot)?;
        fs::write(path, session)
            .with_context(|| format!("cannot write session file {}", path.display()))?;
        tracing::debug!(path = %path.display(), "saved session");
        Ok(())
    }

    fn run(self) -> anyhow::Result<ParseAndEvalResult> {
        let context = self.create_context()?;
        let symbols = self.create_symbols(&context)?;
        let mut env = Env::new(context, symbols, self.color.to_choice());

        let result = if self.interactive {
            repl(&mut env)?;
            ParseAndEvalResult::Ok
        } else {
            let command = read_command(self.command.clone())?;
            env.parse_and_eval_lines(&command)?
        };
        self.save_session(env.context())?;
        Ok(result)
    }
}

fn is_finite(value: &Value) -> bool {
    let is_finite_scalar = |x: Scalar| {
        x.as_complex()
            .map_or(true, |z| z.re.is_finite() && z.im.is_finite())
    };
    match value {
        Value::Scalar(x) => is_finite_scalar(*x),
        Value::Matrix(matrix) => matrix.iter().all(is_finite_scalar),
        _ => false,
    }
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();
    match args.run()? {
        ParseAndEvalResult::Ok => Ok(()),
        ParseAndEvalResult::Errored => process::exit(ERROR_EXIT_CODE),
    }
}
