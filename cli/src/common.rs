//! Common utils.

use codespan::{FileId, Files};
use codespan_reporting::{
    diagnostic::{Diagnostic, Label},
    term::termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor},
    term::{emit, Config as ReportingConfig},
};
use unindent::unindent;

use std::{
    io::{self, Write},
    ops::Range,
};

use mathexpr::{Context, Error, Outline, Query, Symbols, TokenSet, Value};

pub const ERROR_EXIT_CODE: i32 = 2;
const HELP_WIDTH: usize = 80;

const HELP: &str = "
    Enter an expression to evaluate it, e.g. `sqrt(2) * [1, 2; 3, 4]`. \
    An expression ending with `;` is evaluated without outputting its result. \
    The result of the last evaluated expression is available as `$`.

    Commands:
      .help    Show this help
      .vars    List defined variables and constants
      .clear   Remove all variables
";

/// Result of parsing and evaluating a code snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseAndEvalResult {
    Ok,
    Errored,
}

impl ParseAndEvalResult {
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

/// Code map containing evaluated code snippets.
#[derive(Debug, Default)]
struct CodeMap {
    files: Files<String>,
    snippet_count: usize,
}

impl CodeMap {
    fn add(&mut self, source: &str) -> FileId {
        self.snippet_count += 1;
        let file_name = format!("Snip #{}", self.snippet_count);
        self.files.add(file_name, source.to_owned())
    }

    fn clamp(&self, file: FileId, range: Range<usize>) -> Range<usize> {
        let len = self.files.source(file).len();
        range.start.min(len)..range.end.min(len)
    }
}

/// Environment shared by the non-interactive mode and the REPL: the evaluation context
/// together with output streams and the map of evaluated snippets.
pub struct Env {
    context: Context<'static>,
    symbols: Symbols,
    code_map: CodeMap,
    stdout: StandardStream,
    stderr: StandardStream,
    config: ReportingConfig,
}

impl Env {
    pub fn new(context: Context<'static>, symbols: Symbols, color_choice: ColorChoice) -> Self {
        Self {
            context,
            symbols,
            code_map: CodeMap::default(),
            stdout: StandardStream::stdout(color_choice),
            stderr: StandardStream::stderr(color_choice),
            config: ReportingConfig::default(),
        }
    }

    pub fn context(&self) -> &Context<'static> {
        &self.context
    }

    pub fn print_greeting(&mut self) -> io::Result<()> {
        let mut writer = self.stderr.lock();
        writer.set_color(ColorSpec::new().set_bold(true))?;
        writeln!(writer, "mathexpr REPL v{}", env!("CARGO_PKG_VERSION"))?;
        writer.reset()?;
        writeln!(writer, "{}", env!("CARGO_PKG_DESCRIPTION"))?;
        writeln!(writer, "Use `.help` for more information.")
    }

    pub fn print_help(&mut self) -> io::Result<()> {
        let help = unindent(HELP);
        let mut writer = self.stderr.lock();
        for paragraph in help.split("\n\n") {
            if paragraph.starts_with("Commands:") {
                writeln!(writer, "{paragraph}")?;
            } else {
                let paragraph = paragraph.replace('\n', " ");
                writeln!(writer, "{}", textwrap::fill(&paragraph, HELP_WIDTH))?;
                writeln!(writer)?;
            }
        }
        Ok(())
    }

    fn write_value(writer: &mut impl WriteColor, value: &Value) -> io::Result<()> {
        let num_color = ColorSpec::new().set_fg(Some(Color::Green)).clone();
        let opaque_color = ColorSpec::new().set_fg(Some(Color::Magenta)).clone();

        let color = if value.is_numeric() {
            num_color
        } else {
            opaque_color
        };
        writer.set_color(&color)?;
        write!(writer, "{value}")?;
        writer.reset()
    }

    pub fn dump_value(&mut self, value: &Value) -> io::Result<()> {
        let mut writer = self.stdout.lock();
        Self::write_value(&mut writer, value)?;
        writeln!(writer)
    }

    pub fn dump_variables(&mut self) -> io::Result<()> {
        let mut writer = self.stdout.lock();
        let bold = ColorSpec::new().set_bold(true).clone();
        for (title, values) in [
            ("Constants", self.context.constants()),
            ("Variables", self.context.variables()),
        ] {
            if values.is_empty() {
                continue;
            }
            writer.set_color(&bold)?;
            writeln!(writer, "{title}:")?;
            writer.reset()?;
            for (name, value) in values {
                write!(writer, "  {name} = ")?;
                Self::write_value(&mut writer, &value)?;
                writeln!(writer)?;
            }
        }
        Ok(())
    }

    pub fn clear_variables(&mut self) {
        self.context.clear_variables();
    }

    /// Reports an error in the snippet with the specified ID.
    fn report_error(&self, file: FileId, err: &Error) -> io::Result<()> {
        let range = self.code_map.clamp(file, err.location().range());
        let label = Label::primary(file, range).with_message(err.kind().to_short_string());
        let code = if err.kind().is_parse_error() {
            "PARSE"
        } else {
            "EVAL"
        };
        let diagnostic = Diagnostic::error()
            .with_message(err.kind().to_string())
            .with_code(code)
            .with_labels(vec![label]);

        emit(
            &mut self.stderr.lock(),
            &self.config,
            &self.code_map.files,
            &diagnostic,
        )
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))
    }

    /// Reports a command that is not recognized by the REPL.
    pub fn report_unknown_command(&mut self, line: &str) -> io::Result<()> {
        let file = self.code_map.add(line);
        let label = Label::primary(file, 0..line.len())
            .with_message("Use `.help` to find out commands");
        let diagnostic = Diagnostic::error()
            .with_message("Unknown command")
            .with_code("CMD")
            .with_labels(vec![label]);
        emit(
            &mut self.stderr.lock(),
            &self.config,
            &self.code_map.files,
            &diagnostic,
        )
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))
    }

    /// Parses the `line` and outputs its expression tree.
    pub fn output_ast(&mut self, line: &str, tokens: &TokenSet) -> io::Result<ParseAndEvalResult> {
        let file = self.code_map.add(line);
        let mut query = Query::new(line);
        match query.build_tree(tokens) {
            Ok(tree) => {
                let mut writer = self.stdout.lock();
                write!(writer, "{}", Outline(tree))?;
                writeln!(writer, "=> {}", tree.extra)?;
                Ok(ParseAndEvalResult::Ok)
            }
            Err(err) => {
                self.report_error(file, &err)?;
                Ok(ParseAndEvalResult::Errored)
            }
        }
    }

    /// Evaluates a single query and outputs its result unless the query is muted.
    pub fn parse_and_eval(&mut self, line: &str) -> io::Result<ParseAndEvalResult> {
        let file = self.code_map.add(line);
        let mut query = Query::new(line);
        let muted = query.is_muted();
        match query.evaluate(&self.context, &self.symbols) {
            Ok(value) => {
                if !muted {
                    let value = value.clone();
                    self.dump_value(&value)?;
                }
                Ok(ParseAndEvalResult::Ok)
            }
            Err(err) => {
                self.report_error(file, err)?;
                Ok(ParseAndEvalResult::Errored)
            }
        }
    }

    /// Evaluates each non-empty line of the `code`, stopping on the first error.
    pub fn parse_and_eval_lines(&mut self, code: &str) -> io::Result<ParseAndEvalResult> {
        for line in code.lines().filter(|line| !line.trim().is_empty()) {
            if !self.parse_and_eval(line)?.is_ok() {
                return Ok(ParseAndEvalResult::Errored);
            }
        }
        Ok(ParseAndEvalResult::Ok)
    }
}
