use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::error::ErrorKind;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};

use fr_rs::{OutputOptions, Symbols};

use crate::error::{DfrError, Result};
use crate::model::Layout;
use crate::parse::{
    memory_types_help, parse_offset_range, parse_range, parse_symbol, parse_type_range, parse_vector_table,
    ParsingError,
};

/// Options file read before anything else, from the working directory.
pub const DEFAULT_OPTIONS_FILE: &str = "dfr.txt";
pub const MAX_NESTING: usize = 8;

#[derive(Parser, Debug, Default)]
#[command(name = "dfr", version, about = "Disassembler for Fujitsu FR firmware images")]
pub struct Cli {
    /// Input firmware image
    #[arg(value_name = "INFILE")]
    pub input: Vec<String>,
    /// Disassemble only this range (start-end or start,length)
    #[arg(short = 'd', value_name = "RANGE")]
    pub decode: Vec<String>,
    /// Declare an entry point
    #[arg(short = 'e', value_name = "ADDRESS=NAME")]
    pub entry: Vec<String>,
    /// Map a range onto a file offset for correlation
    #[arg(short = 'f', value_name = "RANGE=ADDRESS")]
    pub file_range: Vec<String>,
    /// Map a memory range onto a file offset
    #[arg(short = 'i', value_name = "RANGE=OFFSET")]
    pub input_map: Vec<String>,
    /// Input is little-endian
    #[arg(short = 'l')]
    pub little_endian: bool,
    /// Memory range content type (-m? lists types)
    #[arg(short = 'm', value_name = "RANGE=TYPE")]
    pub memory: Vec<String>,
    /// Output file
    #[arg(short = 'o', value_name = "OUTFILE")]
    pub output: Option<String>,
    /// One output file per memory range
    #[arg(short = 'r')]
    pub split: bool,
    /// Declare a symbol
    #[arg(short = 's', value_name = "ADDRESS=NAME")]
    pub symbol: Vec<String>,
    /// Interrupt vector table address
    #[arg(short = 't', value_name = "ADDRESS")]
    pub vectors: Vec<String>,
    /// Verbose
    #[arg(short = 'v')]
    pub verbose: bool,
    /// Output options (-w? lists them)
    #[arg(short = 'w', value_name = "OPTIONS")]
    pub write: Vec<String>,
    /// Read options from a file
    #[arg(short = 'x', value_name = "FILE")]
    pub options_file: Vec<PathBuf>,
    /// Debug
    #[arg(short = 'z')]
    pub debug: bool,
}

/// One parsed argument list, remembering where each option appeared so that options
/// take effect in command-line order.
#[derive(Debug)]
pub struct Invocation {
    pub cli: Cli,
    matches: ArgMatches,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Occurrence<'a> {
    Input(&'a str),
    OptionsFile(&'a Path),
    Value(char, &'a str),
}

fn positions(matches: &ArgMatches, id: &str) -> Vec<usize> {
    matches.indices_of(id).map(Iterator::collect).unwrap_or_default()
}

impl Invocation {
    /// Parse arguments, accepting `-?` for `-h`.
    pub fn try_parse_from<I, T>(args: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let matches = Cli::command().try_get_matches_from(args.into_iter().map(|a| {
            let a: OsString = a.into();
            if a == "-?" {
                OsString::from("-h")
            } else {
                a
            }
        }))?;
        let cli = Cli::from_arg_matches(&matches)?;
        Ok(Self { cli, matches })
    }

    /// Input names, options files and valued options, in command-line order.
    fn occurrences(&self) -> Vec<(usize, Occurrence<'_>)> {
        let (m, c) = (&self.matches, &self.cli);
        let mut out: Vec<(usize, Occurrence<'_>)> = Vec::new();
        out.extend(positions(m, "input").into_iter().zip(&c.input).map(|(i, v)| (i, Occurrence::Input(v))));
        out.extend(
            positions(m, "options_file").into_iter().zip(&c.options_file).map(|(i, p)| (i, Occurrence::OptionsFile(p))),
        );
        let valued = [
            ("decode", 'd', &c.decode),
            ("entry", 'e', &c.entry),
            ("file_range", 'f', &c.file_range),
            ("input_map", 'i', &c.input_map),
            ("memory", 'm', &c.memory),
            ("symbol", 's', &c.symbol),
            ("vectors", 't', &c.vectors),
            ("write", 'w', &c.write),
        ];
        for (id, option, values) in valued {
            out.extend(positions(m, id).into_iter().zip(values).map(|(i, v)| (i, Occurrence::Value(option, v))));
        }
        out.sort_by_key(|&(i, _)| i);
        out
    }
}

/// The resolved run configuration.
#[derive(Debug, Default)]
pub struct Config {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub split: bool,
    pub options: OutputOptions,
    pub layout: Layout,
    pub symbols: Symbols,
}

/// Split an options file into argument tokens: `#` comments and blank lines are dropped,
/// `-X argument` lines give two tokens, anything else one.
pub fn tokenize_options(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut chars = line.char_indices();
        let split = match (chars.next(), chars.next(), chars.next()) {
            (Some((_, '-')), Some((_, c)), Some((at, ws))) if c != '-' && ws.is_whitespace() => Some(at),
            _ => None,
        };
        match split {
            Some(at) => {
                tokens.push(line[..at].to_string());
                tokens.push(line[at..].trim().to_string());
            }
            None => tokens.push(line.to_string()),
        }
    }
    tokens
}

/// Turn a clap error from an options file into ours; help requests become `Usage`.
fn options_error(path: &Path, e: clap::Error) -> DfrError {
    match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => DfrError::Usage(e.render().to_string()),
        _ => DfrError::OptionsSyntax { path: path.to_path_buf(), message: e.to_string() },
    }
}

impl Config {
    /// Read the default options file when it exists.
    pub fn load_default_file(&mut self, dir: &Path) -> Result<()> {
        let path = dir.join(DEFAULT_OPTIONS_FILE);
        if !path.is_file() {
            tracing::warn!("default options file {} not found", path.display());
            return Ok(());
        }
        self.apply_file(&path, 1)
    }

    pub fn apply_file(&mut self, path: &Path, depth: usize) -> Result<()> {
        if depth > MAX_NESTING {
            return Err(DfrError::Nesting(MAX_NESTING));
        }
        let text = std::fs::read_to_string(path)
            .map_err(|source| DfrError::OptionsFile { path: path.to_path_buf(), source })?;
        let args = std::iter::once("dfr".to_string()).chain(tokenize_options(&text));
        let invocation = Invocation::try_parse_from(args).map_err(|e| options_error(path, e))?;
        tracing::debug!("reading options from {}", path.display());
        self.apply(&invocation, depth)
    }

    /// Merge one parsed argument list. Options apply in the order given; a `-x` file is
    /// read where it appears.
    pub fn apply(&mut self, invocation: &Invocation, depth: usize) -> Result<()> {
        for (_, occurrence) in invocation.occurrences() {
            match occurrence {
                Occurrence::Input(name) => {
                    if self.input.is_some() {
                        return Err(DfrError::TooManyInputs(name.to_string()));
                    }
                    self.input = Some(PathBuf::from(name));
                }
                Occurrence::OptionsFile(path) => self.apply_file(path, depth + 1)?,
                Occurrence::Value(option, arg) => self.apply_value(option, arg)?,
            }
        }

        let cli = &invocation.cli;
        if cli.little_endian {
            return Err(DfrError::UnimplementedOption('l'));
        }
        if let Some(output) = &cli.output {
            self.output = Some(PathBuf::from(output));
        }
        self.split |= cli.split;
        if cli.verbose {
            self.options |= OutputOptions::VERBOSE;
        }
        if cli.debug {
            self.options |= OutputOptions::DEBUG;
        }
        Ok(())
    }

    fn apply_value(&mut self, option: char, arg: &str) -> Result<()> {
        match option {
            'd' => self.layout.range_map.insert(parse_range(option, arg)?),
            'e' => {
                parse_symbol(option, arg)?;
                return Err(DfrError::UnimplementedOption(option));
            }
            'f' => {
                parse_offset_range(option, arg)?;
                return Err(DfrError::UnimplementedOption(option));
            }
            'i' => self.layout.file_map.insert(parse_offset_range(option, arg)?),
            'm' if arg.trim() == "?" => return Err(DfrError::Usage(memory_types_help())),
            'm' => self.layout.mem_map.insert(parse_type_range(option, arg)?),
            's' => {
                let (addr, name) = parse_symbol(option, arg)?;
                if let Some(old) = self.symbols.insert(addr, name) {
                    tracing::warn!("symbol at 0x{addr:08X} redeclared, replacing \"{old}\"");
                }
            }
            't' => self.layout.mem_map.insert(parse_vector_table(option, arg)?),
            'w' if arg.trim() == "?" => return Err(DfrError::Usage(OutputOptions::help())),
            'w' => self.options.apply(arg).map_err(|_| ParsingError {
                option,
                token: arg.to_string(),
                reason: "unknown output option",
            })?,
            _ => return Err(DfrError::UnimplementedOption(option)),
        }
        Ok(())
    }

    /// Build the configuration from the default options file in `dir` and the command line.
    pub fn from_cli(invocation: &Invocation, dir: &Path) -> Result<Self> {
        let mut config = Config::default();
        config.load_default_file(dir)?;
        config.apply(invocation, 0)?;
        if config.input.is_none() {
            return Err(DfrError::NoInput);
        }
        Ok(config)
    }
}
