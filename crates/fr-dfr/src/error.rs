use std::io;
use std::path::PathBuf;

use crate::parse::ParsingError;

/// Fatal configuration and run errors. Per-range decode failures are not here: they are
/// logged and recorded on the section instead.
#[derive(thiserror::Error, Debug)]
pub enum DfrError {
    #[error(transparent)]
    Parsing(#[from] ParsingError),
    #[error("-{0}: not implemented yet")]
    UnimplementedOption(char),
    #[error("too many input files: \"{0}\"")]
    TooManyInputs(String),
    #[error("no input file")]
    NoInput,
    #[error("cannot read options file {path}")]
    OptionsFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("options file {path}: {message}")]
    OptionsSyntax { path: PathBuf, message: String },
    #[error("options files nested deeper than {0} levels")]
    Nesting(usize),
    /// Help text requested through `-h`, `-m?` or `-w?`.
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T, E = DfrError> = std::result::Result<T, E>;
