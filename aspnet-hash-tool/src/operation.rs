use aspnet_hash::{HashParameters, HashScheme};

/// Work applied to each input line by the pipeline.
///
/// Lines are raw bytes without the trailing newline and need not be UTF-8.
/// Implementations must be free of shared mutable state; the pipeline calls
/// `apply` from many threads at once.
pub trait LineOperation: Send + Sync + 'static {
    fn apply(&self, line: &[u8]) -> Result<Vec<u8>, aspnet_hash::Error>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Hash each plaintext line.
    Generate { scheme: HashScheme, params: HashParameters },
    /// Reformat each stored MVC4 hash for hashcat.
    Convert { delimiter: Option<String>, iterations: u32 },
}

impl Operation {
    /// What one input line is called in log output.
    pub fn unit(&self) -> &'static str {
        match self {
            Operation::Generate { .. } => "lines",
            Operation::Convert { .. } => "hashes",
        }
    }
}

impl LineOperation for Operation {
    fn apply(&self, line: &[u8]) -> Result<Vec<u8>, aspnet_hash::Error> {
        match self {
            Operation::Generate { scheme, params } => {
                aspnet_hash::generate(line, *scheme, params).map(String::into_bytes)
            }
            Operation::Convert { delimiter, iterations } => {
                aspnet_hash::convert(line, delimiter.as_deref().map(str::as_bytes), *iterations)
            }
        }
    }
}
