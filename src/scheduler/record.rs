use std::borrow::Cow;
use std::ffi::OsString;

/// One line of input, minus its terminator.
///
/// The bytes are kept exactly as read, so a line that is not valid UTF-8
/// still reaches the command unchanged. Created by the producer, moved
/// through the work queue and consumed by exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    seq: u64,
    line: Vec<u8>,
}

impl Record {
    /// `seq` is the 1-based line number in the input stream.
    pub fn new(seq: u64, line: impl Into<Vec<u8>>) -> Self {
        Self {
            seq,
            line: line.into(),
        }
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.line
    }

    /// The line as text, with invalid UTF-8 replaced. For display only.
    pub fn line(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.line)
    }

    /// The raw line as a process argument.
    #[cfg(unix)]
    pub fn to_os_string(&self) -> OsString {
        use std::os::unix::ffi::OsStringExt;
        OsString::from_vec(self.line.clone())
    }

    #[cfg(not(unix))]
    pub fn to_os_string(&self) -> OsString {
        OsString::from(self.line().into_owned())
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.line())
    }
}
