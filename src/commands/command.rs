//! Command values sent to the server.
//!
//! A [`Command`] is a verb plus an ordered list of binary-safe arguments.
//! The connection only ever reads a command: it encodes the verb and the
//! arguments exactly as given and never interprets either.

use bytes::Bytes;
use std::fmt;

/// Conversion of a scalar into a wire argument.
///
/// Strings and byte buffers are taken verbatim; numbers are rendered in
/// their canonical textual form before their length is measured.
pub trait IntoArgument {
    fn into_argument(self) -> Bytes;
}

impl IntoArgument for Bytes {
    fn into_argument(self) -> Bytes {
        self
    }
}

impl IntoArgument for &Bytes {
    fn into_argument(self) -> Bytes {
        self.clone()
    }
}

impl IntoArgument for &str {
    fn into_argument(self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl IntoArgument for String {
    fn into_argument(self) -> Bytes {
        Bytes::from(self)
    }
}

impl IntoArgument for &String {
    fn into_argument(self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl IntoArgument for &[u8] {
    fn into_argument(self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl<const N: usize> IntoArgument for &[u8; N] {
    fn into_argument(self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl IntoArgument for Vec<u8> {
    fn into_argument(self) -> Bytes {
        Bytes::from(self)
    }
}

macro_rules! display_argument {
    ($($ty:ty),*) => {
        $(
            impl IntoArgument for $ty {
                fn into_argument(self) -> Bytes {
                    Bytes::from(self.to_string())
                }
            }
        )*
    };
}

display_argument!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

/// A request: verb followed by its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    verb: String,
    arguments: Vec<Bytes>,
}

impl Command {
    /// Creates a command with no arguments.
    ///
    /// The verb is sent as given; servers treat verbs case-insensitively.
    pub fn new(verb: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            arguments: Vec::new(),
        }
    }

    /// Creates a command with the given arguments.
    ///
    /// # Example
    /// ```
    /// use flashkv_client::commands::Command;
    /// let cmd = Command::with_args("lrange", ["metavars", "0", "-1"]);
    /// assert_eq!(cmd.arguments().len(), 3);
    /// ```
    pub fn with_args<I, A>(verb: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: IntoArgument,
    {
        let mut cmd = Self::new(verb);
        cmd.set_arguments(args);
        cmd
    }

    /// Appends a single argument, builder style.
    pub fn arg(mut self, arg: impl IntoArgument) -> Self {
        self.arguments.push(arg.into_argument());
        self
    }

    pub fn verb(&self) -> &str {
        &self.verb
    }

    pub fn arguments(&self) -> &[Bytes] {
        &self.arguments
    }

    /// Replaces all arguments.
    pub fn set_arguments<I, A>(&mut self, args: I)
    where
        I: IntoIterator<Item = A>,
        A: IntoArgument,
    {
        self.arguments = args.into_iter().map(IntoArgument::into_argument).collect();
    }

    /// Number of elements on the wire: the verb plus every argument.
    pub fn wire_len(&self) -> usize {
        1 + self.arguments.len()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.verb.to_uppercase())?;
        for arg in &self.arguments {
            match std::str::from_utf8(arg) {
                Ok(s) => write!(f, " {:?}", s)?,
                Err(_) => write!(f, " <{} bytes>", arg.len())?,
            }
        }
        Ok(())
    }
}
