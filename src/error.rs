use std::{error, fmt, result};

/// Short form to compose Error values.
///
/// Here are few possible ways:
///
/// ```ignore
/// use crate::Error;
/// err_at!(InvalidInput, msg: "bad argument {}", order);
/// ```
///
/// ```ignore
/// use crate::Error;
/// err_at!(FailJson, serde_json::from_str::<Vec<u64>>(text));
/// ```
///
/// ```ignore
/// use crate::Error;
/// err_at!(FailToml, toml::from_str::<TomlConfig>(text), "config {:?}", name);
/// ```
#[macro_export]
macro_rules! err_at {
    ($v:ident, msg: $($arg:expr),+) => {{
        let prefix = format!("{}:{}", file!(), line!());
        Err($crate::Error::$v(prefix, format!($($arg),+)))
    }};
    ($v:ident, $e:expr) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => {
                let prefix = format!("{}:{}", file!(), line!());
                Err($crate::Error::$v(prefix, format!("{}", err)))
            }
        }
    }};
    ($v:ident, $e:expr, $($arg:expr),+) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => {
                let prefix = format!("{}:{}", file!(), line!());
                let msg = format!($($arg),+);
                Err($crate::Error::$v(prefix, format!("{} {}", err, msg)))
            }
        }
    }};
}

/// Type alias for Result return type, used by this package.
pub type Result<T> = result::Result<T, Error>;

/// Error variants that can be returned by this package's API.
///
/// Each variant carries a prefix, typically identifying the
/// error location, and a message.
///
/// Lookup misses are not errors, they are reported as `None` by the
/// containers.
#[derive(Clone, PartialEq)]
pub enum Error {
    /// Fatal case, one of the container invariants is broken. Typically
    /// returned by `validate()` on trees.
    Fatal(String, String),
    /// Argument or configuration is outside its valid range.
    InvalidInput(String, String),
    /// JSON export or import failed, input is not of expected shape.
    FailJson(String, String),
    /// Configuration text is not valid toml.
    FailToml(String, String),
    /// Numeric conversion failed.
    FailConvert(String, String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        use Error::*;

        match self {
            Fatal(p, msg) => write!(f, "{} Fatal: {}", p, msg),
            InvalidInput(p, msg) => write!(f, "{} InvalidInput: {}", p, msg),
            FailJson(p, msg) => write!(f, "{} FailJson: {}", p, msg),
            FailToml(p, msg) => write!(f, "{} FailToml: {}", p, msg),
            FailConvert(p, msg) => write!(f, "{} FailConvert: {}", p, msg),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        write!(f, "{}", self)
    }
}

impl error::Error for Error {}
