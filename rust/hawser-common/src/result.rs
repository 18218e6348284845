pub type Result<T> = std::result::Result<T, crate::error::Error>;

/// Verifies an argument-level precondition, failing with an
/// `InvalidArgument` error carrying the stringified condition.
#[macro_export]
macro_rules! verify_arg {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_arg(result, stringify!($name), stringify!($expr))?;
    }};
}

/// Verifies an offset/length-level precondition, failing with an
/// `OutOfBounds` error carrying the stringified condition.
#[macro_export]
macro_rules! verify_bounds {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_bounds(result, stringify!($name), stringify!($expr))?;
    }};
}

#[inline]
pub fn verify_arg(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        invalid_arg(name, condition)
    }
}

#[inline]
pub fn verify_bounds(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        out_of_bounds(name, condition)
    }
}

#[cold]
pub fn invalid_arg(name: &str, condition: &str) -> Result<()> {
    Err(crate::error::ErrorKind::InvalidArgument {
        name: name.to_string(),
        message: condition.to_string(),
    }
    .into())
}

#[cold]
pub fn out_of_bounds(name: &str, condition: &str) -> Result<()> {
    Err(crate::error::ErrorKind::OutOfBounds {
        name: name.to_string(),
        message: condition.to_string(),
    }
    .into())
}
