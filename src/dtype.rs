use std::fmt;

/// Canonical element types a field can be coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dtype {
    Bool,
    Int32,
    Int64,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Str,
    /// Nanoseconds since the epoch, stored as ``i64``.
    DateTime64,
}

impl Dtype {
    pub fn name(&self) -> &'static str {
        match self {
            Dtype::Bool => "bool",
            Dtype::Int32 => "int32",
            Dtype::Int64 => "int64",
            Dtype::UInt32 => "uint32",
            Dtype::UInt64 => "uint64",
            Dtype::Float32 => "float32",
            Dtype::Float64 => "float64",
            Dtype::Str => "str",
            Dtype::DateTime64 => "datetime64[ns]",
        }
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How a field declares its element type.
///
/// ``Any`` leaves values untouched. A token resolves through a fixed table;
/// tokens outside the table also mean no coercion, never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DtypeSpec {
    Any,
    Token(String),
    Of(Dtype),
}

impl DtypeSpec {
    /// Resolve to a canonical dtype, or ``None`` for no coercion.
    pub fn resolve(&self) -> Option<Dtype> {
        match self {
            DtypeSpec::Any => None,
            DtypeSpec::Of(dtype) => Some(*dtype),
            DtypeSpec::Token(token) => match token.as_str() {
                "bool" => Some(Dtype::Bool),
                "int" | "int64" | "i64" => Some(Dtype::Int64),
                "int32" | "i32" => Some(Dtype::Int32),
                "uint" | "uint64" | "u64" => Some(Dtype::UInt64),
                "uint32" | "u32" => Some(Dtype::UInt32),
                "float" | "float64" | "f64" | "double" => Some(Dtype::Float64),
                "float32" | "f32" => Some(Dtype::Float32),
                "str" | "string" => Some(Dtype::Str),
                "datetime" | "datetime64" | "datetime64[ns]" => Some(Dtype::DateTime64),
                _ => None,
            },
        }
    }
}

impl From<&str> for DtypeSpec {
    fn from(token: &str) -> Self {
        DtypeSpec::Token(token.to_string())
    }
}

impl From<String> for DtypeSpec {
    fn from(token: String) -> Self {
        DtypeSpec::Token(token)
    }
}

impl From<Dtype> for DtypeSpec {
    fn from(dtype: Dtype) -> Self {
        DtypeSpec::Of(dtype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_resolution() {
        assert_eq!(DtypeSpec::from("int").resolve(), Some(Dtype::Int64));
        assert_eq!(DtypeSpec::from("i32").resolve(), Some(Dtype::Int32));
        assert_eq!(DtypeSpec::from("float").resolve(), Some(Dtype::Float64));
        assert_eq!(DtypeSpec::from("double").resolve(), Some(Dtype::Float64));
        assert_eq!(DtypeSpec::from("f32").resolve(), Some(Dtype::Float32));
        assert_eq!(DtypeSpec::from("bool").resolve(), Some(Dtype::Bool));
        assert_eq!(DtypeSpec::from("string").resolve(), Some(Dtype::Str));
        assert_eq!(DtypeSpec::from("u64").resolve(), Some(Dtype::UInt64));
        assert_eq!(
            DtypeSpec::from("datetime64[ns]").resolve(),
            Some(Dtype::DateTime64)
        );
    }

    #[test]
    fn test_unknown_tokens_mean_no_coercion() {
        assert_eq!(DtypeSpec::from("any").resolve(), None);
        assert_eq!(DtypeSpec::from("").resolve(), None);
        assert_eq!(DtypeSpec::from("complex128").resolve(), None);
        assert_eq!(DtypeSpec::Any.resolve(), None);
    }

    #[test]
    fn test_concrete_dtype_taken_verbatim() {
        assert_eq!(
            DtypeSpec::from(Dtype::UInt32).resolve(),
            Some(Dtype::UInt32)
        );
    }
}
