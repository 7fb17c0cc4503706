use std::fmt;

/// An ordered sequence of dimension names.
///
/// The order fixes the axis order of the array a field is coerced to. An
/// empty sequence denotes a scalar (0-dimensional) field. Two values compare
/// equal only when their name sequences are equal in the same order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Dims(Vec<String>);

impl Dims {
    /// The empty sequence, for 0-dimensional fields.
    pub fn scalar() -> Self {
        Self(Vec::new())
    }

    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, axis: usize) -> Option<&str> {
        self.0.get(axis).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|dim| dim == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Pair each dimension name with the length of the matching axis.
    pub fn sizes(&self, shape: &[usize]) -> Vec<(String, usize)> {
        self.0.iter().cloned().zip(shape.iter().copied()).collect()
    }
}

impl fmt::Display for Dims {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(")?;
        for (i, dim) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", dim)?;
        }
        write!(f, ")")
    }
}

impl From<&str> for Dims {
    fn from(name: &str) -> Self {
        Self(vec![name.to_string()])
    }
}

impl From<String> for Dims {
    fn from(name: String) -> Self {
        Self(vec![name])
    }
}

impl From<()> for Dims {
    fn from(_: ()) -> Self {
        Self::scalar()
    }
}

impl<const N: usize> From<[&str; N]> for Dims {
    fn from(names: [&str; N]) -> Self {
        Self::new(names)
    }
}

impl From<&[&str]> for Dims {
    fn from(names: &[&str]) -> Self {
        Self::new(names.iter().copied())
    }
}

impl From<Vec<String>> for Dims {
    fn from(names: Vec<String>) -> Self {
        Self(names)
    }
}

impl From<Vec<&str>> for Dims {
    fn from(names: Vec<&str>) -> Self {
        Self::new(names)
    }
}

// Nested groups of names flatten into one ordered sequence.

impl<A, B> From<(A, B)> for Dims
where
    A: Into<Dims>,
    B: Into<Dims>,
{
    fn from((a, b): (A, B)) -> Self {
        let mut names = a.into().0;
        names.extend(b.into().0);
        Self(names)
    }
}

impl<A, B, C> From<(A, B, C)> for Dims
where
    A: Into<Dims>,
    B: Into<Dims>,
    C: Into<Dims>,
{
    fn from((a, b, c): (A, B, C)) -> Self {
        let mut names = a.into().0;
        names.extend(b.into().0);
        names.extend(c.into().0);
        Self(names)
    }
}
