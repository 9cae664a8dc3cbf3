use std::fmt;

/// A constant value embedded into generated SQL.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<Literal>),
}

impl Literal {
    pub const fn is_null(&self) -> bool {
        matches!(self, Literal::Null)
    }

    /// Render this literal as SQL text.
    pub fn serialize(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(true) => write!(f, "TRUE"),
            Self::Bool(false) => write!(f, "FALSE"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) if v.is_nan() => write!(f, "'NaN'::float8"),
            Self::Float(v) if v.is_infinite() && v.is_sign_positive() => {
                write!(f, "'Infinity'::float8")
            }
            Self::Float(v) if v.is_infinite() => write!(f, "'-Infinity'::float8"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Str(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::Array(vals) if vals.is_empty() => write!(f, "'{{}}'"),
            Self::Array(vals) => {
                write!(f, "ARRAY[")?;
                for (idx, val) in vals.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{val}")?;
                }
                write!(f, "]")
            }
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Literal {
                fn from(value: $t) -> Self {
                    Literal::Int(value as i64)
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl From<f32> for Literal {
    fn from(value: f32) -> Self {
        Literal::Float(value as f64)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Float(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Str(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::Str(value)
    }
}

impl<T: Into<Literal>> From<Option<T>> for Literal {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Literal::Null,
        }
    }
}

impl<T: Into<Literal>> From<Vec<T>> for Literal {
    fn from(value: Vec<T>) -> Self {
        Literal::Array(value.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars() {
        assert_eq!("NULL", Literal::Null.serialize());
        assert_eq!("TRUE", Literal::from(true).serialize());
        assert_eq!("FALSE", Literal::from(false).serialize());
        assert_eq!("42", Literal::from(42).serialize());
        assert_eq!("-7", Literal::from(-7_i64).serialize());
        assert_eq!("1.5", Literal::from(1.5).serialize());
        assert_eq!("2.0", Literal::from(2.0).serialize());
    }

    #[test]
    fn string_quotes_escaped() {
        assert_eq!("'aaa'", Literal::from("aaa").serialize());
        assert_eq!("'it''s'", Literal::from("it's").serialize());
    }

    #[test]
    fn none_is_null() {
        assert_eq!("NULL", Literal::from(None::<i32>).serialize());
        assert_eq!("3", Literal::from(Some(3)).serialize());
    }

    #[test]
    fn arrays() {
        assert_eq!("ARRAY[1, 2, 3]", Literal::from(vec![1, 2, 3]).serialize());
        assert_eq!("ARRAY['a', NULL]", Literal::from(vec![Some("a"), None]).serialize());
        assert_eq!("'{}'", Literal::Array(Vec::new()).serialize());
    }

    #[test]
    fn special_floats() {
        assert_eq!("'NaN'::float8", Literal::from(f64::NAN).serialize());
        assert_eq!("'-Infinity'::float8", Literal::from(f64::NEG_INFINITY).serialize());
    }
}
