//! Dense numeric matrices stored as lists of lists.
//!
//! A list of N numbers reads as an N x 1 matrix, a list of N lists of M
//! numbers as N x M. Writing goes the other way, except that a single row or
//! column is written back as a flat list.

use crate::coerce::{Scalar, float_to_int, int_to_float};
use crate::config::Config;
use crate::error::{ConfigError, Result};
use crate::key::KeyPath;
use crate::value::Value;

mod sealed {
    pub trait Sealed {}
    impl Sealed for f64 {}
    impl Sealed for f32 {}
    impl Sealed for i64 {}
    impl Sealed for i32 {}
    impl Sealed for u8 {}
}

/// Element types a [`Matrix`] can hold.
pub trait MatrixElement: Copy + PartialEq + sealed::Sealed {
    const NAME: &'static str;

    fn from_value(value: &Value) -> Option<Self>;

    fn into_value(self) -> Value;
}

impl MatrixElement for f64 {
    const NAME: &'static str = "f64";

    fn from_value(value: &Value) -> Option<Self> {
        <f64 as Scalar>::from_value(value)
    }

    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl MatrixElement for f32 {
    const NAME: &'static str = "f32";

    fn from_value(value: &Value) -> Option<Self> {
        let wide = match value {
            Value::Float(f) => *f,
            Value::Integer(i) => int_to_float(*i)?,
            _ => return None,
        };
        let narrow = wide as f32;
        // Reject values that only fit by overflowing to infinity.
        (narrow.is_finite() || !wide.is_finite()).then_some(narrow)
    }

    fn into_value(self) -> Value {
        Value::Float(self.into())
    }
}

fn integer_of(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(i) => Some(*i),
        Value::Float(f) => float_to_int(*f),
        _ => None,
    }
}

impl MatrixElement for i64 {
    const NAME: &'static str = "i64";

    fn from_value(value: &Value) -> Option<Self> {
        integer_of(value)
    }

    fn into_value(self) -> Value {
        Value::Integer(self)
    }
}

impl MatrixElement for i32 {
    const NAME: &'static str = "i32";

    fn from_value(value: &Value) -> Option<Self> {
        integer_of(value).and_then(|i| i32::try_from(i).ok())
    }

    fn into_value(self) -> Value {
        Value::Integer(self.into())
    }
}

impl MatrixElement for u8 {
    const NAME: &'static str = "u8";

    fn from_value(value: &Value) -> Option<Self> {
        integer_of(value).and_then(|i| u8::try_from(i).ok())
    }

    fn into_value(self) -> Value {
        Value::Integer(self.into())
    }
}

/// Memory order of a flat buffer handed to [`Matrix::from_buffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    RowMajor,
    ColumnMajor,
}

/// A dense `rows x cols` matrix, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: MatrixElement> Matrix<T> {
    /// Wrap a flat buffer. Column-major input is transposed into row-major
    /// storage.
    pub fn from_buffer(rows: usize, cols: usize, data: Vec<T>, layout: Layout) -> Result<Self> {
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(ConfigError::InvalidValue(format!(
                "a {rows}x{cols} matrix needs {} elements, got {}",
                rows.saturating_mul(cols),
                data.len()
            )));
        }
        let data = match layout {
            Layout::RowMajor => data,
            Layout::ColumnMajor => (0..rows)
                .flat_map(|r| (0..cols).map(move |c| (r, c)))
                .map(|(r, c)| data[c * rows + r])
                .collect(),
        };
        Ok(Matrix { rows, cols, data })
    }

    /// Build from rows, which must all have the same length.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().position(|r| r.len() != cols) {
            return Err(ConfigError::InvalidValue(format!(
                "row {bad} has {} columns, expected {cols}",
                rows[bad].len()
            )));
        }
        let n = rows.len();
        Ok(Matrix {
            rows: n,
            cols,
            data: rows.into_iter().flatten().collect(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        (row < self.rows && col < self.cols).then(|| self.data[row * self.cols + col])
    }

    /// Row-major elements.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// List-of-lists representation; a single row or column becomes a flat
    /// list.
    pub fn to_value(&self) -> Value {
        if self.rows == 1 || self.cols == 1 {
            return Value::List(self.data.iter().map(|x| x.into_value()).collect());
        }
        if self.cols == 0 {
            return Value::List(vec![Value::List(Vec::new()); self.rows]);
        }
        Value::List(
            self.data
                .chunks(self.cols)
                .map(|row| Value::List(row.iter().map(|x| x.into_value()).collect()))
                .collect(),
        )
    }

    /// Interpret a list value. `fqn` is only used in error messages.
    pub fn from_list(items: &[Value], fqn: &str) -> Result<Self> {
        let element = |v: &Value, at: String| {
            T::from_value(v).ok_or_else(|| {
                ConfigError::type_mismatch(
                    at,
                    format!("{} value {v} is not representable as {}", v.config_type(), T::NAME),
                )
            })
        };

        let nested = items.iter().filter(|v| matches!(v, Value::List(_))).count();
        if nested == 0 {
            let data = items
                .iter()
                .enumerate()
                .map(|(i, v)| element(v, format!("{fqn}[{i}]")))
                .collect::<Result<Vec<T>>>()?;
            let rows = data.len();
            let cols = usize::from(rows > 0);
            return Ok(Matrix { rows, cols, data });
        }
        if nested != items.len() {
            return Err(ConfigError::type_mismatch(
                fqn,
                "mixes numbers and lists; expected a list of numbers or a list of lists",
            ));
        }

        let mut rows = Vec::with_capacity(items.len());
        for (r, row) in items.iter().enumerate() {
            let Value::List(cells) = row else {
                continue;
            };
            let row = cells
                .iter()
                .enumerate()
                .map(|(c, v)| element(v, format!("{fqn}[{r}][{c}]")))
                .collect::<Result<Vec<T>>>()?;
            rows.push(row);
        }
        Matrix::from_rows(rows).map_err(|e| match e {
            ConfigError::InvalidValue(reason) => ConfigError::type_mismatch(fqn, reason),
            other => other,
        })
    }
}

impl Config {
    /// Read the list at `path` as a matrix of `T`.
    pub fn get_matrix<T: MatrixElement>(&self, path: &str) -> Result<Matrix<T>> {
        let fqn = match self.path() {
            Ok(base) if !base.is_root() => format!("{base}.{path}"),
            _ => path.to_string(),
        };
        match self.get(path)? {
            Value::List(items) => Matrix::from_list(&items, &fqn),
            other => Err(ConfigError::type_mismatch(
                fqn,
                format!("expected a list, found a {}", other.config_type()),
            )),
        }
    }

    pub fn get_matrix_or<T: MatrixElement>(
        &self,
        path: &str,
        default: Matrix<T>,
    ) -> Result<Matrix<T>> {
        self.or_default(self.get_matrix(path), default)
    }

    /// Store `matrix` at `path` as a list (of lists).
    pub fn set_matrix<T: MatrixElement>(&self, path: &str, matrix: &Matrix<T>) -> Result<()> {
        let key_path = KeyPath::parse(path)?;
        self.set_path(&key_path, matrix.to_value())
    }
}
