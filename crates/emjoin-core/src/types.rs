//! Typed values and row records.
//!
//! Records are plain rows of `Scalar`s. The operators never look inside a
//! value beyond `Scalar::total_cmp` and `Scalar::join_eq`.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::schema::DataType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
    Bin(Vec<u8>),
}

impl Scalar {
    /// Logical type of a non-null value. `Null` carries no type.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Scalar::Null => None,
            Scalar::Bool(_) => Some(DataType::Boolean),
            Scalar::I32(_) => Some(DataType::Int32),
            Scalar::I64(_) => Some(DataType::Int64),
            Scalar::F32(_) => Some(DataType::Float32),
            Scalar::F64(_) => Some(DataType::Float64),
            Scalar::Str(_) => Some(DataType::Utf8),
            Scalar::Bin(_) => Some(DataType::Binary),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Total order used for sorting.
    ///
    /// Nulls sort first, NaN sorts after every other float, and values of
    /// different types order by type rank.
    pub fn total_cmp(&self, other: &Scalar) -> Ordering {
        use Scalar::*;

        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Null, _) => Ordering::Less,
            (_, Null) => Ordering::Greater,
            (Bool(x), Bool(y)) => x.cmp(y),
            (I32(x), I32(y)) => x.cmp(y),
            (I64(x), I64(y)) => x.cmp(y),
            (F32(x), F32(y)) => float_cmp(x.is_nan(), y.is_nan(), x.partial_cmp(y)),
            (F64(x), F64(y)) => float_cmp(x.is_nan(), y.is_nan(), x.partial_cmp(y)),
            (Str(x), Str(y)) => x.cmp(y),
            (Bin(x), Bin(y)) => x.cmp(y),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }

    /// Equality for join keys: null never matches anything, including null.
    pub fn join_eq(&self, other: &Scalar) -> bool {
        !self.is_null() && !other.is_null() && self.total_cmp(other) == Ordering::Equal
    }

    fn type_rank(&self) -> u8 {
        use Scalar::*;
        match self {
            Null => 0,
            Bool(_) => 1,
            I32(_) => 2,
            I64(_) => 3,
            F32(_) => 4,
            F64(_) => 5,
            Str(_) => 6,
            Bin(_) => 7,
        }
    }
}

fn float_cmp(x_nan: bool, y_nan: bool, ord: Option<Ordering>) -> Ordering {
    match (x_nan, y_nan) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => ord.unwrap_or(Ordering::Equal),
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::I32(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::I64(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::F64(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Str(v)
    }
}

/// One row: an ordered, fixed-arity sequence of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub values: Vec<Scalar>,
}

impl Record {
    pub fn new(values: Vec<Scalar>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Scalar> {
        self.values.get(idx)
    }

    /// Joined output row: all of `self`'s values, then all of `right`'s.
    pub fn concat(&self, right: &Record) -> Record {
        let mut values = Vec::with_capacity(self.values.len() + right.values.len());
        values.extend(self.values.iter().cloned());
        values.extend(right.values.iter().cloned());
        Record { values }
    }

    /// Compare two records on one column each. Missing columns sort as null.
    pub fn cmp_on(&self, left_col: usize, other: &Record, right_col: usize) -> Ordering {
        let a = self.values.get(left_col).unwrap_or(&Scalar::Null);
        let b = other.values.get(right_col).unwrap_or(&Scalar::Null);
        a.total_cmp(b)
    }
}

impl From<Vec<Scalar>> for Record {
    fn from(values: Vec<Scalar>) -> Self {
        Record { values }
    }
}
