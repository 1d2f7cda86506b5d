//! Sample arrays. The first axis is always the sample axis.
use super::error::ComputationError;
use ndarray::{ArcArray, Array1, ArrayD, Axis, IxDyn};

#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    F64(ArcArray<f64, IxDyn>),
    Bool(ArcArray<bool, IxDyn>),
}

impl Data {
    pub fn scalar(value: f64) -> Self {
        Data::F64(ArcArray::from_elem(IxDyn(&[]), value))
    }

    pub fn from_vec(values: Vec<f64>) -> Self {
        Data::F64(Array1::from(values).into_dyn().into_shared())
    }

    /// Builds a two dimensional array, one inner vector per row.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, ComputationError> {
        let n = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != width) {
            return Err(ComputationError::Shape("rows have different lengths".into()));
        }
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        Ok(Data::F64(ArrayD::from_shape_vec(IxDyn(&[n, width]), flat)?.into_shared()))
    }

    pub fn dtype(&self) -> &'static str {
        match self {
            Data::F64(_) => "f64",
            Data::Bool(_) => "bool",
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            Data::F64(a) => a.shape(),
            Data::Bool(a) => a.shape(),
        }
    }

    pub fn ndim(&self) -> usize { self.shape().len() }

    /// Length of the sample axis. A zero dimensional value counts as one row.
    pub fn rows(&self) -> usize {
        self.shape().first().copied().unwrap_or(1)
    }

    pub fn as_f64(&self) -> Result<&ArcArray<f64, IxDyn>, ComputationError> {
        match self {
            Data::F64(a) => Ok(a),
            other => Err(ComputationError::DType { expected: "f64", actual: other.dtype() }),
        }
    }

    pub fn as_bool(&self) -> Result<&ArcArray<bool, IxDyn>, ComputationError> {
        match self {
            Data::Bool(a) => Ok(a),
            other => Err(ComputationError::DType { expected: "bool", actual: other.dtype() }),
        }
    }

    pub fn to_vec_f64(&self) -> Result<Vec<f64>, ComputationError> {
        Ok(self.as_f64()?.iter().copied().collect())
    }

    /// Prepends unit axes until the array has at least `k` dimensions.
    pub fn ndmin(self, k: usize) -> Self {
        match self {
            Data::F64(a) => Data::F64(prepend_axes(a, k)),
            Data::Bool(a) => Data::Bool(prepend_axes(a, k)),
        }
    }

    /// Stacks `n` copies of the value along a new leading sample axis.
    pub fn repeat_rows(&self, n: usize) -> Result<Self, ComputationError> {
        Ok(match self {
            Data::F64(a) => Data::F64(repeat(a, n)?),
            Data::Bool(a) => Data::Bool(repeat(a, n)?),
        })
    }

    /// Row `i` of the sample axis.
    pub fn row(&self, i: usize) -> Result<Self, ComputationError> {
        if self.ndim() == 0 || i >= self.rows() {
            return Err(ComputationError::Shape(format!("row {} out of bounds for shape {:?}", i, self.shape())));
        }
        Ok(match self {
            Data::F64(a) => Data::F64(a.index_axis(Axis(0), i).to_owned().into_shared()),
            Data::Bool(a) => Data::Bool(a.index_axis(Axis(0), i).to_owned().into_shared()),
        })
    }

    /// Elementwise `self < threshold`.
    pub fn lt(&self, threshold: f64) -> Result<Self, ComputationError> {
        Ok(Data::Bool(self.as_f64()?.mapv(|x| x < threshold).into_shared()))
    }

    /// Concatenates along the sample axis. All parts must share a dtype and
    /// agree on every other axis.
    pub fn concatenate(parts: &[Data]) -> Result<Self, ComputationError> {
        match parts.first() {
            None => Err(ComputationError::Shape("nothing to concatenate".into())),
            Some(Data::F64(_)) => {
                let views = parts.iter()
                    .map(|p| p.as_f64().map(|a| a.view()))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Data::F64(ndarray::concatenate(Axis(0), &views)?.into_shared()))
            }
            Some(Data::Bool(_)) => {
                let views = parts.iter()
                    .map(|p| p.as_bool().map(|a| a.view()))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Data::Bool(ndarray::concatenate(Axis(0), &views)?.into_shared()))
            }
        }
    }
}

fn prepend_axes<A>(mut a: ArcArray<A, IxDyn>, k: usize) -> ArcArray<A, IxDyn> {
    while a.ndim() < k {
        a = a.insert_axis(Axis(0));
    }
    a
}

fn repeat<A: Clone>(a: &ArcArray<A, IxDyn>, n: usize) -> Result<ArcArray<A, IxDyn>, ComputationError> {
    let mut shape = Vec::with_capacity(a.ndim() + 1);
    shape.push(n);
    shape.extend_from_slice(a.shape());

    let view = a.view().insert_axis(Axis(0));
    let expanded = view
        .broadcast(IxDyn(&shape))
        .ok_or_else(|| ComputationError::Shape(format!("cannot broadcast {:?} to {:?}", a.shape(), shape)))?;
    Ok(expanded.to_owned().into_shared())
}

impl From<f64> for Data {
    fn from(value: f64) -> Self { Data::scalar(value) }
}

impl From<Vec<f64>> for Data {
    fn from(values: Vec<f64>) -> Self { Data::from_vec(values) }
}

impl From<ArrayD<f64>> for Data {
    fn from(a: ArrayD<f64>) -> Self { Data::F64(a.into_shared()) }
}

impl From<ArrayD<bool>> for Data {
    fn from(a: ArrayD<bool>) -> Self { Data::Bool(a.into_shared()) }
}
