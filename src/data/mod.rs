//! Tabular dataset used by the selectors
//!
//! A [`Dataset`] is an ordered set of named feature columns plus a target.
//! Every column carries a [`ColumnType`] fixed when the column is added;
//! selectors never re-infer it. Categorical columns are stored as integer
//! level codes next to their level table, datetimes as epoch values, so every
//! column can be fed to an estimator as `f64`.

pub mod variables;

pub use variables::resolve_variables;

use crate::error::{Result, SelectionError};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Column data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Numeric,
    Categorical,
    DateTime,
}

/// A single named feature column
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    dtype: ColumnType,
    values: Array1<f64>,
    levels: Option<Vec<String>>,
}

impl Column {
    /// Create a numeric column
    pub fn numeric(name: impl Into<String>, values: Array1<f64>) -> Result<Self> {
        let name = name.into();
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(SelectionError::DataError(format!(
                "column '{}' has a non-finite value at row {}",
                name, pos
            )));
        }
        Ok(Self {
            name,
            dtype: ColumnType::Numeric,
            values,
            levels: None,
        })
    }

    /// Create a categorical column; levels are numbered by first appearance
    pub fn categorical<S: AsRef<str>>(name: impl Into<String>, values: &[S]) -> Self {
        let mut levels: Vec<String> = Vec::new();
        let mut codes: HashMap<String, usize> = HashMap::new();
        let encoded: Vec<f64> = values
            .iter()
            .map(|v| {
                let key = v.as_ref();
                let code = match codes.get(key) {
                    Some(&code) => code,
                    None => {
                        let code = levels.len();
                        levels.push(key.to_string());
                        codes.insert(key.to_string(), code);
                        code
                    }
                };
                code as f64
            })
            .collect();

        Self {
            name: name.into(),
            dtype: ColumnType::Categorical,
            values: Array1::from_vec(encoded),
            levels: Some(levels),
        }
    }

    /// Create a datetime column from epoch values
    pub fn datetime(name: impl Into<String>, epochs: &[i64]) -> Self {
        Self {
            name: name.into(),
            dtype: ColumnType::DateTime,
            values: epochs.iter().map(|&v| v as f64).collect(),
            levels: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> ColumnType {
        self.dtype
    }

    /// Numeric representation (level codes for categorical columns)
    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    /// Level table of a categorical column
    pub fn levels(&self) -> Option<&[String]> {
        self.levels.as_deref()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Feature columns plus a target, read-only during a fit call
#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<Column>,
    positions: HashMap<String, usize>,
    target_name: String,
    target: Array1<f64>,
}

impl Dataset {
    /// Create a dataset with a target and no features yet
    pub fn new(target_name: impl Into<String>, target: Array1<f64>) -> Self {
        Self {
            columns: Vec::new(),
            positions: HashMap::new(),
            target_name: target_name.into(),
            target,
        }
    }

    /// Build a dataset from a polars DataFrame.
    ///
    /// Integer, float and boolean columns become numeric, string and
    /// categorical columns become categorical, date and datetime columns keep
    /// their physical epoch value. Missing values are rejected.
    pub fn from_dataframe(df: &DataFrame, target: &str) -> Result<Self> {
        let target_column = df
            .column(target)
            .map_err(|_| SelectionError::FeatureNotFound(target.to_string()))?;
        let target_values = series_to_f64(target_column.as_materialized_series())?;

        let mut dataset = Dataset::new(target, Array1::from_vec(target_values));

        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .filter(|name| name != target)
            .collect();

        for name in names {
            let series = df
                .column(&name)
                .map_err(|_| SelectionError::FeatureNotFound(name.clone()))?
                .as_materialized_series();

            let column = match series.dtype() {
                DataType::Boolean
                | DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::UInt8
                | DataType::UInt16
                | DataType::UInt32
                | DataType::UInt64
                | DataType::Float32
                | DataType::Float64 => {
                    Column::numeric(name.clone(), Array1::from_vec(series_to_f64(series)?))?
                }
                DataType::String | DataType::Categorical(..) => {
                    let as_str = series.cast(&DataType::String)?;
                    let values: Vec<&str> = as_str
                        .str()?
                        .into_iter()
                        .enumerate()
                        .map(|(row, v)| {
                            v.ok_or_else(|| missing_value(&name, row))
                        })
                        .collect::<Result<Vec<&str>>>()?;
                    Column::categorical(name.clone(), &values)
                }
                DataType::Date | DataType::Datetime(..) => {
                    let physical = series.to_physical_repr().cast(&DataType::Int64)?;
                    let epochs: Vec<i64> = physical
                        .i64()?
                        .into_iter()
                        .enumerate()
                        .map(|(row, v)| v.ok_or_else(|| missing_value(&name, row)))
                        .collect::<Result<Vec<i64>>>()?;
                    Column::datetime(name.clone(), &epochs)
                }
                other => {
                    return Err(SelectionError::DataError(format!(
                        "column '{}' has unsupported dtype {:?}",
                        name, other
                    )))
                }
            };
            dataset.push_column(column)?;
        }

        Ok(dataset)
    }

    /// Add a numeric feature column
    pub fn add_numeric(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<&mut Self> {
        let column = Column::numeric(name, Array1::from_vec(values))?;
        self.push_column(column)?;
        Ok(self)
    }

    /// Add a categorical feature column
    pub fn add_categorical<S: AsRef<str>>(
        &mut self,
        name: impl Into<String>,
        values: &[S],
    ) -> Result<&mut Self> {
        self.push_column(Column::categorical(name, values))?;
        Ok(self)
    }

    /// Add a datetime feature column from epoch values
    pub fn add_datetime(&mut self, name: impl Into<String>, epochs: &[i64]) -> Result<&mut Self> {
        self.push_column(Column::datetime(name, epochs))?;
        Ok(self)
    }

    /// Add a prebuilt column
    pub fn push_column(&mut self, column: Column) -> Result<()> {
        if column.len() != self.target.len() {
            return Err(SelectionError::ShapeError {
                expected: format!("{} rows", self.target.len()),
                actual: format!("{} rows in column '{}'", column.len(), column.name()),
            });
        }
        if column.name() == self.target_name {
            return Err(SelectionError::ConfigError(format!(
                "feature '{}' clashes with the target name",
                column.name()
            )));
        }
        if self.positions.contains_key(column.name()) {
            return Err(SelectionError::ConfigError(format!(
                "duplicate column '{}'",
                column.name()
            )));
        }
        self.positions.insert(column.name().to_string(), self.columns.len());
        self.columns.push(column);
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.target.len()
    }

    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    /// Feature names in column order
    pub fn feature_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// Position of a feature in column order
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.positions
            .get(name)
            .map(|&idx| &self.columns[idx])
            .ok_or_else(|| SelectionError::FeatureNotFound(name.to_string()))
    }

    pub fn target(&self) -> &Array1<f64> {
        &self.target
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Extract named columns into a row-major matrix
    pub fn matrix(&self, names: &[String]) -> Result<Array2<f64>> {
        let cols = self.column_refs(names)?;
        Ok(Array2::from_shape_fn((self.n_rows(), cols.len()), |(r, c)| {
            cols[c].values[r]
        }))
    }

    /// Extract named columns restricted to the given rows
    pub fn matrix_rows(&self, names: &[String], rows: &[usize]) -> Result<Array2<f64>> {
        let cols = self.column_refs(names)?;
        if let Some(&bad) = rows.iter().find(|&&r| r >= self.n_rows()) {
            return Err(SelectionError::ShapeError {
                expected: format!("row index < {}", self.n_rows()),
                actual: format!("row index {}", bad),
            });
        }
        Ok(Array2::from_shape_fn((rows.len(), cols.len()), |(r, c)| {
            cols[c].values[rows[r]]
        }))
    }

    /// Target values restricted to the given rows
    pub fn target_rows(&self, rows: &[usize]) -> Array1<f64> {
        rows.iter().map(|&r| self.target[r]).collect()
    }

    /// Copy of this dataset with extra columns appended
    pub fn with_columns(&self, extra: Vec<Column>) -> Result<Dataset> {
        let mut augmented = self.clone();
        for column in extra {
            augmented.push_column(column)?;
        }
        Ok(augmented)
    }

    /// Projection onto the named features, in the order given
    pub fn select(&self, names: &[String]) -> Result<Dataset> {
        let mut projected = Dataset::new(self.target_name.clone(), self.target.clone());
        for name in names {
            projected.push_column(self.column(name)?.clone())?;
        }
        Ok(projected)
    }

    fn column_refs(&self, names: &[String]) -> Result<Vec<&Column>> {
        names.iter().map(|name| self.column(name)).collect()
    }
}

fn series_to_f64(series: &Series) -> Result<Vec<f64>> {
    let name = series.name().to_string();
    let as_f64 = series.cast(&DataType::Float64)?;
    as_f64
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| match v {
            Some(v) if v.is_finite() => Ok(v),
            Some(_) => Err(SelectionError::DataError(format!(
                "column '{}' has a non-finite value at row {}",
                name, row
            ))),
            None => Err(missing_value(&name, row)),
        })
        .collect()
}

fn missing_value(column: &str, row: usize) -> SelectionError {
    SelectionError::DataError(format!("column '{}' has a missing value at row {}", column, row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use polars::df;

    fn toy() -> Dataset {
        let mut ds = Dataset::new("y", array![1.0, 2.0, 3.0, 4.0]);
        ds.add_numeric("a", vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        ds.add_categorical("city", &["x", "y", "x", "z"]).unwrap();
        ds.add_datetime("ts", &[10, 20, 30, 40]).unwrap();
        ds
    }

    #[test]
    fn test_column_types_fixed_at_build() {
        let ds = toy();
        assert_eq!(ds.column("a").unwrap().dtype(), ColumnType::Numeric);
        assert_eq!(ds.column("city").unwrap().dtype(), ColumnType::Categorical);
        assert_eq!(ds.column("ts").unwrap().dtype(), ColumnType::DateTime);
        assert_eq!(ds.feature_names(), vec!["a", "city", "ts"]);
    }

    #[test]
    fn test_categorical_codes_follow_first_appearance() {
        let ds = toy();
        let city = ds.column("city").unwrap();
        assert_eq!(city.values().to_vec(), vec![0.0, 1.0, 0.0, 2.0]);
        assert_eq!(city.levels().unwrap(), &["x", "y", "z"]);
    }

    #[test]
    fn test_matrix_rows() {
        let ds = toy();
        let m = ds
            .matrix_rows(&["ts".to_string(), "a".to_string()], &[3, 1])
            .unwrap();
        assert_eq!(m, array![[40.0, 4.0], [20.0, 2.0]]);
        assert_eq!(ds.target_rows(&[3, 1]).to_vec(), vec![4.0, 2.0]);
    }

    #[test]
    fn test_rejects_bad_columns() {
        let mut ds = toy();
        assert!(ds.add_numeric("short", vec![1.0]).is_err());
        assert!(ds.add_numeric("a", vec![1.0; 4]).is_err());
        assert!(ds.add_numeric("y", vec![1.0; 4]).is_err());
        assert!(ds.add_numeric("nan", vec![1.0, f64::NAN, 1.0, 1.0]).is_err());
    }

    #[test]
    fn test_from_dataframe() {
        let df = df!(
            "age" => &[25i64, 30, 35, 40],
            "city" => &["a", "b", "a", "b"],
            "target" => &[0.0, 1.0, 0.0, 1.0],
        )
        .unwrap();
        let ds = Dataset::from_dataframe(&df, "target").unwrap();
        assert_eq!(ds.n_rows(), 4);
        assert_eq!(ds.feature_names(), vec!["age", "city"]);
        assert_eq!(ds.column("age").unwrap().dtype(), ColumnType::Numeric);
        assert_eq!(ds.column("city").unwrap().dtype(), ColumnType::Categorical);
        assert_eq!(ds.target().to_vec(), vec![0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_from_dataframe_missing_target() {
        let df = df!("a" => &[1.0, 2.0]).unwrap();
        let err = Dataset::from_dataframe(&df, "target").unwrap_err();
        assert!(matches!(err, SelectionError::FeatureNotFound(_)));
    }
}
