//! Resolution of the candidate variables a selector works on

use super::{ColumnType, Dataset};
use crate::error::{Result, SelectionError};
use std::collections::HashSet;

/// Resolve the candidate feature list for one fit call.
///
/// With no explicit list every column whose type is in `accepted` is used, in
/// column order. With an explicit list, names absent from the dataset are
/// dropped when `confirm_variables` is set and rejected otherwise; present
/// names of a non-accepted type are always rejected. At least two candidates
/// must remain.
pub fn resolve_variables(
    dataset: &Dataset,
    requested: Option<&[String]>,
    accepted: &[ColumnType],
    confirm_variables: bool,
) -> Result<Vec<String>> {
    let variables: Vec<String> = match requested {
        None => dataset
            .columns()
            .iter()
            .filter(|c| accepted.contains(&c.dtype()))
            .map(|c| c.name().to_string())
            .collect(),
        Some(names) => {
            let mut seen = HashSet::new();
            let mut resolved = Vec::with_capacity(names.len());
            for name in names {
                if !seen.insert(name.as_str()) {
                    return Err(SelectionError::ConfigError(format!(
                        "variable '{}' listed more than once",
                        name
                    )));
                }
                let column = match dataset.column(name) {
                    Ok(column) => column,
                    Err(_) if confirm_variables => continue,
                    Err(err) => return Err(err),
                };
                if !accepted.contains(&column.dtype()) {
                    return Err(SelectionError::ConfigError(format!(
                        "variable '{}' is {:?}, expected one of {:?}",
                        name,
                        column.dtype(),
                        accepted
                    )));
                }
                resolved.push(name.clone());
            }
            resolved
        }
    };

    if variables.len() < 2 {
        return Err(SelectionError::ConfigError(format!(
            "feature selection needs at least 2 candidate variables, found {}",
            variables.len()
        )));
    }

    Ok(variables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn dataset() -> Dataset {
        let mut ds = Dataset::new("y", array![0.0, 1.0, 0.0]);
        ds.add_numeric("a", vec![1.0, 2.0, 3.0]).unwrap();
        ds.add_categorical("c", &["x", "y", "x"]).unwrap();
        ds.add_numeric("b", vec![3.0, 2.0, 1.0]).unwrap();
        ds
    }

    #[test]
    fn test_default_picks_accepted_types_in_order() {
        let ds = dataset();
        let vars = resolve_variables(&ds, None, &[ColumnType::Numeric], false).unwrap();
        assert_eq!(vars, vec!["a", "b"]);

        let vars = resolve_variables(
            &ds,
            None,
            &[ColumnType::Numeric, ColumnType::Categorical],
            false,
        )
        .unwrap();
        assert_eq!(vars, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_missing_variable_with_and_without_confirm() {
        let ds = dataset();
        let requested = vec!["a".to_string(), "b".to_string(), "zz".to_string()];

        let err = resolve_variables(&ds, Some(&requested), &[ColumnType::Numeric], false);
        assert!(matches!(err, Err(SelectionError::FeatureNotFound(_))));

        let vars =
            resolve_variables(&ds, Some(&requested), &[ColumnType::Numeric], true).unwrap();
        assert_eq!(vars, vec!["a", "b"]);
    }

    #[test]
    fn test_wrong_type_rejected() {
        let ds = dataset();
        let requested = vec!["a".to_string(), "c".to_string()];
        let err = resolve_variables(&ds, Some(&requested), &[ColumnType::Numeric], true);
        assert!(matches!(err, Err(SelectionError::ConfigError(_))));
    }

    #[test]
    fn test_needs_two_variables() {
        let ds = dataset();
        let requested = vec!["a".to_string(), "missing".to_string()];
        let err = resolve_variables(&ds, Some(&requested), &[ColumnType::Numeric], true);
        assert!(matches!(err, Err(SelectionError::ConfigError(_))));
    }
}
