//! Null Handling Tests
//!
//! `dropna`, `fillna` and `replace`, reached directly and through `na()`.

mod common;

use common::*;
use polyglot_dataframe::functions::{col, lit};
use polyglot_dataframe::{DropHow, FillValue, Replacement, Value};

const EMPLOYEE_COLUMNS: [&str; 5] = ["employee_id", "fname", "lname", "age", "store_id"];

// ============================================================================
// dropna
// ============================================================================

mod dropna {
    use super::*;

    #[test]
    fn test_any_drops_rows_with_one_null() {
        let session = raw_session();
        let df = session
            .table("employee")
            .unwrap()
            .dropna(DropHow::Any, None, Some(&["fname", "age"]))
            .unwrap();
        assert_eq!(df.columns(), EMPLOYEE_COLUMNS.to_vec());
        let sql = df.sql().unwrap();
        assert!(sql.contains("CASE WHEN fname IS NULL THEN 1 ELSE 0 END"), "{}", sql);
        assert!(sql.contains("CASE WHEN age IS NULL THEN 1 ELSE 0 END"), "{}", sql);
        assert!(!sql.contains("lname IS NULL"), "{}", sql);
        assert!(sql.ends_with("WHERE num_nulls < 1"), "{}", sql);
    }

    #[test]
    fn test_all_drops_only_fully_null_rows() {
        let session = raw_session();
        let df = session
            .table("employee")
            .unwrap()
            .na()
            .drop(DropHow::All, None, Some(&["fname", "age"]))
            .unwrap();
        assert!(df.sql().unwrap().ends_with("WHERE num_nulls < 2"));
    }

    #[test]
    fn test_thresh_overrides_how() {
        let session = raw_session();
        let df = session
            .table("employee")
            .unwrap()
            .dropna(DropHow::All, Some(2), Some(&["fname", "lname", "age"]))
            .unwrap();
        assert!(df.sql().unwrap().ends_with("WHERE num_nulls < 2"));
    }

    #[test]
    fn test_helper_column_never_projected() {
        let session = session();
        let df = session
            .table("employee")
            .unwrap()
            .dropna(DropHow::Any, None, None)
            .unwrap();
        assert!(!df.columns().iter().any(|c| c.starts_with("num_nulls")));
        let outer = df.finalized_expression(true).unwrap();
        let projected = outer.as_select().unwrap().expressions.len();
        assert_eq!(projected, EMPLOYEE_COLUMNS.len());
    }

    #[test]
    fn test_after_filter() {
        let session = session();
        let df = session
            .table("employee")
            .unwrap()
            .where_(col("age").gt(lit(18)))
            .unwrap()
            .select(["fname", "age"])
            .unwrap()
            .dropna(DropHow::Any, None, None)
            .unwrap();
        assert_eq!(df.columns(), vec!["fname", "age"]);
    }

    #[test]
    fn test_wildcard_rejected() {
        let session = session();
        let df = session.table("employee").unwrap().select(["*"]).unwrap();
        assert!(df.dropna(DropHow::Any, None, None).unwrap_err().is_validation());
    }

    #[test]
    fn test_threshold_above_size_rejected() {
        let session = session();
        let df = session.table("employee").unwrap();
        assert!(df.dropna(DropHow::Any, Some(0), Some(&["age"])).unwrap_err().is_policy());
        assert!(DropHow::from_name("most").unwrap_err().is_policy());
    }

    #[test]
    fn test_unknown_subset_column() {
        let session = session();
        let df = session.table("employee").unwrap();
        assert!(df.dropna(DropHow::Any, None, Some(&["salary"])).unwrap_err().is_validation());
    }
}

// ============================================================================
// fillna
// ============================================================================

mod fillna {
    use super::*;

    #[test]
    fn test_map_touches_only_named_column() {
        let session = raw_session();
        let df = session
            .table("employee")
            .unwrap()
            .fillna(FillValue::map([("age", 0)]), None)
            .unwrap();
        assert_eq!(df.columns(), EMPLOYEE_COLUMNS.to_vec());
        let sql = df.sql().unwrap();
        assert!(sql.contains("CASE WHEN age IS NULL THEN 0 ELSE age END AS age"), "{}", sql);
        assert_eq!(sql.matches("IS NULL").count(), 1, "{}", sql);
    }

    #[test]
    fn test_scalar_with_subset() {
        let session = raw_session();
        let df = session
            .table("employee")
            .unwrap()
            .na()
            .fill("unknown", Some(&["fname", "lname"]))
            .unwrap();
        let sql = df.sql().unwrap();
        assert!(sql.contains("CASE WHEN fname IS NULL THEN 'unknown' ELSE fname END AS fname"));
        assert!(sql.contains("CASE WHEN lname IS NULL THEN 'unknown' ELSE lname END AS lname"));
        assert!(!sql.contains("age IS NULL"));
    }

    #[test]
    fn test_mismatched_type_is_cast() {
        let session = raw_session();
        let df = session
            .table("employee")
            .unwrap()
            .fillna(FillValue::map([("age", "0")]), None)
            .unwrap();
        let sql = df.sql().unwrap();
        assert!(sql.contains("THEN CAST('0' AS INT) ELSE age END AS age"), "{}", sql);
    }

    #[test]
    fn test_nan_fill_renders_as_cast() {
        let session = raw_session();
        let df = session
            .table("employee")
            .unwrap()
            .fillna(f64::NAN, Some(&["age"]))
            .unwrap();
        let sql = df.sql().unwrap();
        assert!(
            sql.contains("CASE WHEN age IS NULL THEN CAST('NaN' AS DOUBLE) ELSE age END AS age"),
            "{}",
            sql
        );
    }

    #[test]
    fn test_null_fill_rejected() {
        let session = session();
        let df = session.table("employee").unwrap();
        assert!(df.fillna(Value::Null, None).unwrap_err().is_policy());
    }
}

// ============================================================================
// replace
// ============================================================================

mod replace {
    use super::*;

    #[test]
    fn test_pairs_build_case_chain() {
        let session = raw_session();
        let df = session
            .table("store")
            .unwrap()
            .replace(
                Replacement::Map(vec![
                    (Value::from(1), Value::from(10)),
                    (Value::from(2), Value::from(20)),
                ]),
                Some(&["district_id"]),
            )
            .unwrap();
        let sql = df.sql().unwrap();
        assert!(
            sql.contains(
                "CASE WHEN district_id = 1 THEN 10 WHEN district_id = 2 THEN 20 ELSE district_id END AS district_id"
            ),
            "{}",
            sql
        );
        assert_eq!(
            df.columns(),
            vec!["store_id", "store_name", "district_id", "num_sales"]
        );
    }

    #[test]
    fn test_list_to_single_value() {
        let session = raw_session();
        let df = session
            .table("employee")
            .unwrap()
            .replace(
                Replacement::ListToValue(vec![Value::from("n/a"), Value::from("")], Value::Null),
                Some(&["lname"]),
            )
            .unwrap();
        let sql = df.sql().unwrap();
        assert!(sql.contains("WHEN lname = 'n/a' THEN NULL WHEN lname = '' THEN NULL"), "{}", sql);
    }

    #[test]
    fn test_list_length_mismatch() {
        let session = session();
        let df = session.table("employee").unwrap();
        let err = df
            .replace(
                Replacement::Lists(vec![Value::from(1)], vec![Value::from(2), Value::from(3)]),
                None,
            )
            .unwrap_err();
        assert!(err.is_policy());
    }
}
