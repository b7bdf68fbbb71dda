//! Hint Tests
//!
//! Deferred join and partition hints: where they attach, how their targets
//! resolve and when they are dropped.

mod common;

use common::*;
use polyglot_dataframe::expressions::{Expression, HintExpression};
use polyglot_dataframe::functions::{col, lit};

/// Join hints attached to the finalized root as `(name, targets)`.
fn join_hints(expr: &Expression) -> Vec<(String, Vec<String>)> {
    let Some(hint) = expr.as_select().and_then(|s| s.hint.as_ref()) else {
        return Vec::new();
    };
    hint.expressions
        .iter()
        .filter_map(|h| match h {
            HintExpression::Join(j) => Some((
                j.name.clone(),
                j.targets.iter().map(|t| t.name.clone()).collect(),
            )),
            HintExpression::Partition(_) => None,
        })
        .collect()
}

fn joined_relation(expr: &Expression) -> String {
    expr.as_select().unwrap().joins[0].this.alias_or_name().to_string()
}

// ============================================================================
// Join hints
// ============================================================================

mod join_hints {
    use super::*;

    #[test]
    fn test_hint_on_right_plan_targets_joined_cte() {
        let session = raw_session();
        let employee = session.table("employee").unwrap();
        let store = session.table("store").unwrap().hint("broadcast", &[]).unwrap();
        let joined = employee.join(&store, "store_id", "inner").unwrap();
        let expr = joined.finalized_expression(false).unwrap();
        let right = joined_relation(&expr);
        assert_eq!(join_hints(&expr), vec![("BROADCAST".to_string(), vec![right.clone()])]);
        assert!(joined.sql().unwrap().contains(&format!("SELECT /*+ BROADCAST({}) */", right)));
    }

    #[test]
    fn test_hint_by_alias_after_join() {
        let session = raw_session();
        let e = session.table("employee").unwrap().alias("e").unwrap();
        let s = session.table("store").unwrap().alias("s").unwrap();
        let joined = e
            .join(&s, "store_id", "inner")
            .unwrap()
            .hint("shuffle_hash", &["s"])
            .unwrap();
        let expr = joined.finalized_expression(false).unwrap();
        let right = joined_relation(&expr);
        assert_eq!(join_hints(&expr), vec![("SHUFFLE_HASH".to_string(), vec![right])]);
    }

    #[test]
    fn test_alias_retargets_pending_hint() {
        let session = raw_session();
        let e = session.table("employee").unwrap();
        let s = session
            .table("store")
            .unwrap()
            .hint("merge", &[])
            .unwrap()
            .alias("s")
            .unwrap();
        let expr = e
            .join(&s, "store_id", "left")
            .unwrap()
            .finalized_expression(false)
            .unwrap();
        let right = joined_relation(&expr);
        assert_eq!(join_hints(&expr), vec![("MERGE".to_string(), vec![right])]);
    }

    #[test]
    fn test_shared_alias_targets_most_recent_joined_cte() {
        let session = raw_session();
        let older = session.table("store").unwrap().alias("s").unwrap();
        let newer = session
            .table("store")
            .unwrap()
            .where_(col("num_sales").gt(lit(5)))
            .unwrap()
            .alias("s")
            .unwrap();
        let expr = older
            .join(&newer, "store_id", "inner")
            .unwrap()
            .hint("broadcast", &["s"])
            .unwrap()
            .finalized_expression(false)
            .unwrap();
        let right = joined_relation(&expr);
        let left = expr.as_select().unwrap().from_relation_name().unwrap().to_string();
        assert_ne!(left, right);
        assert_eq!(join_hints(&expr), vec![("BROADCAST".to_string(), vec![right])]);
    }

    #[test]
    fn test_shared_alias_skips_unjoined_plan() {
        let session = raw_session();
        let employee = session.table("employee").unwrap();
        let _elsewhere = session.table("store").unwrap().alias("s").unwrap();
        let joined_store = session
            .table("store")
            .unwrap()
            .where_(col("num_sales").gt(lit(5)))
            .unwrap()
            .alias("s")
            .unwrap();
        let expr = employee
            .join(&joined_store, "store_id", "inner")
            .unwrap()
            .hint("broadcast", &["s"])
            .unwrap()
            .finalized_expression(false)
            .unwrap();
        let right = joined_relation(&expr);
        assert_eq!(join_hints(&expr), vec![("BROADCAST".to_string(), vec![right])]);
    }

    #[test]
    fn test_unjoined_alias_is_dropped() {
        let session = session();
        let _unused = session.table("store").unwrap().alias("elsewhere").unwrap();
        let e = session.table("employee").unwrap();
        let s = session.table("store").unwrap();
        let joined = e.join(&s, "store_id", "inner").unwrap();
        let hinted = joined.hint("broadcast", &["elsewhere"]).unwrap();
        assert_eq!(hinted.columns(), joined.columns());
        let expr = hinted.finalized_expression(true).unwrap();
        assert!(join_hints(&expr).is_empty());
        assert!(!hinted.sql().unwrap().contains("/*+"));
        assert_eq!(hinted.sql().unwrap(), joined.sql().unwrap());
    }

    #[test]
    fn test_unknown_target_is_dropped() {
        let session = session();
        let e = session.table("employee").unwrap();
        let s = session.table("store").unwrap();
        let joined = e.join(&s, "store_id", "inner").unwrap();
        let hinted = joined.hint("broadcast", &["nobody"]).unwrap();
        assert_eq!(hinted.sql().unwrap(), joined.sql().unwrap());
    }

    #[test]
    fn test_hint_without_join_is_dropped_at_render() {
        let session = raw_session();
        let df = session.table("employee").unwrap().hint("broadcast", &[]).unwrap();
        assert_eq!(df.pending_hints().len(), 1);
        assert!(!df.sql().unwrap().contains("/*+"));
    }
}

// ============================================================================
// Partition hints
// ============================================================================

mod partition_hints {
    use super::*;

    #[test]
    fn test_repartition() {
        let session = raw_session();
        let df = session
            .table("employee")
            .unwrap()
            .repartition(4, &["store_id"])
            .unwrap();
        let sql = df.sql().unwrap();
        assert!(sql.contains("SELECT /*+ REPARTITION(4, store_id) */ employee_id"), "{}", sql);
    }

    #[test]
    fn test_coalesce_and_generic_hint() {
        let session = raw_session();
        let df = session
            .table("employee")
            .unwrap()
            .coalesce(2)
            .unwrap()
            .hint("repartition_by_range", &["3", "age"])
            .unwrap();
        let sql = df.sql().unwrap();
        assert!(sql.contains("/*+ COALESCE(2), REPARTITION_BY_RANGE(3, age) */"), "{}", sql);
    }

    #[test]
    fn test_hint_attaches_before_materialization() {
        let session = raw_session();
        let df = session
            .table("employee")
            .unwrap()
            .repartition(8, &[])
            .unwrap()
            .select(["age"])
            .unwrap()
            .select(["age"])
            .unwrap();
        assert!(df.pending_hints().is_empty());
        let sql = df.sql().unwrap();
        assert_eq!(sql.matches("REPARTITION(8)").count(), 1, "{}", sql);
        assert!(sql.contains("AS (SELECT /*+ REPARTITION(8) */ age FROM "), "{}", sql);
    }

    #[test]
    fn test_unknown_hint_column() {
        let session = session();
        let df = session.table("employee").unwrap();
        assert!(df.repartition(2, &["salary"]).unwrap_err().is_validation());
    }

    #[test]
    fn test_dialect_without_hints() {
        let session = raw_session();
        let df = session.table("employee").unwrap().coalesce(1).unwrap();
        assert!(df.sql().unwrap().contains("/*+ COALESCE(1) */"));
        assert!(!df.sql_with("duckdb", false).unwrap().contains("/*+"));
    }
}
