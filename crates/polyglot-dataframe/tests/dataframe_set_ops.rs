//! Set Operation Tests
//!
//! UNION / INTERSECT / EXCEPT between plans, including name-based unions
//! that reconcile differing column lists.

mod common;

use common::*;
use polyglot_dataframe::expressions::{Expression, SetOpKind};
use polyglot_dataframe::functions::{col, lit};

/// The set operation a plan's outer query reads from.
fn set_operation(expr: &Expression) -> &polyglot_dataframe::expressions::SetOperation {
    let from = expr.as_select().unwrap().from_relation_name().unwrap();
    let cte = expr.ctes().iter().find(|c| c.name() == from).unwrap();
    match &cte.this {
        Expression::SetOperation(op) => op.as_ref(),
        other => panic!("expected a set operation, got {}", other.sql()),
    }
}

// ============================================================================
// Positional set operations
// ============================================================================

mod positional {
    use super::*;

    #[test]
    fn test_union_keeps_duplicates() {
        let session = raw_session();
        let young = session.table("employee").unwrap().where_(col("age").lt(lit(30))).unwrap();
        let old = session.table("employee").unwrap().where_(col("age").gt(lit(60))).unwrap();
        let both = young.union(&old).unwrap();
        assert_eq!(both.columns(), young.columns());
        let op = set_operation(both.expression());
        assert_eq!(op.kind, SetOpKind::Union);
        assert!(!op.distinct);
        assert!(both.sql().unwrap().contains(" UNION ALL "));
    }

    #[test]
    fn test_intersect_variants() {
        let session = raw_session();
        let a = session.table("employee").unwrap().select(["store_id"]).unwrap();
        let b = session.table("store").unwrap().select(["store_id"]).unwrap();
        let distinct = a.intersect(&b).unwrap();
        assert!(set_operation(distinct.expression()).distinct);
        let all = a.intersect_all(&b).unwrap();
        assert!(!set_operation(all.expression()).distinct);
        let except = a.except_all(&b).unwrap();
        let op = set_operation(except.expression());
        assert_eq!(op.kind, SetOpKind::Except);
        assert!(!op.distinct);
        assert!(except.sql().unwrap().contains(" EXCEPT ALL "));
    }

    #[test]
    fn test_operands_carry_no_with_clause() {
        let session = raw_session();
        let a = session.table("employee").unwrap().select(["store_id"]).unwrap();
        let b = session.table("store").unwrap().select(["store_id"]).unwrap();
        let union = a.union(&b).unwrap();
        let op = set_operation(union.expression());
        assert!(op.left.ctes().is_empty());
        assert!(op.right.ctes().is_empty());
        let sql = union.sql().unwrap();
        assert_eq!(sql.matches("WITH ").count(), 1, "{}", sql);
    }

    #[test]
    fn test_chained_unions() {
        let session = session();
        let a = session.table("employee").unwrap().select(["store_id"]).unwrap();
        let b = session.table("store").unwrap().select(["store_id"]).unwrap();
        let c = session.table("store").unwrap().select(["district_id"]).unwrap();
        let chained = a.union(&b).unwrap().union(&c).unwrap();
        assert_eq!(chained.columns(), vec!["store_id"]);
        let rendered = chained.sql().unwrap();
        assert_eq!(rendered.matches("UNION ALL").count(), 2, "{}", rendered);
        assert_eq!(rendered, chained.sql().unwrap());
    }

    #[test]
    fn test_column_count_mismatch() {
        let session = session();
        let a = session.table("employee").unwrap().select(["store_id", "age"]).unwrap();
        let b = session.table("store").unwrap().select(["store_id"]).unwrap();
        assert!(a.union(&b).unwrap_err().is_validation());
    }
}

// ============================================================================
// Name-based union
// ============================================================================

mod by_name {
    use super::*;

    #[test]
    fn test_missing_columns_become_typed_nulls() {
        let session = raw_session();
        int_table(&session, "p1", &["a", "b"]);
        int_table(&session, "p2", &["b", "c"]);
        let p1 = session.table("p1").unwrap();
        let p2 = session.table("p2").unwrap();
        let union = p1.union_by_name(&p2, true).unwrap();
        assert_eq!(union.columns(), vec!["a", "b", "c"]);

        let sql = union.sql().unwrap();
        assert!(sql.contains("SELECT a, b, CAST(NULL AS INT) AS c FROM "), "{}", sql);
        assert!(sql.contains("SELECT CAST(NULL AS INT) AS a, b, c FROM "), "{}", sql);
        assert!(sql.contains(" UNION ALL "), "{}", sql);
    }

    #[test]
    fn test_same_names_reordered() {
        let session = raw_session();
        session.register_table("l", &[("x", "INT"), ("y", "STRING")]).unwrap();
        session.register_table("r", &[("y", "STRING"), ("x", "INT")]).unwrap();
        let l = session.table("l").unwrap();
        let r = session.table("r").unwrap();
        let union = l.union_by_name(&r, false).unwrap();
        assert_eq!(union.columns(), vec!["x", "y"]);
        let op = set_operation(union.expression());
        assert_eq!(op.right.as_select().unwrap().expressions[0].alias_or_name(), "x");
    }

    #[test]
    fn test_mismatch_without_allow_missing() {
        let session = session();
        int_table(&session, "p1", &["a", "b"]);
        int_table(&session, "p2", &["b", "c"]);
        let p1 = session.table("p1").unwrap();
        let p2 = session.table("p2").unwrap();
        assert!(p1.union_by_name(&p2, false).unwrap_err().is_validation());
    }

    #[test]
    fn test_wildcard_rejected() {
        let session = session();
        let star = session.table("employee").unwrap().select(["*"]).unwrap();
        let named = session.table("employee").unwrap();
        assert!(star.union_by_name(&named, true).unwrap_err().is_validation());
    }
}
