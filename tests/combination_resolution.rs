//! Combination Resolution Tests
//!
//! A requested dimension set resolves to exactly one registered
//! combination, or fails closed.

use std::collections::BTreeSet;

use exprcall::combination::{
    Binding, CombinationRegistry, ConditionDimensionCombination, ANATOMY, ANATOMY_STAGE,
};
use exprcall::config::PlannerConfig;
use exprcall::filter::{FilterGroup, FilterSet};
use exprcall::model::{dimensions, ConditionDimension::*};
use exprcall::planner::{CallQuery, PlannerErrorCode, PropagationPlanner};

/// {anatomy} and {anatomy, stage} resolve to their own combinations.
#[test]
fn test_reference_combinations_resolve() {
    let registry = CombinationRegistry::reference();
    assert_eq!(registry.len(), 2);

    let anat = registry.resolve(&dimensions([Anatomy])).unwrap();
    assert_eq!(anat.name(), ANATOMY);
    assert_eq!(anat.binding().raw_call_table, "anat_entity_expression");

    let anat_stage = registry.resolve(&dimensions([Stage, Anatomy])).unwrap();
    assert_eq!(anat_stage.name(), ANATOMY_STAGE);
    assert!(anat_stage.covers(Stage));
}

/// Unregistered sets are rejected, never widened to a covering set.
#[test]
fn test_unregistered_sets_are_rejected() {
    let registry = CombinationRegistry::reference();
    for dims in [
        dimensions([Sex]),
        dimensions([Stage]),
        dimensions([Anatomy, Stage, Sex]),
        BTreeSet::new(),
    ] {
        let err = registry.resolve(&dims).unwrap_err();
        assert_eq!(err.code(), PlannerErrorCode::UnsupportedCombination);
    }
}

/// The planner surfaces the rejection for {sex}.
#[test]
fn test_planner_rejects_sex_dimension() {
    let registry = CombinationRegistry::reference();
    let config = PlannerConfig::default();
    let filters = FilterSet::single(FilterGroup::new().with_gene_ids([1])).unwrap();

    let err = PropagationPlanner::new(&registry, &config)
        .plan(&CallQuery::new(filters, [Sex]))
        .unwrap_err();
    assert_eq!(err.code(), PlannerErrorCode::UnsupportedCombination);
    assert_eq!(err.code().code(), "EXPR_UNSUPPORTED_COMBINATION");
}

/// Registering an already registered set fails and leaves resolution as is.
#[test]
fn test_duplicate_registration_is_rejected() {
    let mut registry = CombinationRegistry::reference();
    let duplicate = ConditionDimensionCombination::new(
        "anatomy_again",
        [Anatomy],
        Binding {
            condition_table: "t_cond",
            raw_call_table: "t_expr",
            global_call_table: "t_global",
            link_table: "t_link",
        },
    );

    assert!(registry.register(duplicate).is_err());
    assert_eq!(registry.resolve(&dimensions([Anatomy])).unwrap().name(), ANATOMY);
}
