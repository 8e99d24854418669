//! Optimized and unoptimized plans must produce the same rows

use qv_backend::test_utils::run;
use qv_backend::{compile, Executor, MemoryBackend, ResultSet, Row};
use qv_core::ScalarValue;
use qv_plan::test_utils::{call, int_schema, int_source, lit, registry, score_reference};
use qv_plan::{
    AggregateFunc, Expr, FunctionRegistry, JoinKind, Optimizer, Rel, SortKey, WindowFrame,
    WindowFunc,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn init_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

fn random_rows(rng: &mut StdRng, width: usize, count: usize) -> Vec<Row> {
    (0..count)
        .map(|_| {
            (0..width)
                .map(|_| ScalarValue::Integer(rng.gen_range(-20..40)))
                .collect()
        })
        .collect()
}

fn random_backend(seed: u64) -> MemoryBackend {
    let mut rng = StdRng::seed_from_u64(seed);
    let backend = MemoryBackend::new();
    backend
        .register_table("t", int_schema(&["a", "b", "c", "d"]), random_rows(&mut rng, 4, 60))
        .unwrap();
    backend
        .register_table("u", int_schema(&["a", "e"]), random_rows(&mut rng, 2, 25))
        .unwrap();
    backend
}

fn scored(registry: &FunctionRegistry, base: &Rel) -> Rel {
    base.project(vec![
        ("a", base.col("a").unwrap()),
        (
            "s",
            call(
                registry,
                "score",
                vec![base.col("a").unwrap(), base.col("b").unwrap(), base.col("c").unwrap()],
            ),
        ),
    ])
    .unwrap()
}

/// Plans exercising every rewrite rule and every operator
fn plans() -> Vec<(&'static str, Rel)> {
    let registry = registry();
    let t = int_source("t", &["a", "b", "c", "d"]);
    let u = int_source("u", &["a", "e"]);

    let s = scored(&registry, &t);
    let pushdown = s
        .filter(vec![call(&registry, "lt", vec![s.col("a").unwrap(), lit(10)])])
        .unwrap();

    let stacked = t
        .filter(vec![call(&registry, "gt", vec![t.col("b").unwrap(), lit(0)])])
        .unwrap();
    let stacked = stacked
        .filter(vec![call(
            &registry,
            "lt",
            vec![stacked.col("c").unwrap(), call(&registry, "add", vec![lit(5), lit(10)])],
        )])
        .unwrap();
    let stacked = stacked
        .project(vec![("d", stacked.col("d").unwrap())])
        .unwrap();

    let joined = t
        .join(
            &u,
            JoinKind::Left,
            vec![call(&registry, "eq", vec![t.col("a").unwrap(), u.col("a").unwrap()])],
        )
        .unwrap();
    let join_plan = joined
        .filter(vec![call(&registry, "gt", vec![joined.col("b").unwrap(), lit(0)])])
        .unwrap()
        .project(vec![("e", joined.col("e").unwrap())])
        .unwrap();

    let total = Expr::aggregate(AggregateFunc::Sum, vec![t.col("b").unwrap()], false).unwrap();
    let count = Expr::aggregate(AggregateFunc::CountStar, vec![], false).unwrap();
    let grouped = t
        .filter(vec![call(
            &registry,
            "gt",
            vec![t.col("d").unwrap(), call(&registry, "multiply", vec![lit(2), lit(3)])],
        )])
        .unwrap()
        .aggregate(
            vec![("a", t.col("a").unwrap())],
            vec![("total", total), ("n", count)],
        )
        .unwrap();
    let agg_plan = grouped
        .sort(vec![SortKey::asc(grouped.col("a").unwrap())])
        .unwrap()
        .limit(Some(5), 1)
        .unwrap()
        .project(vec![("a", grouped.col("a").unwrap())])
        .unwrap();

    let rank = Expr::window(
        WindowFunc::Rank,
        vec![],
        vec![t.col("a").unwrap()],
        vec![SortKey::asc(t.col("b").unwrap())],
        WindowFrame::default_for(true),
    )
    .unwrap();
    let ranked = t
        .project(vec![("a", t.col("a").unwrap()), ("r", rank), ("c", t.col("c").unwrap())])
        .unwrap();
    let window_plan = ranked
        .filter(vec![call(&registry, "eq", vec![ranked.col("r").unwrap(), lit(1)])])
        .unwrap()
        .project(vec![("a", ranked.col("a").unwrap())])
        .unwrap();

    let left = t.project(vec![("a", t.col("a").unwrap())]).unwrap();
    let right = u.project(vec![("a", u.col("a").unwrap())]).unwrap();
    let set_plan = left.difference(&right, true).unwrap();

    vec![
        ("pushdown", pushdown),
        ("stacked filters", stacked),
        ("join", join_plan),
        ("aggregate", agg_plan),
        ("window", window_plan),
        ("set operation", set_plan),
    ]
}

async fn assert_equivalent(backend: &MemoryBackend, name: &str, plan: &Rel) -> ResultSet {
    let optimized = Optimizer::with_defaults().optimize(plan);
    assert_eq!(
        optimized.schema().column_names(),
        plan.schema().column_names(),
        "{name}: output columns changed"
    );
    let expected = run(backend, plan).await;
    let actual = run(backend, &optimized).await;
    assert_eq!(
        actual.sorted_rows(),
        expected.sorted_rows(),
        "{name}: optimized plan diverged"
    );
    expected
}

// ── Whole-plan equivalence ─────────────────────────────────────────

#[tokio::test]
async fn test_optimized_plans_match_on_random_tables() {
    init_logging();
    for seed in [1, 2, 3] {
        let backend = random_backend(seed);
        for (name, plan) in plans() {
            assert_equivalent(&backend, name, &plan).await;
        }
    }
}

#[tokio::test]
async fn test_optimized_plan_compiles_with_fewer_or_equal_nodes() {
    let backend = random_backend(11);
    for (name, plan) in plans() {
        let optimized = Optimizer::with_defaults().optimize(&plan);
        let before = compile(&backend, &plan).unwrap();
        let after = compile(&backend, &optimized).unwrap();
        assert!(
            after.plan().source_names().len() <= before.plan().source_names().len(),
            "{name}: optimization added a source scan"
        );
        let rows = backend.execute(&after).await.unwrap();
        assert_eq!(rows.schema().len(), plan.schema().len());
    }
}

// ── UDF specialization ─────────────────────────────────────────────

#[tokio::test]
async fn test_specialized_score_matches_reference() {
    let registry = registry();
    let ops = ["lt", "lt_eq", "gt", "gt_eq", "eq"];
    let mut rng = StdRng::seed_from_u64(42);
    let backend = random_backend(5);
    let t = int_source("t", &["a", "b", "c", "d"]);

    for _ in 0..20 {
        let op = ops[rng.gen_range(0..ops.len())];
        let bound: i64 = rng.gen_range(-10..30);
        let s = scored(&registry, &t);
        let plan = s
            .filter(vec![call(&registry, op, vec![s.col("a").unwrap(), lit(bound)])])
            .unwrap();
        let result = assert_equivalent(&backend, op, &plan).await;

        let base = run(&backend, &t).await;
        let mut expected: Vec<Row> = base
            .rows()
            .iter()
            .filter_map(|r| {
                let [a, b, c, _] = [&r[0], &r[1], &r[2], &r[3]].map(|v| v.as_i64().unwrap());
                let keep = match op {
                    "lt" => a < bound,
                    "lt_eq" => a <= bound,
                    "gt" => a > bound,
                    "gt_eq" => a >= bound,
                    _ => a == bound,
                };
                keep.then(|| {
                    vec![
                        ScalarValue::Integer(a),
                        ScalarValue::Integer(score_reference(a, b, c)),
                    ]
                })
            })
            .collect();
        expected.sort_by(|x, y| qv_backend::result::compare_rows(x, y));
        assert_eq!(result.sorted_rows(), expected, "filter a {op} {bound}");
    }
}
