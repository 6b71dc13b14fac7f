//! 表达式求值器性能基准测试
//!
//! 针对受限解释器和公式链的细粒度性能测试。

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use form_logic::expression::{self, EngineLimits};
use form_logic::{Formula, FormulaEngine};
use serde_json::{Map, Value, json};
use std::hint::black_box;

/// 单条表达式：解析 + 白名单检查 + 求值
fn bench_expressions(c: &mut Criterion) {
    let mut group = c.benchmark_group("expression");
    let limits = EngineLimits::default();

    let cases = [
        ("literal", "42"),
        ("arithmetic", "3 * 9.5 + 12 / 4 - 2 ** 3"),
        ("comparison", "1 < 2 <= 3 != 4"),
        ("builtins", "round(max(5, 28.5 * 0.05) + min(3, 4, 5) + abs(-2), 2)"),
        ("rejected", "__import__('os').system('ls')"),
    ];

    for (name, source) in cases {
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, source| {
            b.iter(|| expression::evaluate(black_box(source), &limits))
        });
    }

    group.finish();
}

fn chain(length: usize) -> Vec<Formula> {
    let mut formulas = vec![Formula::new("step_0", "{{seed}} * 1.5")];
    for i in 1..length {
        formulas.push(Formula::new(
            format!("step_{}", i),
            format!("round({{{{step_{}}}}} * 1.01 + {{{{seed}}}}, 2)", i - 1),
        ));
    }
    formulas
}

/// 公式链：每条公式引用上一条的结果
fn bench_formula_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("formula_chain");
    let engine = FormulaEngine::new();
    let data: Map<String, Value> = json!({ "seed": 10 })
        .as_object()
        .cloned()
        .unwrap_or_default();

    for length in [1usize, 10, 50] {
        let formulas = chain(length);
        group.bench_with_input(BenchmarkId::from_parameter(length), &formulas, |b, formulas| {
            b.iter(|| engine.process(black_box(formulas), black_box(&data)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_expressions, bench_formula_chain);
criterion_main!(benches);
