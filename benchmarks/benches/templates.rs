use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fstr::machinery::{scan, split_specifier, Chunk};
use fstr::{context, Environment, Value};

const REPORT: &str = include_str!("../inputs/report.txt");

fn do_scan() {
    for chunk in scan(black_box(REPORT), false).unwrap() {
        if let Chunk::Region(range) = chunk {
            black_box(split_specifier(&REPORT[range]));
        }
    }
}

fn do_compile(env: &Environment) {
    env.template(black_box(REPORT)).unwrap();
}

fn report_context() -> Value {
    context! {
        user => context! {
            name => "Anna",
            tags => vec!["ops", "admin", "billing"],
        },
        year => 2024,
        width => 12,
        precision => 2,
        items => vec![
            context! { name => "widget", qty => 4, price => 2.5 },
            context! { name => "gadget", qty => 10, price => 12.75 },
            context! { name => "doohickey", qty => 1, price => 99.0 },
        ],
    }
}

fn do_render(env: &Environment, ctx: &Value) {
    let tmpl = env.template(REPORT).unwrap();
    tmpl.render(ctx).unwrap();
}

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("scan", |b| b.iter(do_scan));
    c.bench_function("compile", |b| {
        let env = Environment::new();
        b.iter(|| do_compile(&env));
    });
    c.bench_function("render", |b| {
        let env = Environment::new();
        let tmpl = env.template(REPORT).unwrap();
        let ctx = report_context();
        b.iter(|| tmpl.render(black_box(&ctx)).unwrap());
    });
    c.bench_function("compile_and_render", |b| {
        let env = Environment::new();
        let ctx = report_context();
        b.iter(|| do_render(&env, &ctx));
    });
    c.bench_function("render_json_context", |b| {
        let env = Environment::new();
        let tmpl = env.template("{name!r:>12} owes {amount:,.2f} since {since}").unwrap();
        let ctx: serde_json::Value = serde_json::json!({
            "name": "Bob",
            "amount": 1234567.891,
            "since": "2023-01-01",
        });
        b.iter(|| tmpl.render(black_box(&ctx)).unwrap());
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
