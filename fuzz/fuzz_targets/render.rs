#![no_main]
use std::collections::BTreeMap;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use serde::Serialize;

#[derive(Debug, Serialize, Arbitrary)]
enum Value {
    None,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

fuzz_target!(|data: (&str, BTreeMap<String, Value>, BTreeMap<String, Value>)| {
    let (source, captured, ctx) = data;

    let env = fstr::Environment::new();
    let tmpl = match env.template_with_context(source, &captured) {
        Ok(tmpl) => tmpl,
        Err(_) => return,
    };
    tmpl.render(&ctx).ok();
});
