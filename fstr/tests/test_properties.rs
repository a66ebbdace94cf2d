use fstr::{context, Environment};
use proptest::prelude::*;

proptest! {
    /// Compiling arbitrary input never panics.
    #[test]
    fn compile_never_panics(source in "\\PC{0,40}") {
        let env = Environment::new();
        let _ = env.template(&source);
    }

    /// Text without braces is copied verbatim.
    #[test]
    fn literal_text_round_trips(text in "[^{}]{0,60}") {
        let env = Environment::new();
        let rv = env.render_str(&text, ()).unwrap();
        prop_assert_eq!(rv, text);
    }

    /// Doubled braces collapse to single braces.
    #[test]
    fn escaped_braces_round_trip(text in "[a-z{} ]{0,40}") {
        let escaped = text.replace('{', "{{").replace('}', "}}");
        let env = Environment::new();
        prop_assert_eq!(env.render_str(&escaped, ()).unwrap(), text);
    }

    /// Rendering twice with the same context gives the same result.
    #[test]
    fn rendering_is_deterministic(a in any::<i64>(), b in "[a-z]{0,10}") {
        let env = Environment::new();
        let tmpl = env.template("{a} {b!r} {a:>30,}").unwrap();
        let first = tmpl.render(context!(a, b => b.clone())).unwrap();
        let second = tmpl.render(context!(a, b)).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Call-time values shadow captured values.
    #[test]
    fn call_time_shadows_captured(captured in any::<i64>(), call in any::<i64>()) {
        let env = Environment::new();
        let tmpl = env.template_with_context("{x}", context!(x => captured)).unwrap();
        prop_assert_eq!(tmpl.render(()).unwrap(), captured.to_string());
        prop_assert_eq!(tmpl.render(context!(x => call)).unwrap(), call.to_string());
    }

    /// Dynamic widths behave like static widths.
    #[test]
    fn dynamic_width_matches_static(x in any::<i64>(), width in 0usize..40) {
        let env = Environment::new();
        let dynamic = env.render_str("{x:{width}}", context!(x, width)).unwrap();
        let fixed = env.render_str(&format!("{{x:{width}}}"), context!(x)).unwrap();
        prop_assert_eq!(&dynamic, &fixed);
        prop_assert_eq!(dynamic, format!("{x:>width$}"));
    }
}
