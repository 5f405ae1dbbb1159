//! Property-based tests for arithmetic, literal display and scoping.
//!
//! Tests the following properties:
//! - Arithmetic follows the usual precedence and IEEE-754 doubles
//! - Literals print back as written
//! - Block locals never leak into globals of the same name

mod common;

use common::run_ok;
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

/// Small integers keep every intermediate result exactly representable.
fn arb_small_int() -> impl Strategy<Value = i32> {
    -10_000i32..10_000i32
}

/// Finite, non-negative doubles: negative numbers are unary minus applied to a literal.
fn arb_literal_number() -> impl Strategy<Value = f64> {
    (0u32..1_000_000u32, 0u32..1_000u32).prop_map(|(whole, fraction)| whole as f64 + fraction as f64 / 1000.0)
}

fn arb_string_content() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 _.,!?]{0,24}"
}

fn arb_identifier() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,8}".prop_filter("must not be a keyword", |name| {
        !matches!(
            name.as_str(),
            "and" | "class" | "else" | "false" | "for" | "fun" | "if" | "nil" | "or" | "print" | "return"
                | "super" | "this" | "true" | "var" | "while"
        )
    })
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// `-a * b + c` groups as `((-a) * b) + c`.
    #[test]
    fn unary_factor_term_precedence(a in arb_small_int(), b in arb_small_int(), c in arb_small_int()) {
        let source = format!("print -{} * {} + {};", a.abs(), b.abs(), c.abs());
        let expected = -(a.abs() as f64) * (b.abs() as f64) + (c.abs() as f64);
        prop_assert_eq!(run_ok(&source), vec![format!("{}", expected)]);
    }

    /// Grouping overrides precedence.
    #[test]
    fn grouping_overrides_precedence(a in arb_small_int(), b in arb_small_int(), c in arb_small_int()) {
        let source = format!("print ({} - {}) * {};", a.abs(), b.abs(), c.abs());
        let expected = (a.abs() as f64 - b.abs() as f64) * c.abs() as f64;
        prop_assert_eq!(run_ok(&source), vec![format!("{}", expected)]);
    }

    #[test]
    fn comparisons_agree_with_host(a in arb_small_int(), b in arb_small_int()) {
        let source = format!(
            "var a = {}; var b = {}; print a < b; print a <= b; print a > b; print a >= b; print a == b; print a != b;",
            a.abs(), b.abs()
        );
        let (a, b) = (a.abs(), b.abs());
        let expected: Vec<String> = [a < b, a <= b, a > b, a >= b, a == b, a != b]
            .iter()
            .map(|result| result.to_string())
            .collect();
        prop_assert_eq!(run_ok(&source), expected);
    }

    #[test]
    fn number_literals_print_back(number in arb_literal_number()) {
        let literal = format!("{}", number);
        prop_assert_eq!(run_ok(&format!("print {};", literal)), vec![literal]);
    }

    #[test]
    fn string_literals_print_back(content in arb_string_content()) {
        let source = format!("print \"{}\";", content);
        prop_assert_eq!(run_ok(&source), vec![content]);
    }

    #[test]
    fn concatenation_matches_host(left in arb_string_content(), right in arb_string_content()) {
        let source = format!("var s = \"{}\" + \"{}\"; print s == \"{}{}\";", left, right, left, right);
        prop_assert_eq!(run_ok(&source), vec!["true".to_string()]);
    }

    #[test]
    fn block_local_does_not_touch_global(name in arb_identifier(), outer in arb_small_int(), inner in arb_small_int()) {
        let source = format!(
            "var {name} = {outer}; {{ var {name} = {inner}; {name} = {name} + 1; print {name}; }} print {name};"
        );
        let expected = vec![format!("{}", inner as f64 + 1.0), format!("{}", outer)];
        prop_assert_eq!(run_ok(&source), expected);
    }
}
