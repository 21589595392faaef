#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use frsl::enums::ConditionOperator;
use frsl::primitives::{compare_values, evaluate_condition, evaluate_symbol};
use libfuzzer_sys::fuzz_target;

/// Operand strings biased toward numeric-looking values.
fn arbitrary_operand(u: &mut Unstructured<'_>) -> arbitrary::Result<String> {
    match u.int_in_range(0..=3)? {
        0 => Ok(i64::arbitrary(u)?.to_string()),
        1 => Ok(f64::arbitrary(u)?.to_string()),
        2 => Ok(format!(" {} ", u32::arbitrary(u)?)),
        _ => String::arbitrary(u),
    }
}

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);

    let (Ok(symbol), Ok(left), Ok(right)) = (
        String::arbitrary(&mut u),
        arbitrary_operand(&mut u),
        arbitrary_operand(&mut u),
    ) else {
        return;
    };

    let _ = evaluate_symbol(&symbol, &left, &right);

    let lt = evaluate_condition(ConditionOperator::LessThan, &left, &right);
    let ge = evaluate_condition(ConditionOperator::GreaterOrEqual, &left, &right);
    assert_ne!(lt, ge, "< and >= agree on ({left:?}, {right:?})");
    assert_eq!(
        compare_values(&left, &right),
        compare_values(&right, &left).reverse()
    );
});
