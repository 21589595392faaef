#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use frsl::primitives::pipe_template;
use frsl::types::RecordRows;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);

    let (Ok(template), Ok(event), Ok(rows)) = (
        String::arbitrary(&mut u),
        Option::<String>::arbitrary(&mut u),
        RecordRows::arbitrary(&mut u),
    ) else {
        return;
    };

    let _ = pipe_template(&template, event.as_deref(), &rows);
});
