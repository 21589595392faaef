#![no_main]

use frsl::Settings;
use libfuzzer_sys::fuzz_target;
use serde_json::Value;

fuzz_target!(|data: &[u8]| {
    let Ok(Value::Object(values)) = serde_json::from_slice::<Value>(data) else {
        return;
    };
    if let Ok(settings) = Settings::from_host(&values) {
        let _ = frsl::compile(&frsl::normalize(settings), &["1".to_string()]);
    }
});
