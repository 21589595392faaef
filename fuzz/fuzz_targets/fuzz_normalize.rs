#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let s = String::from_utf8_lossy(data);

    let settings = match frsl::parse(&s) {
        Ok(settings) => settings,
        Err(_) => return,
    };

    let once = frsl::normalize(settings);
    let twice = frsl::normalize(once.clone());
    assert_eq!(once, twice, "normalize is not idempotent");

    let yaml = match frsl::serialize(&once) {
        Ok(y) => y,
        Err(_) => return,
    };

    // If normalized settings serialize, they must parse back.
    if let Err(e) = frsl::parse(&yaml) {
        panic!(
            "serialize produced YAML that cannot be re-parsed: {e}\n\
             Input (lossy): {:?}\n\
             Serialized YAML:\n{}",
            s.get(..200).unwrap_or(&s),
            yaml.get(..500).unwrap_or(&yaml),
        );
    }
});
