#![no_main]
use libfuzzer_sys::fuzz_target;
use std::io::Write;

fuzz_target!(|data: &[u8]| {
    let dir = std::env::temp_dir();
    let path = dir.join(format!("spinloop-fuzz-{}.csv", std::process::id()));
    let Ok(mut f) = std::fs::File::create(&path) else {
        return;
    };
    if f.write_all(data).is_err() {
        return;
    }
    drop(f);
    if let Ok(rows) = spinloop_config::load_reference_csv(&path) {
        assert!(!rows.is_empty());
        assert!(rows.windows(2).all(|w| w[0].t_ms < w[1].t_ms));
    }
});
