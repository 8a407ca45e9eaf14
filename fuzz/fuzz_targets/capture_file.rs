#![no_main]
use airsift::source::CaptureFile;
use airsift::stats::Stats;
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;
use std::sync::Arc;

fuzz_target!(|data: &[u8]| {
    let stats = Arc::new(Stats::new());
    if let Ok(mut cap) = CaptureFile::new(Cursor::new(data), stats) {
        while let Ok(Some(_)) = cap.next_frame() {}
    }
});
