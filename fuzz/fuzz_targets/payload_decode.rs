#![no_main]

use libfuzzer_sys::fuzz_target;
use serde_json::Value;
use wsb_remote::{
    decode_current_state, decode_info, decode_name_changed, decode_objects, decode_project,
    decode_state_changed,
};

// Arbitrary JSON must decode or fail cleanly, never panic.
fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<Value>(data) else {
        return;
    };
    let _ = decode_info(value.clone());
    let _ = decode_project(value.clone());
    let _ = decode_objects(value.clone());
    let _ = decode_current_state(value.clone());
    let _ = decode_state_changed(value.clone());
    if let Ok(Some(event)) = decode_name_changed(value) {
        assert!(event.group().is_some());
    }
});
