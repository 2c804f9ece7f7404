#![no_main]
use libfuzzer_sys::fuzz_target;

use cordyceps_avl::model::run_construction_equivalence;

fuzz_target!(|pairs: Vec<(u32, u32)>| { run_construction_equivalence(pairs) });
