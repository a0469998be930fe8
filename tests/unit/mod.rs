//! Unit test modules.

mod formation_test;
mod ftms_parser_test;
mod overtake_test;
mod pacing_test;
mod speed_model_test;
