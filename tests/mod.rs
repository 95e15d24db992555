mod common;

mod queue_tests;
