//! Detection module tests

mod candidate_tests;
mod checker_tests;
