//! Statement execution tests, driven through `test_helpers::Harness`.

mod try_tests;
