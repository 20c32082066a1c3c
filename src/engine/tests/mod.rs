mod basic_tests;
mod function_tests;
mod helpers;
mod suspend_tests;
