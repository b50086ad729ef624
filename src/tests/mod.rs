// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod clock_tests;
pub mod state_tests;
pub mod operation_tests;
pub mod trace_tests;
