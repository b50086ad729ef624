// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod config;
pub mod errors;
pub mod api;
pub mod telemetry;
pub mod network;
pub mod dispatcher;
pub mod replication;
pub mod customer;
pub mod scenario;
pub mod runner;
pub mod cluster;
pub mod server;
