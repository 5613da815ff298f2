pub mod availability_service;
pub mod conflict_service;
pub mod resolution_planner;
pub mod rule_evaluators;
pub mod schedule_utils;
