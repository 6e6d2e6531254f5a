pub mod usage_queries;
