//! HTTP surface for the iris dashboard: analytics aggregation, execution
//! summaries, liveness, and runtime counters.

pub mod gateway_dashboard;

pub use gateway_dashboard::{
    build_dashboard_router, run_dashboard_server, DashboardServerConfig, DashboardServerState,
    DashboardStatusReport, DASHBOARD_ANALYTICS_ENDPOINT, DASHBOARD_EXECUTIONS_ENDPOINT,
    DASHBOARD_HEALTH_ENDPOINT, DASHBOARD_STATUS_ENDPOINT,
};
