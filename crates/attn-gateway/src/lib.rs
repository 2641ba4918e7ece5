//! Request gateway for the dashboard backend.
//!
//! - `endpoint`: endpoint catalogue, cache policy and timeout classes
//! - `params` / `cache`: canonical cache keys and the FIFO TTL cache
//! - `transport`: HTTP seam (`reqwest` in production, `MockTransport` in tests)
//! - `gateway`: `RequestGateway::request`
//! - `api`: `DashboardApi`, one typed method per endpoint

pub mod api;
pub mod cache;
pub mod endpoint;
pub mod error;
pub mod gateway;
pub mod mock;
pub mod params;
pub mod transport;

pub use api::{
    AnalysisRequest, AutoUpdateStatus, DashboardApi, EventPerformanceQuery, EventsQuery,
    MultiBacktestResponse, NewsQuery, SeriesQuery,
};
pub use cache::TtlCache;
pub use endpoint::{CachePolicy, Endpoint, HttpMethod, TimeoutBudgets, TimeoutClass};
pub use error::{GatewayError, GatewayResult};
pub use gateway::{GatewayConfig, RequestGateway, RequestOptions};
pub use mock::{MockReply, MockTransport};
pub use transport::{BoxFuture, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
