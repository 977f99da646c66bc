//! Built-in Kubernetes health-check handlers.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/liveness` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readiness` | Can the pod serve traffic? Failure → pulled from load-balancer. |
//!
//! Both paths are in [`ExclusionPolicy::default`](crate::middleware::ExclusionPolicy),
//! so probes never show up in the access log.
//!
//! ```rust
//! use trailmark::{Router, health};
//!
//! let app = Router::new()
//!     .get(health::LIVENESS, health::liveness)
//!     .get(health::READINESS, health::readiness);
//! ```

use crate::middleware::ExclusionPolicy;
use crate::{Request, Response};

pub const LIVENESS: &str = ExclusionPolicy::LIVENESS;
pub const READINESS: &str = ExclusionPolicy::READINESS;

/// Always `200 OK` with body `"ok"`.
pub async fn liveness(_req: Request) -> Response {
    Response::text("ok")
}

/// `200 OK` with body `"ready"`. Replace it with your own handler if the
/// service must check its dependencies before taking traffic.
pub async fn readiness(_req: Request) -> Response {
    Response::text("ready")
}
