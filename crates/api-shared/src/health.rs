use crate::dto::HealthRes;

/// Health service shared by the REST API and the runner binary.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    /// Report the service as alive.
    ///
    /// There are no downstream dependencies to check; a response means the process is
    /// serving requests.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "LIMS is alive".into(),
        }
    }
}
