use hyper::StatusCode;
use serde::{Deserialize, Serialize};

use crate::{
    error::IpFilterError,
    filter::{DenyResponder, IpFilter, FORBIDDEN_MESSAGE},
};

/// Serializable config of an [`IpFilter`].
///
/// ```json
/// { "ranges": ["10.0.0.0/8", "::1/128"], "deny": { "status": 404, "message": "not found" } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct IpFilterConfig {
    /// Allowed cidr ranges, invalid ones are skipped.
    pub ranges: Vec<String>,
    /// Response for denied requests, the canned `403` when absent.
    pub deny: Option<DenyConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DenyConfig {
    pub status: u16,
    pub message: String,
}

impl Default for DenyConfig {
    fn default() -> Self {
        Self {
            status: StatusCode::FORBIDDEN.as_u16(),
            message: FORBIDDEN_MESSAGE.to_string(),
        }
    }
}

impl TryFrom<&DenyConfig> for DenyResponder {
    type Error = IpFilterError;

    fn try_from(value: &DenyConfig) -> Result<Self, Self::Error> {
        let status = StatusCode::from_u16(value.status).map_err(|_| IpFilterError::InvalidStatus(value.status))?;
        Ok(DenyResponder::with_code_message(status, value.message.clone()))
    }
}

impl IpFilter {
    /// Build a filter from its config.
    ///
    /// # Errors
    /// If the deny status is not a valid status code. Invalid ranges are not errors.
    pub fn from_config(config: &IpFilterConfig) -> Result<Self, IpFilterError> {
        let mut filter = IpFilter::new(&config.ranges);
        if let Some(deny) = &config.deny {
            filter.set_deny_responder(deny.try_into()?);
        }
        Ok(filter)
    }
}

impl TryFrom<serde_json::Value> for IpFilter {
    type Error = IpFilterError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        let config = serde_json::from_value::<IpFilterConfig>(value)?;
        IpFilter::from_config(&config)
    }
}

#[cfg(test)]
mod test {
    use hyper::Request;
    use ipgate_kernel::{BoxError, IgBody};
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_config() {
        let config: IpFilterConfig = serde_json::from_value(json!({ "ranges": ["10.0.0.0/8"] })).expect("valid config");
        assert_eq!(config.ranges, ["10.0.0.0/8"]);
        assert_eq!(config.deny, None);

        let config: IpFilterConfig = serde_json::from_value(json!({ "deny": { "message": "go away" } })).expect("valid config");
        assert!(config.ranges.is_empty());
        assert_eq!(
            config.deny,
            Some(DenyConfig {
                status: 403,
                message: "go away".into()
            })
        );
    }

    #[test]
    fn test_bad_config() {
        assert!(matches!(IpFilter::try_from(json!({ "ranges": "10.0.0.0/8" })), Err(IpFilterError::Config(_))));
        assert!(matches!(
            IpFilter::try_from(json!({ "ranges": [], "deny": { "status": 1000 } })),
            Err(IpFilterError::InvalidStatus(1000))
        ));
        // bad ranges are not config errors
        let filter = IpFilter::try_from(json!({ "ranges": ["10.0.0.0/8", "bogus"] })).expect("valid config");
        assert_eq!(filter.ranges().len(), 1);
        assert_eq!(filter.parse_errors().len(), 1);
    }

    #[tokio::test]
    async fn test_custom_deny() -> Result<(), BoxError> {
        let filter = IpFilter::try_from(json!({ "ranges": ["10.0.0.0/8"], "deny": { "status": 404, "message": "not here" } }))?;
        let req = Request::new(IgBody::empty());
        let resp = filter.responder().respond(req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(resp.into_body().into_bytes().await?, "not here");
        Ok(())
    }
}
