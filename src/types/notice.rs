//! `{success, data | message}` outcome shape shown to the user

use serde::Serialize;

use super::{HerdbookError, Result};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Notice<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Notice<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn failed(err: &HerdbookError) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(err.user_message()),
        }
    }

    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => Self::failed(&err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_shape() {
        let notice = Notice::from_result(Ok(vec![1, 2]));
        let json = serde_json::to_value(&notice).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "data": [1, 2]}));
    }

    #[test]
    fn test_failure_takes_server_message() {
        let notice: Notice<()> = Notice::from_result(Err(HerdbookError::Api {
            status: 400,
            message: "Volume is required".into(),
        }));
        let json = serde_json::to_value(&notice).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": false, "message": "Volume is required"})
        );
    }
}
