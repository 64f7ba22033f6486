use crux_http::Http;
use serde::Serialize;

use super::{post_json, BackendError};
use crate::config::Endpoints;
use crate::event::Event;

#[derive(Serialize)]
struct SendCodeRequest<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct VerifyCodeRequest<'a> {
    email: &'a str,
    verification_code: &'a str,
}

pub fn send_code(http: &Http<Event>, endpoints: &Endpoints, email: &str) -> Result<(), BackendError> {
    post_json(
        http,
        &endpoints.send_verification_code()?,
        &SendCodeRequest { email },
        |_| Ok(()),
        Event::VerificationCodeSent,
    )
}

pub fn verify_code(
    http: &Http<Event>,
    endpoints: &Endpoints,
    email: &str,
    code: &str,
) -> Result<(), BackendError> {
    post_json(
        http,
        &endpoints.verify_code()?,
        &VerifyCodeRequest {
            email,
            verification_code: code,
        },
        |_| Ok(()),
        Event::CodeVerified,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_bodies() {
        assert_eq!(
            serde_json::to_string(&SendCodeRequest {
                email: "a@b.co"
            })
            .unwrap(),
            r#"{"email":"a@b.co"}"#
        );
        assert_eq!(
            serde_json::to_string(&VerifyCodeRequest {
                email: "a@b.co",
                verification_code: "123456"
            })
            .unwrap(),
            r#"{"email":"a@b.co","verification_code":"123456"}"#
        );
    }
}
