use crate::web::api::APIError;
use log::{error, warn};

pub async fn error_logging_middleware<B: actix_web::body::MessageBody>(
    req: actix_web::dev::ServiceRequest,
    next: actix_web::middleware::Next<B>,
) -> Result<actix_web::dev::ServiceResponse<B>, actix_web::Error> {
    let response = next.call(req).await?;

    if let Some(error) = response.response().error() {
        if let Some(api_error) = error.as_error::<APIError>() {
            match api_error.cause() {
                APIError::NotLoggedIn | APIError::PermissionDenied => {
                    warn!(
                        "HTTP {} permission denied at <{}>. Client: <{}>",
                        response.response().status(),
                        response.request().uri(),
                        response
                            .request()
                            .connection_info()
                            .realip_remote_addr()
                            .unwrap_or("unknown"),
                    );
                }
                APIError::AuthenticationFailed => {
                    warn!(
                        "HTTP {} authentication failed. Client: <{}>",
                        response.response().status(),
                        response
                            .request()
                            .connection_info()
                            .realip_remote_addr()
                            .unwrap_or("unknown"),
                    );
                }
                APIError::ValidationFailed(e) => {
                    warn!(
                        "HTTP {} invalid form data at <{}>: {}",
                        response.response().status(),
                        response.request().uri(),
                        e
                    );
                }
                APIError::InvalidData(e) => {
                    warn!(
                        "HTTP {} invalid data at <{}>: {}",
                        response.response().status(),
                        response.request().uri(),
                        e
                    );
                }
                APIError::NotExisting | APIError::AlreadyExisting => {
                    warn!(
                        "HTTP {} at <{}>: {}",
                        response.response().status(),
                        response.request().uri(),
                        api_error.cause()
                    );
                }
                APIError::NoActiveReservation
                | APIError::TransactionConflict
                | APIError::PartiallyApplied { .. } => {}
                APIError::InternalError(e) => {
                    error!(
                        "HTTP {} internal server error at <{}>: {}",
                        response.response().status(),
                        response.request().uri(),
                        e
                    );
                }
            }
            if let APIError::PartiallyApplied { applied, .. } = api_error {
                warn!(
                    "Request to <{}> failed after applying changes to {} rooms",
                    response.request().uri(),
                    applied.len()
                );
            }
        } else if response.response().status().is_server_error() {
            error!(
                "HTTP {} unexpected error at <{}>: {:?}",
                response.response().status(),
                response.request().uri(),
                error
            );
        } else {
            warn!(
                "HTTP {} at <{}>: {}",
                response.response().status(),
                response.request().uri(),
                error
            );
        }
    }
    Ok(response)
}
