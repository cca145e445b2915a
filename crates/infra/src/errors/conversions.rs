//! Conversions from external infrastructure errors into domain errors.

use mpauth_common::auth::AuthError;
use mpauth_domain::GatewayError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub GatewayError);

impl From<InfraError> for GatewayError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<GatewayError> for InfraError {
    fn from(value: GatewayError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoGatewayError {
    fn into_gateway(self) -> GatewayError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → GatewayError */
/* -------------------------------------------------------------------------- */

impl IntoGatewayError for SqlError {
    fn into_gateway(self) -> GatewayError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match err.code {
                    ErrorCode::DatabaseBusy => GatewayError::Database("database is busy".into()),
                    ErrorCode::DatabaseLocked => {
                        GatewayError::Database("database is locked".into())
                    }
                    ErrorCode::CannotOpen => {
                        GatewayError::Database(format!("unable to open token database: {message}"))
                    }
                    _ => GatewayError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::FromSqlConversionFailure(_, _, cause) => {
                GatewayError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, name, ty) => {
                GatewayError::Database(format!("invalid column type for {name}: {ty}"))
            }
            RE::InvalidPath(path) => GatewayError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => GatewayError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_gateway())
    }
}

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(GatewayError::Database(format!("connection pool error: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → GatewayError */
/* -------------------------------------------------------------------------- */

impl IntoGatewayError for HttpError {
    fn into_gateway(self) -> GatewayError {
        if self.is_timeout() {
            return GatewayError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return GatewayError::Network("HTTP connection failure".into());
        }

        if self.is_decode() {
            return GatewayError::Decode(self.to_string());
        }

        if let Some(status) = self.status() {
            return GatewayError::Remote {
                status: status.as_u16(),
                body: status.canonical_reason().unwrap_or("unknown status").to_string(),
            };
        }

        GatewayError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_gateway())
    }
}

/* -------------------------------------------------------------------------- */
/* AuthError → GatewayError */
/* -------------------------------------------------------------------------- */

impl IntoGatewayError for AuthError {
    fn into_gateway(self) -> GatewayError {
        match self {
            AuthError::Config(message) => GatewayError::Config(message),
            AuthError::Unauthorized(message) => GatewayError::Auth(message),
            AuthError::Remote { status: Some(status), body } => {
                GatewayError::Remote { status, body }
            }
            AuthError::Remote { status: None, body } => GatewayError::Network(body),
            AuthError::Decode { message, body } => {
                GatewayError::Decode(format!("{message} (body: {body})"))
            }
            AuthError::Storage(message) => GatewayError::Database(message),
        }
    }
}

impl From<AuthError> for InfraError {
    fn from(value: AuthError) -> Self {
        InfraError(value.into_gateway())
    }
}

/// Map a failed `spawn_blocking` join into a domain error.
pub fn map_join_error(err: tokio::task::JoinError) -> GatewayError {
    if err.is_cancelled() {
        GatewayError::Internal("blocking task cancelled".into())
    } else {
        GatewayError::Internal(format!("blocking task panicked: {err}"))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use reqwest::{Client, StatusCode};
    use rusqlite::ffi::{Error as FfiError, ErrorCode};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn sqlite_busy_maps_to_database_error() {
        let err = SqlError::SqliteFailure(
            FfiError { code: ErrorCode::DatabaseBusy, extended_code: 5 },
            Some("database is locked".into()),
        );

        let mapped: GatewayError = InfraError::from(err).into();
        match mapped {
            GatewayError::Database(msg) => assert!(msg.contains("busy")),
            other => panic!("expected database error, got {:?}", other),
        }
    }

    #[test]
    fn auth_remote_keeps_status_and_body() {
        let err =
            AuthError::Remote { status: Some(400), body: r#"{"error":"invalid_grant"}"#.into() };
        let mapped: GatewayError = InfraError::from(err).into();
        assert_eq!(
            mapped,
            GatewayError::Remote { status: 400, body: r#"{"error":"invalid_grant"}"#.into() }
        );
    }

    #[test]
    fn auth_remote_without_status_is_network() {
        let err = AuthError::Remote { status: None, body: "timed out".into() };
        let mapped: GatewayError = InfraError::from(err).into();
        assert_eq!(mapped, GatewayError::Network("timed out".into()));
    }

    #[test]
    fn auth_unauthorized_and_storage_map_to_domain_kinds() {
        let unauthorized: GatewayError =
            InfraError::from(AuthError::unauthorized("no token")).into();
        assert!(matches!(unauthorized, GatewayError::Auth(_)));

        let storage: GatewayError = InfraError::from(AuthError::Storage("disk".into())).into();
        assert_eq!(storage, GatewayError::Database("disk".into()));

        let decode: GatewayError = InfraError::from(AuthError::Decode {
            message: "expected value".into(),
            body: "<html>".into(),
        })
        .into();
        match decode {
            GatewayError::Decode(msg) => assert!(msg.contains("<html>")),
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn join_error_maps_to_internal() {
        let err = tokio::spawn(async { panic!("boom") }).await.unwrap_err();
        let mapped = map_join_error(err);
        assert!(matches!(mapped, GatewayError::Internal(msg) if msg.contains("panicked")));
    }

    #[tokio::test]
    async fn http_status_error_maps_to_remote() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(StatusCode::UNAUTHORIZED))
            .mount(&server)
            .await;

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err();

        let mapped: GatewayError = InfraError::from(error).into();
        match mapped {
            GatewayError::Remote { status, .. } => assert_eq!(status, 401),
            other => panic!("expected remote error, got {:?}", other),
        }
    }
}
