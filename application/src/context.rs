//! [`Context`]-related definitions.

use axum::{async_trait, extract::FromRequestParts, RequestPartsExt as _};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use derive_more::Debug;
use serde::Deserialize;
use service::domain::user;
use uuid::Uuid;

#[cfg(doc)]
use service::domain::User;

use crate::{define_error, AsError, Error, Service};

/// Application context of an HTTP request.
#[derive(Debug)]
pub struct Context {
    /// [`Service`] instance.
    service: Service,

    /// Authentication state.
    auth: Auth,

    /// Parts of the HTTP request.
    parts: http::request::Parts,
}

impl Context {
    /// Returns [`Service`] instance of this [`Context`].
    #[must_use]
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Returns ID of the [`User`] the current HTTP request is authenticated
    /// as.
    ///
    /// Only proves the caller's identity. Whether the [`User`] is privileged
    /// enough for an action is decided by the [`Service`] itself.
    ///
    /// # Errors
    ///
    /// Errors if:
    /// - the current HTTP request is not authorized;
    /// - the provided authentication token is invalid.
    pub async fn caller(&self) -> Result<user::Id, Error> {
        let res = self
            .parts
            .clone()
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await;
        match res {
            Ok(TypedHeader(Authorization(bearer))) => {
                jsonwebtoken::decode::<Claims>(
                    bearer.token(),
                    &self.auth.decoding_key,
                    &jsonwebtoken::Validation::new(
                        jsonwebtoken::Algorithm::HS256,
                    ),
                )
                .map(|token| token.claims.sub.into())
                .map_err(|_| AuthError::InvalidAuthToken.into())
            }
            Err(e) => {
                if e.is_missing() {
                    Err(AuthError::AuthorizationRequired.into())
                } else {
                    Err(e.into_error())
                }
            }
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        let service = parts
            .extensions
            .get::<Service>()
            .cloned()
            .ok_or_else(|| Error::internal(&"missing `Service` extension"))?;
        let auth = parts
            .extensions
            .get::<Auth>()
            .cloned()
            .ok_or_else(|| Error::internal(&"missing `Auth` extension"))?;

        Ok(Self {
            service,
            auth,
            parts: parts.clone(),
        })
    }
}

/// Authentication state shared between HTTP requests.
///
/// Authentication tokens are issued by the accounts directory, so this
/// application only ever verifies them.
#[derive(Clone, Debug)]
pub struct Auth {
    /// Key for verifying [JWT] signatures.
    ///
    /// [JWT]: https://wikipedia.org/wiki/JSON_Web_Token
    #[debug(skip)]
    decoding_key: jsonwebtoken::DecodingKey,
}

impl Auth {
    /// Creates a new [`Auth`] verifying [JWT]s signed with the provided
    /// `secret`.
    ///
    /// [JWT]: https://wikipedia.org/wiki/JSON_Web_Token
    #[must_use]
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            decoding_key: jsonwebtoken::DecodingKey::from_secret(
                secret.as_ref(),
            ),
        }
    }
}

/// Claims of an authentication [JWT].
///
/// [JWT]: https://wikipedia.org/wiki/JSON_Web_Token
#[derive(Debug, Deserialize)]
struct Claims {
    /// ID of the authenticated [`User`].
    sub: Uuid,
}

define_error! {
    enum AuthError {
        #[code = "AUTHORIZATION_REQUIRED"]
        #[status = UNAUTHORIZED]
        #[message = "Authorization required"]
        AuthorizationRequired,

        #[code = "INVALID_AUTH_TOKEN"]
        #[status = UNAUTHORIZED]
        #[message = "Invalid authentication token"]
        InvalidAuthToken,
    }
}
