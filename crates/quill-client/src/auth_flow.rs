//! Login, register and logout as complete user journeys: gateway call,
//! session update, and the route to land on.

use tracing::{error, info};

use quill_api::Gateway;

use crate::error::{ClientError, ClientResult};
use crate::router::Route;
use crate::session::SessionStore;

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub async fn login<G: Gateway + ?Sized>(
    gateway: &G,
    session: &mut SessionStore,
    email: &str,
    password: &str,
) -> ClientResult<Route> {
    let response = gateway.login(email, password).await.map_err(|e| {
        error!(%email, "Login failed: {}", e);
        e
    })?;

    session.login(response.user, response.token)?;
    Ok(Route::Feed)
}

/// Register, then sign in with the same credentials. Ends either fully signed
/// in or fully signed out.
pub async fn register<G: Gateway + ?Sized>(
    gateway: &G,
    session: &mut SessionStore,
    form: &RegisterForm,
) -> ClientResult<Route> {
    gateway
        .register(&form.username, &form.email, &form.password)
        .await
        .map_err(|e| {
            error!(username = %form.username, "Registration failed: {}", e);
            e
        })?;
    info!(username = %form.username, "Registered");

    let response = gateway.login(&form.email, &form.password).await.map_err(|e| {
        error!(email = %form.email, "Login after registration failed: {}", e);
        e
    })?;

    session.set_token(response.token)?;
    if let Err(e) = session.set_user(response.user) {
        error!(email = %form.email, "Failed to store user after registration: {}", e);
        session.logout();
        return Err(e);
    }

    if !session.is_authenticated() {
        return Err(ClientError::NotAuthenticated);
    }
    Ok(Route::Feed)
}

pub fn logout(session: &mut SessionStore) -> Route {
    session.logout();
    Route::Login
}
