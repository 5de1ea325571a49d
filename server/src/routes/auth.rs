//! Login and logout.

use axum::extract::State;
use axum::response::{Html, IntoResponse, Response};
use axum::Form;
use axum_extra::extract::CookieJar;
use chrono::Utc;
use serde::Deserialize;

use crate::error::ApiError;
use crate::session::{has_session, see_other, see_other_with_cookie, LOGIN_PATH};
use crate::state::AppState;

const LOGIN_PAGE: &str = r#"<!doctype html>
<html lang="ru">
<head><meta charset="utf-8"><title>Архив приказов</title></head>
<body>
<form method="post" action="/login">
  <label>Пароль <input name="password" type="password" required autofocus></label>
  <button type="submit">Войти</button>
</form>
</body>
</html>
"#;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub password: String,
}

pub async fn login_page(State(state): State<AppState>, jar: CookieJar) -> Response {
    if has_session(&state, &jar) {
        return see_other("/");
    }
    Html(LOGIN_PAGE).into_response()
}

pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    let token = match state.gate.login(&form.password, Utc::now()) {
        None => return Err(ApiError::WrongPassword),
        Some(issued) => issued.map_err(|e| ApiError::Internal(e.to_string()))?,
    };
    tracing::info!("session opened");
    Ok(see_other_with_cookie(
        "/",
        &state.gate.cookie().header_value(&token),
    ))
}

pub async fn logout(State(state): State<AppState>) -> Response {
    see_other_with_cookie(LOGIN_PATH, &state.gate.cookie().clearing_value())
}
