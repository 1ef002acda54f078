use crate::auth::authenticate;
use crate::web::api::APIError;
use crate::web::session_middleware::SessionInterface;
use crate::web::AppState;
use actix_web::http::header::LOCATION;
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use log::info;
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct LoginForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[post("/user/login")]
async fn login(
    req: HttpRequest,
    data: web::Form<LoginForm>,
    state: web::Data<AppState>,
) -> Result<impl Responder, APIError> {
    let data = data.into_inner();
    let user = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        Ok(authenticate(store.as_mut(), data.email.trim(), &data.password)?)
    })
    .await??;
    info!("User {} logged in", user.email);

    let mut session = req.session_data();
    session.user_id = Some(user.id);
    req.set_session_data(session);
    req.renew_session();
    Ok(HttpResponse::Ok().json(json!({
        "id": user.id,
        "email": user.email,
    })))
}

#[get("/user/logout")]
async fn logout(req: HttpRequest) -> impl Responder {
    req.destroy_session();
    HttpResponse::SeeOther()
        .insert_header((LOCATION, "/user/login"))
        .finish()
}
